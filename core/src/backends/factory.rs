use crate::backends::{HttpBackend, OneShotBackend, ServeBackend, StubBackend};
use crate::config::Config;
use crate::traits::RenderBackend;
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub fn create_backend(config: &Config) -> Result<Arc<dyn RenderBackend>> {
    let binary = config.binary.as_deref();

    match config.backend.to_lowercase().as_str() {
        "serve" => Ok(Arc::new(ServeBackend::new(binary))),
        "oneshot" | "cli" => Ok(Arc::new(OneShotBackend::new(binary))),
        "http" => {
            let mut backend = HttpBackend::new();
            if let Some(base_url) = &config.base_url {
                backend = backend.with_base_url(base_url.clone());
            }
            Ok(Arc::new(backend))
        }
        "stub" => Ok(Arc::new(StubBackend::new())),
        other => Err(anyhow!(
            "Unknown backend: {}. Available: serve, oneshot, http, stub",
            other
        )),
    }
}
