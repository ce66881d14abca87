use super::protocol::{ServeRequest, ServeResponse};
use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderOptions};
use crate::traits::RenderBackend;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8765";

/// Remote render service accepting the serve request envelope at
/// `POST {base_url}/render`.
///
/// Uses the blocking `reqwest` client, so `start`, `render` and `close` must
/// run outside of an async context.
pub struct HttpBackend {
    base_url: String,
    client: Mutex<Option<reqwest::blocking::Client>>,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/render", self.base_url.trim_end_matches('/'))
    }

    fn lock(&self) -> MutexGuard<'_, Option<reqwest::blocking::Client>> {
        self.client.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn start(&self) -> Result<(), DispatchError> {
        let mut client = self.lock();
        if client.is_none() {
            let built = reqwest::blocking::Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| DispatchError::BackendUnavailable(e.to_string()))?;
            *client = Some(built);
            debug!(endpoint = %self.endpoint(), "HTTP render backend ready");
        }
        Ok(())
    }

    fn close(&self) -> Result<(), DispatchError> {
        self.lock().take();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    fn render(
        &self,
        source: &str,
        options: RenderOptions<'_>,
    ) -> Result<BackendOutput, DispatchError> {
        let client = self.lock().clone().ok_or_else(|| {
            DispatchError::BackendUnavailable("http backend is not started".to_string())
        })?;

        let response = client
            .post(self.endpoint())
            .json(&ServeRequest::render(source, options))
            .send()
            .map_err(|e| {
                DispatchError::BackendUnavailable(format!(
                    "failed to reach {}: {e}",
                    self.endpoint()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DispatchError::RenderError(format!(
                "render service returned {status}: {}",
                body.trim()
            )));
        }

        let body: ServeResponse = response
            .json()
            .map_err(|e| DispatchError::RenderError(format!("malformed backend response: {e}")))?;
        body.into_output()
    }
}
