use crate::error::DispatchError;
use crate::traits::RenderBackend;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scoped ownership of a started backend.
///
/// The backend is closed by [`BackendSession::close`] or, failing that, when
/// the session is dropped.
pub struct BackendSession {
    backend: Arc<dyn RenderBackend>,
    closed: bool,
}

impl BackendSession {
    pub fn start(backend: Arc<dyn RenderBackend>) -> Result<Self, DispatchError> {
        backend.start()?;
        debug!(backend = backend.name(), "Backend session started");
        Ok(Self {
            backend,
            closed: false,
        })
    }

    pub fn backend(&self) -> Arc<dyn RenderBackend> {
        self.backend.clone()
    }

    pub fn close(mut self) -> Result<(), DispatchError> {
        self.closed = true;
        self.backend.close()
    }
}

impl Drop for BackendSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.backend.close() {
            warn!(backend = self.backend.name(), "Failed to close backend: {}", e);
        }
    }
}
