use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderOptions};

/// Client contract of an external rendering backend.
///
/// `start` and `close` must both be idempotent. `render` is a blocking call
/// and fails with [`DispatchError::BackendUnavailable`] while the backend is
/// not started.
pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self) -> Result<(), DispatchError>;

    fn close(&self) -> Result<(), DispatchError>;

    fn is_connected(&self) -> bool;

    fn render(
        &self,
        source: &str,
        options: RenderOptions<'_>,
    ) -> Result<BackendOutput, DispatchError>;
}
