use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("render backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("render failed: {0}")]
    RenderError(String),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::RenderError(_) => "render_error",
        }
    }
}
