use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderOptions};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BINARY: &str = "mermkit";
pub const BINARY_ENV: &str = "MERMKIT_BIN";

#[derive(Debug, Serialize)]
pub struct ServeRequest<'a> {
    pub action: &'a str,
    pub diagram: &'a str,
    pub options: ServeOptions<'a>,
}

#[derive(Debug, Serialize)]
pub struct ServeOptions<'a> {
    pub format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<&'a str>,
}

impl<'a> ServeRequest<'a> {
    pub fn render(diagram: &'a str, options: RenderOptions<'a>) -> Self {
        Self {
            action: "render",
            diagram,
            options: ServeOptions {
                format: options.format.as_str(),
                theme: options.theme,
                engine: options.engine,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenderPayload {
    pub bytes: Option<String>,
    pub mime: Option<String>,
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ServeResponse {
    pub ok: bool,
    pub result: Option<RenderPayload>,
    pub error: Option<String>,
}

impl ServeResponse {
    pub fn into_output(self) -> Result<BackendOutput, DispatchError> {
        if !self.ok {
            let message = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "mermkit render failed".to_string());
            return Err(DispatchError::RenderError(message));
        }
        let payload = self
            .result
            .ok_or_else(|| DispatchError::RenderError("missing result".to_string()))?;
        payload.into_output()
    }
}

impl RenderPayload {
    pub fn into_output(self) -> Result<BackendOutput, DispatchError> {
        let encoded = self
            .bytes
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                DispatchError::RenderError("mermkit render returned no bytes".to_string())
            })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DispatchError::RenderError(format!("invalid base64 payload: {e}")))?;

        Ok(BackendOutput {
            mime: self.mime,
            bytes,
            warnings: self.warnings.unwrap_or_default(),
        })
    }
}

pub fn parse_response(line: &str) -> Result<BackendOutput, DispatchError> {
    let response: ServeResponse = serde_json::from_str(line.trim())
        .map_err(|e| DispatchError::RenderError(format!("malformed backend response: {e}")))?;
    response.into_output()
}

pub fn parse_payload(data: &[u8]) -> Result<BackendOutput, DispatchError> {
    let payload: RenderPayload = serde_json::from_slice(data)
        .map_err(|e| DispatchError::RenderError(format!("malformed backend payload: {e}")))?;
    payload.into_output()
}

/// Picks the explicit binary, then `MERMKIT_BIN`, then `mermkit` on `PATH`.
///
/// `Config::load_or_init` folds `MERMKIT_BIN` into `Config::binary`, so for
/// configs loaded from disk the environment still wins over the file.
pub fn resolve_binary(configured: Option<&str>) -> String {
    pick_binary(configured, std::env::var(BINARY_ENV).ok())
}

fn pick_binary(configured: Option<&str>, env: Option<String>) -> String {
    configured
        .filter(|b| !b.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env.filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BINARY.to_string())
}
