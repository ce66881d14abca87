use crate::adapter::RenderAdapter;
use crate::render::{RenderFormat, RenderRequest};
use crate::tools::{extract_optional_string_arg, extract_string_arg};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const RENDER_TOOL_NAME: &str = "render_mermaid";

/// Exposes a [`RenderAdapter`] as the `render_mermaid` tool.
pub struct RenderDiagramTool {
    adapter: Arc<RenderAdapter>,
    default_format: RenderFormat,
    default_theme: Option<String>,
}

impl RenderDiagramTool {
    pub fn new(adapter: Arc<RenderAdapter>) -> Self {
        Self {
            adapter,
            default_format: RenderFormat::default(),
            default_theme: None,
        }
    }

    pub fn with_default_format(mut self, format: RenderFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn with_default_theme(mut self, theme: Option<String>) -> Self {
        self.default_theme = theme;
        self
    }
}

#[async_trait]
impl Tool for RenderDiagramTool {
    fn name(&self) -> &str {
        RENDER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Render a Mermaid diagram to SVG or PNG. Returns the MIME type, the base64-encoded image bytes and any render warnings."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "diagram": {
                    "type": "string",
                    "description": "Mermaid diagram source, e.g. 'graph TD; A-->B'"
                },
                "format": {
                    "type": "string",
                    "enum": ["svg", "png"],
                    "description": format!("Output format (default: {})", self.default_format)
                },
                "engine": {
                    "type": "string",
                    "description": "Rendering engine to request from the backend"
                },
                "theme": {
                    "type": "string",
                    "description": "Mermaid theme name"
                }
            },
            "required": ["diagram"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let diagram = extract_string_arg(&args, "diagram")?;

        let format = match extract_optional_string_arg(&args, "format") {
            Some(raw) => match raw.parse::<RenderFormat>() {
                Ok(format) => format,
                Err(e) => return Ok(ToolResult::error(e.to_string())),
            },
            None => self.default_format,
        };

        let mut request = RenderRequest::new(diagram).with_format(format);
        if let Some(engine) = extract_optional_string_arg(&args, "engine") {
            request = request.with_engine_hint(engine);
        }
        if let Some(theme) =
            extract_optional_string_arg(&args, "theme").or_else(|| self.default_theme.clone())
        {
            request = request.with_theme(theme);
        }

        let adapter = self.adapter.clone();
        let rendered = tokio::task::spawn_blocking(move || adapter.render(&request)).await?;

        match rendered {
            Ok(result) => ToolResult::json(&result),
            Err(e) => {
                tracing::warn!(tool = RENDER_TOOL_NAME, kind = e.kind(), "Render failed: {}", e);
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}
