use crate::error::DispatchError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Svg,
    Png,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
        }
    }
}

impl std::fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            other => Err(DispatchError::InvalidArgument(format!(
                "unsupported format '{other}', expected svg or png"
            ))),
        }
    }
}

/// A single render call. Built per call and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub diagram_source: String,
    pub format: RenderFormat,
    /// Opaque engine token; its meaning is up to the backend.
    pub engine_hint: Option<String>,
    pub theme: Option<String>,
}

impl RenderRequest {
    pub fn new(diagram_source: impl Into<String>) -> Self {
        Self {
            diagram_source: diagram_source.into(),
            format: RenderFormat::default(),
            engine_hint: None,
            theme: None,
        }
    }

    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    /// Blank hints are dropped so the adapter's fixed engine applies.
    pub fn with_engine_hint(mut self, engine: impl Into<String>) -> Self {
        let engine = engine.into();
        self.engine_hint = (!engine.trim().is_empty()).then_some(engine);
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.diagram_source.trim().is_empty() {
            return Err(DispatchError::InvalidArgument(
                "diagram source must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options forwarded to a backend alongside the diagram source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions<'a> {
    pub format: RenderFormat,
    pub engine: Option<&'a str>,
    pub theme: Option<&'a str>,
}

/// Raw response of a backend before the adapter normalizes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOutput {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub mime: String,
    #[serde(serialize_with = "serialize_base64")]
    pub bytes: Vec<u8>,
    pub warnings: Vec<String>,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("SVG".parse::<RenderFormat>().unwrap(), RenderFormat::Svg);
        assert_eq!(" png ".parse::<RenderFormat>().unwrap(), RenderFormat::Png);
    }

    #[test]
    fn unknown_format_is_invalid_argument() {
        let err = "pdf".parse::<RenderFormat>().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArgument(_)));
    }

    #[test]
    fn format_mime_types() {
        assert_eq!(RenderFormat::Svg.mime(), "image/svg+xml");
        assert_eq!(RenderFormat::Png.mime(), "image/png");
        assert_eq!(RenderFormat::default(), RenderFormat::Svg);
    }

    #[test]
    fn blank_engine_hint_is_dropped() {
        assert_eq!(RenderRequest::new("graph TD").with_engine_hint("  ").engine_hint, None);
        assert_eq!(
            RenderRequest::new("graph TD")
                .with_engine_hint("elk")
                .engine_hint
                .as_deref(),
            Some("elk")
        );
    }

    #[test]
    fn blank_source_fails_validation() {
        assert!(RenderRequest::new("").validate().is_err());
        assert!(RenderRequest::new("  \n").validate().is_err());
        assert!(RenderRequest::new("graph TD; A-->B").validate().is_ok());
    }

    #[test]
    fn result_serializes_bytes_as_base64() {
        let result = RenderResult {
            mime: "image/svg+xml".to_string(),
            bytes: b"<svg></svg>".to_vec(),
            warnings: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["bytes"], "PHN2Zz48L3N2Zz4=");
        assert_eq!(value["mime"], "image/svg+xml");
        assert_eq!(value["warnings"], serde_json::json!([]));
    }
}
