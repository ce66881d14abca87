pub mod session;

pub use session::BackendSession;

use crate::error::DispatchError;
use crate::render::{RenderFormat, RenderOptions, RenderRequest, RenderResult};
use crate::traits::RenderBackend;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards render requests to a backend and normalizes what comes back.
///
/// Holds nothing but the backend handle and the fixed engine selector, so it
/// is cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct RenderAdapter {
    backend: Arc<dyn RenderBackend>,
    engine: Option<String>,
}

impl RenderAdapter {
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self {
            backend,
            engine: None,
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        let engine = engine.into();
        self.engine = if engine.trim().is_empty() {
            None
        } else {
            Some(engine)
        };
        self
    }

    /// Renders `source`, parsing `format` when given and defaulting to SVG.
    pub fn render_source(
        &self,
        source: &str,
        format: Option<&str>,
    ) -> Result<RenderResult, DispatchError> {
        let format = match format {
            Some(f) => f.parse()?,
            None => RenderFormat::default(),
        };
        self.render(&RenderRequest::new(source).with_format(format))
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderResult, DispatchError> {
        request.validate()?;

        if !self.backend.is_connected() {
            return Err(DispatchError::BackendUnavailable(format!(
                "{} backend is not started",
                self.backend.name()
            )));
        }

        let engine = request
            .engine_hint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .or(self.engine.as_deref());
        let options = RenderOptions {
            format: request.format,
            engine,
            theme: request.theme.as_deref(),
        };

        debug!(
            backend = self.backend.name(),
            format = %request.format,
            engine = engine.unwrap_or("default"),
            source_len = request.diagram_source.len(),
            "Dispatching render"
        );

        let output = self.backend.render(&request.diagram_source, options)?;

        if output.bytes.is_empty() {
            return Err(DispatchError::RenderError(
                "backend returned no bytes".to_string(),
            ));
        }

        let expected = request.format.mime();
        let mime = match output.mime {
            Some(mime) if mime.is_empty() => expected.to_string(),
            Some(mime) => {
                if !mime_matches(&mime, expected) {
                    return Err(DispatchError::RenderError(format!(
                        "backend returned {mime} for a {} request",
                        request.format
                    )));
                }
                mime
            }
            None => expected.to_string(),
        };

        for warning in &output.warnings {
            warn!(backend = self.backend.name(), "Render warning: {}", warning);
        }

        Ok(RenderResult {
            mime,
            bytes: output.bytes,
            warnings: output.warnings,
        })
    }
}

// Compares the media type only, ignoring parameters such as charset.
fn mime_matches(actual: &str, expected: &str) -> bool {
    actual
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::StubBackend;
    use crate::render::BackendOutput;
    use std::sync::Mutex;

    const DIAGRAM: &str = "graph TD; A-->B";

    fn started_stub() -> Arc<StubBackend> {
        let backend = Arc::new(StubBackend::new());
        backend.start().unwrap();
        backend
    }

    struct ScriptedBackend {
        output: Result<BackendOutput, DispatchError>,
        seen_engine: Mutex<Option<String>>,
    }

    impl ScriptedBackend {
        fn new(output: Result<BackendOutput, DispatchError>) -> Self {
            Self {
                output,
                seen_engine: Mutex::new(None),
            }
        }
    }

    impl RenderBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn start(&self) -> Result<(), DispatchError> {
            Ok(())
        }

        fn close(&self) -> Result<(), DispatchError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn render(
            &self,
            _source: &str,
            options: RenderOptions<'_>,
        ) -> Result<BackendOutput, DispatchError> {
            *self.seen_engine.lock().unwrap() = options.engine.map(str::to_string);
            self.output.clone()
        }
    }

    #[test]
    fn renders_svg() {
        let adapter = RenderAdapter::new(started_stub()).with_engine("stub");
        let result = adapter.render_source(DIAGRAM, Some("svg")).unwrap();
        assert_eq!(result.mime, "image/svg+xml");
        assert!(!result.bytes.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn renders_png() {
        let adapter = RenderAdapter::new(started_stub()).with_engine("stub");
        let result = adapter.render_source(DIAGRAM, Some("png")).unwrap();
        assert_eq!(result.mime, "image/png");
        assert!(!result.bytes.is_empty());
    }

    #[test]
    fn format_defaults_to_svg() {
        let adapter = RenderAdapter::new(started_stub());
        let result = adapter.render_source(DIAGRAM, None).unwrap();
        assert_eq!(result.mime, "image/svg+xml");
    }

    #[test]
    fn empty_source_is_invalid_argument() {
        let adapter = RenderAdapter::new(started_stub());
        let err = adapter.render_source("", Some("svg")).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_format_is_invalid_argument() {
        let adapter = RenderAdapter::new(started_stub());
        let err = adapter.render_source(DIAGRAM, Some("gif")).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArgument(_)));
    }

    #[test]
    fn render_before_start_is_unavailable() {
        let adapter = RenderAdapter::new(Arc::new(StubBackend::new()));
        let err = adapter.render_source(DIAGRAM, Some("svg")).unwrap_err();
        assert!(matches!(err, DispatchError::BackendUnavailable(_)));
    }

    #[test]
    fn identical_calls_are_identical() {
        let adapter = RenderAdapter::new(started_stub());
        for format in ["svg", "png"] {
            let first = adapter.render_source(DIAGRAM, Some(format)).unwrap();
            let second = adapter.render_source(DIAGRAM, Some(format)).unwrap();
            assert_eq!(first.mime, second.mime);
            assert_eq!(first.bytes, second.bytes);
        }
    }

    #[test]
    fn request_engine_overrides_fixed_engine() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: None,
            bytes: b"<svg/>".to_vec(),
            warnings: vec![],
        })));
        let adapter = RenderAdapter::new(backend.clone()).with_engine("stub");

        adapter.render_source(DIAGRAM, None).unwrap();
        assert_eq!(backend.seen_engine.lock().unwrap().as_deref(), Some("stub"));

        let request = RenderRequest::new(DIAGRAM).with_engine_hint("elk");
        adapter.render(&request).unwrap();
        assert_eq!(backend.seen_engine.lock().unwrap().as_deref(), Some("elk"));
    }

    #[test]
    fn blank_engine_hint_keeps_fixed_engine() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: None,
            bytes: b"<svg/>".to_vec(),
            warnings: vec![],
        })));
        let adapter = RenderAdapter::new(backend.clone()).with_engine("stub");

        let mut request = RenderRequest::new(DIAGRAM);
        request.engine_hint = Some("  ".to_string());
        adapter.render(&request).unwrap();
        assert_eq!(backend.seen_engine.lock().unwrap().as_deref(), Some("stub"));
    }

    #[test]
    fn missing_mime_falls_back_to_format() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: None,
            bytes: vec![0x89, b'P', b'N', b'G'],
            warnings: vec![],
        })));
        let adapter = RenderAdapter::new(backend);
        let result = adapter.render_source(DIAGRAM, Some("png")).unwrap();
        assert_eq!(result.mime, "image/png");
    }

    #[test]
    fn mismatched_mime_is_render_error() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
            warnings: vec![],
        })));
        let adapter = RenderAdapter::new(backend);
        let err = adapter.render_source(DIAGRAM, Some("svg")).unwrap_err();
        assert!(matches!(err, DispatchError::RenderError(_)));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: Some("image/svg+xml; charset=utf-8".to_string()),
            bytes: b"<svg/>".to_vec(),
            warnings: vec![],
        })));
        let adapter = RenderAdapter::new(backend);
        let result = adapter.render_source(DIAGRAM, Some("svg")).unwrap();
        assert_eq!(result.mime, "image/svg+xml; charset=utf-8");
    }

    #[test]
    fn empty_bytes_is_render_error() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput::default())));
        let adapter = RenderAdapter::new(backend);
        let err = adapter.render_source(DIAGRAM, None).unwrap_err();
        assert!(matches!(err, DispatchError::RenderError(_)));
    }

    #[test]
    fn warnings_are_passed_through() {
        let backend = Arc::new(ScriptedBackend::new(Ok(BackendOutput {
            mime: Some("image/svg+xml".to_string()),
            bytes: b"<svg/>".to_vec(),
            warnings: vec!["unknown theme".to_string(), "font fallback".to_string()],
        })));
        let adapter = RenderAdapter::new(backend);
        let result = adapter.render_source(DIAGRAM, None).unwrap();
        assert_eq!(result.warnings, vec!["unknown theme", "font fallback"]);
    }

    #[test]
    fn backend_errors_propagate() {
        let backend = Arc::new(ScriptedBackend::new(Err(DispatchError::RenderError(
            "Parse error on line 1".to_string(),
        ))));
        let adapter = RenderAdapter::new(backend);
        let err = adapter.render_source(DIAGRAM, None).unwrap_err();
        assert_eq!(
            err,
            DispatchError::RenderError("Parse error on line 1".to_string())
        );
    }
}
