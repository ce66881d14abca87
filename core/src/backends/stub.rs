use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderFormat, RenderOptions};
use crate::traits::RenderBackend;
use std::sync::atomic::{AtomicBool, Ordering};

// 1x1 transparent PNG.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// In-process backend with deterministic output, for the `stub` engine and
/// for running without a `mermkit` install.
#[derive(Default)]
pub struct StubBackend {
    connected: AtomicBool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn start(&self) -> Result<(), DispatchError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), DispatchError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn render(
        &self,
        source: &str,
        options: RenderOptions<'_>,
    ) -> Result<BackendOutput, DispatchError> {
        if !self.is_connected() {
            return Err(DispatchError::BackendUnavailable(
                "stub backend is not started".to_string(),
            ));
        }

        let bytes = match options.format {
            RenderFormat::Svg => render_svg(source).into_bytes(),
            RenderFormat::Png => PIXEL_PNG.to_vec(),
        };

        Ok(BackendOutput {
            mime: Some(options.format.mime().to_string()),
            bytes,
            warnings: vec![],
        })
    }
}

fn render_svg(source: &str) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="40">"#,
            r#"<text x="4" y="24" font-family="monospace" font-size="12">{}</text>"#,
            "</svg>"
        ),
        escape_xml(source.trim())
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
