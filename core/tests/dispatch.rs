use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drawbridge_core::{
    BackendSession, Config, DispatchError, RENDER_TOOL_NAME, RenderAdapter, RenderDiagramTool,
    RenderFormat, RenderRequest, StubBackend, ToolRegistry, create_backend,
};
use serde_json::{Value, json};
use std::sync::Arc;

const DIAGRAM: &str = "graph TD; A-->B";

fn stub_config() -> Config {
    Config {
        backend: "stub".to_string(),
        engine: Some("stub".to_string()),
        ..Config::default()
    }
}

#[test]
fn adapter_scenarios() {
    let session = BackendSession::start(create_backend(&stub_config()).unwrap()).unwrap();
    let adapter = RenderAdapter::new(session.backend()).with_engine("stub");

    let svg = adapter
        .render(&RenderRequest::new(DIAGRAM).with_format(RenderFormat::Svg))
        .unwrap();
    assert_eq!(svg.mime, "image/svg+xml");
    assert!(!svg.bytes.is_empty());
    assert!(svg.warnings.is_empty());

    let png = adapter
        .render(&RenderRequest::new(DIAGRAM).with_format(RenderFormat::Png))
        .unwrap();
    assert_eq!(png.mime, "image/png");
    assert!(!png.bytes.is_empty());

    session.close().unwrap();
    assert!(matches!(
        adapter.render_source(DIAGRAM, None),
        Err(DispatchError::BackendUnavailable(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn registry_dispatch_round() {
    let backend = Arc::new(StubBackend::new());
    let session = BackendSession::start(backend).unwrap();
    let adapter = Arc::new(RenderAdapter::new(session.backend()).with_engine("stub"));

    let registry = ToolRegistry::new();
    registry
        .register(Arc::new(RenderDiagramTool::new(adapter)))
        .unwrap();

    let first = registry
        .execute(RENDER_TOOL_NAME, json!({"diagram": DIAGRAM, "format": "png"}))
        .await;
    let second = registry
        .execute(RENDER_TOOL_NAME, json!({"diagram": DIAGRAM, "format": "png"}))
        .await;
    assert!(first.success);
    assert_eq!(first.output, second.output);

    let value: Value = serde_json::from_str(&first.output).unwrap();
    assert_eq!(value["mime"], "image/png");
    let bytes = STANDARD.decode(value["bytes"].as_str().unwrap()).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
