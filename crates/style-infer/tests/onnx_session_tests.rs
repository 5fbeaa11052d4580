use std::path::PathBuf;
use style_infer::backends::OnnxBackend;
use style_infer::context::status;
use style_infer::{
    Backend, CompileOptions, Device, DeviceTarget, InferError, LoadStatus, Model, ModelSource,
    Normalization, PixelFormat, StyleConfig, StyleContext, load_status_code, prepare_session,
    run_on_frame,
};

/// Identity graph, input and output `[1, 3, h, w]`.
const IDENTITY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/identity.onnx");
/// Identity graph fixed at `[1, 3, 2, 3]`.
const FIXED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fixed.onnx");
/// Concatenates the input with itself along W, declared output fully symbolic.
const CONCAT_WIDE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/concat_wide.onnx");

fn fixture(path: &str) -> ModelSource {
    ModelSource::File(PathBuf::from(path))
}

fn cpu() -> DeviceTarget {
    DeviceTarget::single(Device::cpu())
}

#[test]
fn test_read_model_symbolic_dims() {
    let model = OnnxBackend::default().read_model(&fixture(IDENTITY)).unwrap();
    let info = model.info();
    assert_eq!(info.name, "identity");
    assert_eq!(info.inputs.len(), 1);
    assert_eq!(info.inputs[0].name.as_deref(), Some("x"));
    assert_eq!(info.inputs[0].shape, vec![Some(1), Some(3), None, None]);
    assert_eq!(info.outputs[0].name.as_deref(), Some("y"));
}

#[test]
fn test_read_model_garbage_bytes() {
    let result = OnnxBackend::default().read_model(&ModelSource::Memory(b"garbage".to_vec()));
    assert!(matches!(result, Err(InferError::ModelLoad(_))));
}

#[test]
fn test_end_to_end_two_pixels_rgba() {
    let backend = OnnxBackend::default();
    let prepared = prepare_session(
        &backend,
        &fixture(IDENTITY),
        &cpu(),
        2,
        1,
        &CompileOptions::default(),
        Normalization::IMAGENET,
    )
    .unwrap();
    assert_eq!(prepared.status, LoadStatus::Ready);
    assert_eq!(prepared.info.inputs[0].shape, vec![Some(1), Some(3), Some(1), Some(2)]);

    let mut session = prepared.session;
    let mut frame = [100u8, 150, 200, 255, 10, 20, 30, 255];
    run_on_frame(&mut session, &mut frame, PixelFormat::Rgba8).unwrap();
    assert_eq!(frame, [147, 150, 149, 255, 126, 121, 110, 255]);

    let mut frame = [200u8, 150, 100, 0, 30, 20, 10, 0];
    run_on_frame(&mut session, &mut frame, PixelFormat::Bgra8).unwrap();
    assert_eq!(frame, [149, 150, 147, 255, 110, 121, 126, 255]);
}

#[test]
fn test_fixed_model_falls_back_to_native_size() {
    let backend = OnnxBackend::default();
    let prepared = prepare_session(
        &backend,
        &fixture(FIXED),
        &cpu(),
        64,
        64,
        &CompileOptions::default(),
        Normalization::IMAGENET,
    )
    .unwrap();
    assert!(matches!(prepared.status, LoadStatus::Degraded { .. }));
    assert_eq!(prepared.session.width(), 3);
    assert_eq!(prepared.session.height(), 2);

    let mut session = prepared.session;
    let mut frame = vec![0u8; 3 * 2 * 4];
    run_on_frame(&mut session, &mut frame, PixelFormat::Rgba8).unwrap();
    assert!(frame.chunks(4).all(|px| px[3] == 255));
}

#[test]
fn test_context_reports_native_dims() {
    let config = StyleConfig {
        cache_dir: std::env::temp_dir().join(format!("style-onnx-cache-{}", std::process::id())),
        ..StyleConfig::default()
    };
    let mut context = StyleContext::new(OnnxBackend::default(), config);
    context.device_count().unwrap();

    let mut dims = [64, 64];
    let result = context.load_model(fixture(FIXED), 0, &mut dims);
    assert_eq!(load_status_code(&result), status::RESHAPE_FAILED);
    assert_eq!(dims, [3, 2]);
    assert!(context.session().is_some());
}

#[test]
fn test_output_size_mismatch_fails_compile() {
    let backend = OnnxBackend::default();
    let result = prepare_session(
        &backend,
        &fixture(CONCAT_WIDE),
        &cpu(),
        4,
        2,
        &CompileOptions::default(),
        Normalization::IMAGENET,
    );
    assert!(matches!(result, Err(InferError::Compile(_))));
}
