use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::ptr;
use style_ffi::{
    StyleHandle, style_context_destroy, style_get_device_count, style_get_device_name,
    style_load_model, style_perform_inference, style_perform_inference_bgra, style_unload_model,
};
use style_infer::context::status;
use style_infer::{
    Backend, CompileOptions, Device, DeviceTarget, InferError, Model, ModelInfo, ModelSource,
    Session, StyleConfig,
};

const IDENTITY: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../style-infer/tests/fixtures/identity.onnx"
);

fn config() -> StyleConfig {
    StyleConfig {
        cache_dir: std::env::temp_dir().join(format!("style-ffi-cache-{}", std::process::id())),
        ..StyleConfig::default()
    }
}

fn handle() -> *mut StyleHandle {
    Box::into_raw(Box::new(StyleHandle::new(config())))
}

/// Backend whose second enumeration reports a name C cannot represent.
struct RenamingBackend {
    calls: Cell<usize>,
}

struct NoModel;

impl Model for NoModel {
    fn info(&self) -> &ModelInfo {
        unreachable!()
    }

    fn reshape(&mut self, _shape: [usize; 4]) -> Result<(), InferError> {
        unreachable!()
    }
}

impl Backend for RenamingBackend {
    type Model = NoModel;

    fn name(&self) -> &str {
        "renaming"
    }

    fn available_devices(&self) -> Result<Vec<Device>, InferError> {
        let calls = self.calls.get();
        self.calls.set(calls + 1);
        if calls == 0 {
            Ok(vec![Device::cpu(), Device::new("GPU")])
        } else {
            Ok(vec![Device::new("GPU\0bad")])
        }
    }

    fn read_model(&self, _source: &ModelSource) -> Result<NoModel, InferError> {
        Err(InferError::ModelLoad("no models here".to_string()))
    }

    fn compile(
        &self,
        _model: NoModel,
        _target: &DeviceTarget,
        _options: &CompileOptions,
    ) -> Result<Box<dyn Session>, InferError> {
        Err(InferError::Compile("no models here".to_string()))
    }
}

fn missing_model() -> CString {
    let path = std::env::temp_dir().join(format!("style-ffi-{}-missing.onnx", std::process::id()));
    CString::new(path.to_str().unwrap()).unwrap()
}

#[test]
fn test_null_handle_is_safe() {
    unsafe {
        assert_eq!(style_get_device_count(ptr::null_mut()), -1);
        assert!(style_get_device_name(ptr::null(), 0).is_null());
        let mut dims = [8, 8];
        let path = missing_model();
        assert_eq!(
            style_load_model(ptr::null_mut(), path.as_ptr(), 0, dims.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );
        let mut frame = [1u8; 4];
        style_perform_inference(ptr::null_mut(), frame.as_mut_ptr(), frame.len());
        assert_eq!(frame, [1u8; 4]);
        style_context_destroy(ptr::null_mut());
    }
}

#[test]
fn test_device_enumeration_lists_cpu_first() {
    let handle = handle();
    unsafe {
        let count = style_get_device_count(handle);
        assert!(count >= 1);
        let name = style_get_device_name(handle, 0);
        assert_eq!(CStr::from_ptr(name).to_str().unwrap(), "CPU");
        assert!(style_get_device_name(handle, count).is_null());
        assert!(style_get_device_name(handle, -1).is_null());
        style_context_destroy(handle);
    }
}

#[test]
fn test_device_name_before_enumeration_is_null() {
    let handle = handle();
    unsafe {
        assert!(style_get_device_name(handle, 0).is_null());
        style_context_destroy(handle);
    }
}

#[test]
fn test_load_model_invalid_arguments() {
    let handle = handle();
    let path = missing_model();
    unsafe {
        style_get_device_count(handle);

        let mut dims = [8, 8];
        assert_eq!(
            style_load_model(handle, ptr::null(), 0, dims.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 0, ptr::null_mut()),
            status::INVALID_ARGUMENT
        );
        assert_eq!(
            style_load_model(handle, path.as_ptr(), -1, dims.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 99, dims.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );

        let mut negative = [-4, 8];
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 0, negative.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );
        let mut zero = [0, 8];
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 0, zero.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );

        let not_utf8 = CString::new(vec![0xffu8, 0xfe]).unwrap();
        assert_eq!(
            style_load_model(handle, not_utf8.as_ptr(), 0, dims.as_mut_ptr()),
            status::INVALID_ARGUMENT
        );
        style_context_destroy(handle);
    }
}

#[test]
fn test_load_model_missing_file() {
    let handle = handle();
    let path = missing_model();
    unsafe {
        style_get_device_count(handle);
        let mut dims = [320, 240];
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 0, dims.as_mut_ptr()),
            status::MODEL_LOAD_FAILED
        );
        assert_eq!(dims, [320, 240]);
        assert!((*handle).context().session().is_none());
        style_context_destroy(handle);
    }
}

#[test]
fn test_perform_inference_without_model_is_noop() {
    let handle = handle();
    let mut frame = vec![7u8; 16];
    unsafe {
        style_perform_inference(handle, frame.as_mut_ptr(), frame.len());
        style_perform_inference_bgra(handle, frame.as_mut_ptr(), frame.len());
        style_perform_inference(handle, ptr::null_mut(), 16);
        style_context_destroy(handle);
    }
    assert!(frame.iter().all(|&b| b == 7));
}

#[test]
fn test_failed_enumeration_drops_old_names() {
    let backend = RenamingBackend {
        calls: Cell::new(0),
    };
    let mut handle = StyleHandle::with_backend(backend, config());
    assert_eq!(handle.device_count().unwrap(), 2);
    assert_eq!(handle.device_name(1).unwrap().to_str().unwrap(), "GPU");

    assert!(handle.device_count().is_err());
    assert!(handle.device_name(0).is_none());
    assert!(handle.device_name(1).is_none());
}

#[test]
fn test_load_run_unload() {
    let handle = handle();
    let path = CString::new(IDENTITY).unwrap();
    unsafe {
        assert!(style_get_device_count(handle) >= 1);
        let mut dims = [2, 1];
        assert_eq!(
            style_load_model(handle, path.as_ptr(), 0, dims.as_mut_ptr()),
            status::OK
        );
        assert_eq!(dims, [2, 1]);

        let mut frame = [100u8, 150, 200, 255, 10, 20, 30, 255];
        style_perform_inference(handle, frame.as_mut_ptr(), frame.len());
        assert_eq!(frame, [147, 150, 149, 255, 126, 121, 110, 255]);

        style_unload_model(handle);
        assert!((*handle).context().session().is_none());
        let mut frame = [1u8; 8];
        style_perform_inference(handle, frame.as_mut_ptr(), frame.len());
        assert_eq!(frame, [1u8; 8]);

        style_unload_model(handle);
        style_unload_model(ptr::null_mut());
        style_context_destroy(handle);
    }
}
