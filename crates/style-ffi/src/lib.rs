//! C boundary for the style-transfer host.
//!
//! Every function is null-safe and never unwinds into the caller. Load calls
//! report a status code; frame calls are silent no-ops on failure and leave the
//! caller's buffer as it was.
//!
//! A handle must only be used from one thread at a time. Distinct handles are
//! independent.

use std::ffi::{CStr, CString, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::ptr;
use style_infer::backends::OnnxBackend;
use style_infer::context::status;
use style_infer::{
    Backend, InferError, LoadStatus, ModelSource, PixelFormat, StyleConfig, StyleContext,
    load_status_code,
};

/// Opaque per-caller state: the context plus NUL-terminated copies of the
/// last enumerated device names.
pub struct StyleHandle<B: Backend = OnnxBackend> {
    context: StyleContext<B>,
    names: Vec<CString>,
}

impl StyleHandle {
    pub fn new(config: StyleConfig) -> Self {
        let backend = OnnxBackend::new(config.gpu_ordinals);
        Self::with_backend(backend, config)
    }
}

impl<B: Backend> StyleHandle<B> {
    pub fn with_backend(backend: B, config: StyleConfig) -> Self {
        if let Some(dir) = &config.log_dir {
            if let Err(e) = style_base::init_file_logger(dir) {
                log::warn!("cannot log to {}: {}", dir.display(), e);
            }
        }
        Self {
            context: StyleContext::new(backend, config),
            names: Vec::new(),
        }
    }

    pub fn context(&self) -> &StyleContext<B> {
        &self.context
    }

    /// Re-enumerate devices. Invalidates every name pointer handed out before.
    ///
    /// The names only come back once the whole enumeration succeeded, so an
    /// index is never resolved against a stale list.
    pub fn device_count(&mut self) -> Result<usize, InferError> {
        self.names.clear();
        let count = self.context.device_count()?;
        let names = self
            .context
            .devices()
            .iter()
            .map(|device| {
                CString::new(device.name())
                    .map_err(|e| InferError::Backend(format!("device name: {e}")))
            })
            .collect::<Result<_, _>>()?;
        self.names = names;
        Ok(count)
    }

    pub fn device_name(&self, index: usize) -> Option<&CStr> {
        self.names.get(index).map(CString::as_c_str)
    }

    pub fn load_model(
        &mut self,
        path: PathBuf,
        device_index: usize,
        dims: &mut [usize; 2],
    ) -> Result<LoadStatus, InferError> {
        self.context
            .load_model(ModelSource::File(path), device_index, dims)
    }

    pub fn perform_inference(&mut self, frame: &mut [u8], format: PixelFormat) {
        if let Err(e) = self.context.perform_inference(frame, format) {
            log::debug!("frame dropped: {e}");
        }
    }

    pub fn unload_model(&mut self) {
        self.context.unload();
    }
}

/// Run `f`, turning a panic into `fallback`.
fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("panic caught at the C boundary");
            fallback
        }
    }
}

/// Create a context with the config named by `STYLE_TRANSFER_CONFIG`, or the
/// defaults. Returns null when the config cannot be loaded.
#[unsafe(no_mangle)]
pub extern "C" fn style_context_create() -> *mut StyleHandle {
    guarded(ptr::null_mut(), || match StyleConfig::from_env() {
        Ok(config) => Box::into_raw(Box::new(StyleHandle::new(config))),
        Err(e) => {
            log::warn!("cannot create context: {e}");
            ptr::null_mut()
        }
    })
}

/// # Safety
///
/// `handle` must be null or come from `style_context_create` and not have been
/// destroyed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_context_destroy(handle: *mut StyleHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// Install the process logger: a file logger in `log_dir`, or stdout when null.
///
/// # Safety
///
/// `log_dir` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_init_logging(log_dir: *const c_char) -> i32 {
    if log_dir.is_null() {
        style_base::init_stdout_logger();
        return status::OK;
    }
    let Ok(dir) = unsafe { CStr::from_ptr(log_dir) }.to_str() else {
        return status::INVALID_ARGUMENT;
    };
    match style_base::init_file_logger(dir) {
        Ok(()) => status::OK,
        Err(_) => status::FAILED,
    }
}

/// Re-enumerate devices. Returns the count, or -1 on failure.
///
/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_get_device_count(handle: *mut StyleHandle) -> i32 {
    let Some(handle) = (unsafe { handle.as_mut() }) else {
        return -1;
    };
    guarded(-1, || match handle.device_count() {
        Ok(count) => i32::try_from(count).unwrap_or(-1),
        Err(e) => {
            log::warn!("device enumeration failed: {e}");
            -1
        }
    })
}

/// Name of the device at `index` from the last enumeration, or null.
///
/// The string stays valid until the next `style_get_device_count` or
/// `style_context_destroy` on the same handle.
///
/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_get_device_name(
    handle: *const StyleHandle,
    index: i32,
) -> *const c_char {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return ptr::null();
    };
    usize::try_from(index)
        .ok()
        .and_then(|index| handle.device_name(index))
        .map_or(ptr::null(), CStr::as_ptr)
}

/// Load a model for the device at `device_index` at `dims = [width, height]`.
///
/// Returns 0 (ready), 1 (model unreadable), 2 (reshape rejected, `dims` now
/// holds the native size), 3 (invalid argument) or 4 (other failure).
///
/// # Safety
///
/// `handle` must be null or a live handle, `path` null or a valid
/// NUL-terminated string, and `dims` null or valid for reads and writes of two
/// `i32`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_load_model(
    handle: *mut StyleHandle,
    path: *const c_char,
    device_index: i32,
    dims: *mut i32,
) -> i32 {
    if path.is_null() || dims.is_null() {
        return status::INVALID_ARGUMENT;
    }
    let Some(handle) = (unsafe { handle.as_mut() }) else {
        return status::INVALID_ARGUMENT;
    };
    let Ok(path) = unsafe { CStr::from_ptr(path) }.to_str() else {
        return status::INVALID_ARGUMENT;
    };
    let dims = unsafe { std::slice::from_raw_parts_mut(dims, 2) };
    let (Ok(device_index), Ok(width), Ok(height)) = (
        usize::try_from(device_index),
        usize::try_from(dims[0]),
        usize::try_from(dims[1]),
    ) else {
        return status::INVALID_ARGUMENT;
    };

    guarded(status::FAILED, || {
        let mut actual = [width, height];
        let result = handle.load_model(PathBuf::from(path), device_index, &mut actual);
        if let Err(e) = &result {
            log::warn!("loading {path} failed: {e}");
        }
        if result.is_ok() {
            let (Ok(width), Ok(height)) = (i32::try_from(actual[0]), i32::try_from(actual[1]))
            else {
                return status::FAILED;
            };
            dims.copy_from_slice(&[width, height]);
        }
        load_status_code(&result)
    })
}

/// Release the active session. The handle stays usable for another load.
///
/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_unload_model(handle: *mut StyleHandle) {
    if let Some(handle) = unsafe { handle.as_mut() } {
        guarded((), || handle.unload_model());
    }
}

/// # Safety
///
/// `handle` must be null or a live handle and `data` null or valid for reads
/// and writes of `len` bytes.
unsafe fn perform(handle: *mut StyleHandle, data: *mut u8, len: usize, format: PixelFormat) {
    if data.is_null() {
        return;
    }
    let Some(handle) = (unsafe { handle.as_mut() }) else {
        return;
    };
    let frame = unsafe { std::slice::from_raw_parts_mut(data, len) };
    guarded((), || handle.perform_inference(frame, format));
}

/// Stylize an RGBA frame of `width * height * 4` bytes in place.
///
/// # Safety
///
/// `handle` must be null or a live handle and `data` null or valid for reads
/// and writes of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_perform_inference(
    handle: *mut StyleHandle,
    data: *mut u8,
    len: usize,
) {
    unsafe { perform(handle, data, len, PixelFormat::Rgba8) }
}

/// Same as `style_perform_inference` for BGRA frames.
///
/// # Safety
///
/// See `style_perform_inference`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn style_perform_inference_bgra(
    handle: *mut StyleHandle,
    data: *mut u8,
    len: usize,
) {
    unsafe { perform(handle, data, len, PixelFormat::Bgra8) }
}
