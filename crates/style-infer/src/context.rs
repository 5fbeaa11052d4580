use crate::prepare::{LoadStatus, prepare_session};
use crate::{
    Backend, Device, DeviceList, DeviceTarget, InferError, ModelSource, StyleConfig,
    StyleSession, driver,
};
use style_image::PixelFormat;

/// Status codes reported across the C boundary.
pub mod status {
    pub const OK: i32 = 0;
    pub const MODEL_LOAD_FAILED: i32 = 1;
    pub const RESHAPE_FAILED: i32 = 2;
    pub const INVALID_ARGUMENT: i32 = 3;
    pub const FAILED: i32 = 4;
}

/// Map the outcome of `StyleContext::load_model` to its status code.
pub fn load_status_code(result: &Result<LoadStatus, InferError>) -> i32 {
    match result {
        Ok(LoadStatus::Ready) => status::OK,
        Ok(LoadStatus::Degraded { .. }) => status::RESHAPE_FAILED,
        Err(InferError::ModelLoad(_)) => status::MODEL_LOAD_FAILED,
        Err(InferError::DeviceIndex { .. } | InferError::InvalidDimensions { .. }) => {
            status::INVALID_ARGUMENT
        }
        Err(_) => status::FAILED,
    }
}

/// Everything the host keeps between calls: the backend, the last device
/// enumeration and at most one active session.
pub struct StyleContext<B: Backend> {
    backend: B,
    config: StyleConfig,
    devices: DeviceList,
    session: Option<StyleSession>,
}

impl<B: Backend> StyleContext<B> {
    pub fn new(backend: B, config: StyleConfig) -> Self {
        Self {
            backend,
            config,
            devices: DeviceList::new(),
            session: None,
        }
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn session(&self) -> Option<&StyleSession> {
        self.session.as_ref()
    }

    /// Enumerate devices and cache the filtered list. Indices passed to
    /// `device_name` and `load_model` refer to the most recent enumeration.
    pub fn device_count(&mut self) -> Result<usize, InferError> {
        self.devices
            .refresh(&self.backend, &self.config.excluded_device_class)
    }

    pub fn device_name(&self, index: usize) -> Result<&Device, InferError> {
        self.devices.get(index)
    }

    /// Prepare a session for the model on the device at `device_index`.
    ///
    /// `dims` is `[width, height]` in, and the dimensions the session actually
    /// runs at out. Those differ when the result is `Degraded`. On error the
    /// previous session and `dims` are left untouched.
    pub fn load_model(
        &mut self,
        source: ModelSource,
        device_index: usize,
        dims: &mut [usize; 2],
    ) -> Result<LoadStatus, InferError> {
        let [width, height] = *dims;
        let device = self.devices.get(device_index)?.clone();
        let target = DeviceTarget::single(device);

        let prepared = prepare_session(
            &self.backend,
            &source,
            &target,
            width,
            height,
            &self.config.compile_options(),
            self.config.normalization,
        )?;

        *dims = [prepared.session.width(), prepared.session.height()];
        if self.session.replace(prepared.session).is_some() {
            log::debug!("replaced previous session");
        }
        Ok(prepared.status)
    }

    /// Stylize a frame of the active session's size in place.
    pub fn perform_inference(
        &mut self,
        frame: &mut [u8],
        format: PixelFormat,
    ) -> Result<(), InferError> {
        let session = self.session.as_mut().ok_or(InferError::NoSession)?;
        driver::run_on_frame(session, frame, format)
    }

    /// Drop the active session, if any.
    pub fn unload(&mut self) {
        self.session = None;
    }
}
