use crate::backend::{Backend, CompileOptions, Model, ModelInfo};
use crate::codec::{CHANNELS, Normalization};
use crate::{DeviceTarget, InferError, ModelSource, StyleSession};

/// How a load went when it produced a usable session.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// The session runs at the requested size.
    Ready,
    /// The model refused the requested size and runs at its native one.
    Degraded { reason: String },
}

pub struct Prepared {
    pub session: StyleSession,
    pub status: LoadStatus,
    /// Model signature with the shapes the session was compiled at.
    pub info: ModelInfo,
}

/// Load, reshape and compile a style model.
///
/// An unreadable model is a hard `ModelLoad` error. A rejected reshape is not:
/// the model is compiled at its native shape and the result is `Degraded`.
/// Callers must size frames from `session.width()` / `session.height()`.
pub fn prepare_session<B: Backend>(
    backend: &B,
    source: &ModelSource,
    target: &DeviceTarget,
    width: usize,
    height: usize,
    options: &CompileOptions,
    normalization: Normalization,
) -> Result<Prepared, InferError> {
    if width == 0 || height == 0 {
        return Err(InferError::InvalidDimensions { width, height });
    }

    provision_cache(options);

    let mut model = backend.read_model(source).map_err(|e| match e {
        InferError::ModelLoad(_) => e,
        other => InferError::ModelLoad(other.to_string()),
    })?;
    log::info!("[{}] loaded model '{}' from {}", backend.name(), model.info().name, source);

    let status = match model.reshape([1, CHANNELS, height, width]) {
        Ok(()) => LoadStatus::Ready,
        Err(e) => {
            log::warn!("reshape to {width}x{height} failed, keeping native input shape: {e}");
            LoadStatus::Degraded {
                reason: e.to_string(),
            }
        }
    };

    let mut info = model.info().clone();
    let session = backend.compile(model, target, options)?;
    let session = StyleSession::new(session, normalization)?;

    let compiled = vec![
        Some(1),
        Some(CHANNELS),
        Some(session.height()),
        Some(session.width()),
    ];
    for tensor in info.inputs.iter_mut().chain(info.outputs.iter_mut()) {
        tensor.shape = compiled.clone();
    }
    log::info!(
        "[{}] compiled for {}: {}x{}",
        backend.name(),
        target,
        session.width(),
        session.height()
    );

    Ok(Prepared {
        session,
        status,
        info,
    })
}

/// The cache only speeds up later compilations, so failing to create it is not fatal.
fn provision_cache(options: &CompileOptions) {
    if let Some(cache) = &options.cache {
        if let Err(e) = std::fs::create_dir_all(&cache.dir) {
            log::warn!(
                "cannot create compilation cache {}: {}",
                cache.dir.display(),
                e
            );
        }
    }
}
