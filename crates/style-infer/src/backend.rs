use crate::{Device, DeviceTarget, InferError, ModelSource, Session};
use std::fmt;
use std::path::{Path, PathBuf};

/// Compilation cache directory for one device class.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDir {
    pub device_class: String,
    pub dir: PathBuf,
}

/// Per-load compile settings.
///
/// Scheduling and precision are not options: every session is compiled for
/// single-request latency (sequential execution) in full f32.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub cache: Option<CacheDir>,
    pub intra_threads: Option<usize>,
}

impl CompileOptions {
    /// No cache, runtime-chosen thread count.
    pub fn latency_f32() -> Self {
        Self {
            cache: None,
            intra_threads: None,
        }
    }

    pub fn with_cache(mut self, device_class: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.cache = Some(CacheDir {
            device_class: device_class.into(),
            dir: dir.into(),
        });
        self
    }

    pub fn with_intra_threads(mut self, threads: Option<usize>) -> Self {
        self.intra_threads = threads;
        self
    }

    /// Cache directory that applies to `device`, if its class is the cached one.
    pub fn cache_for(&self, device: &Device) -> Option<&Path> {
        self.cache
            .as_ref()
            .filter(|cache| cache.device_class.eq_ignore_ascii_case(device.class()))
            .map(|cache| cache.dir.as_path())
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::latency_f32()
    }
}

/// Declared input or output of a model. `None` dimensions are dynamic.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: Option<String>,
    pub element_type: String,
    pub shape: Vec<Option<usize>>,
}

impl fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .shape
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();
        write!(
            f,
            "name: {}, type: {}, shape: [{}]",
            self.name.as_deref().unwrap_or("NONE"),
            self.element_type,
            dims.join(",")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelInfo {
    pub name: String,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

impl ModelInfo {
    /// Declared shape of the single image input.
    pub fn input_shape(&self) -> Result<&[Option<usize>], InferError> {
        match self.inputs.as_slice() {
            [input] => Ok(&input.shape),
            other => Err(InferError::ModelLoad(format!(
                "expected exactly one model input, found {}",
                other.len()
            ))),
        }
    }
}

/// Check that a model declaring `declared` can take `requested` (`[N, C, H, W]`).
///
/// Dynamic dimensions accept any size, static ones must match exactly.
pub fn check_reshape(declared: &[Option<usize>], requested: [usize; 4]) -> Result<(), InferError> {
    if declared.len() != 4 {
        return Err(InferError::Reshape(format!(
            "model input has rank {}, expected 4",
            declared.len()
        )));
    }
    for (axis, (dim, want)) in declared.iter().zip(requested).enumerate() {
        if let Some(have) = dim {
            if *have != want {
                return Err(InferError::Reshape(format!(
                    "axis {axis} is fixed at {have}, cannot be {want}"
                )));
            }
        }
    }
    Ok(())
}

/// Concrete `[N, C, H, W]` a model runs at.
///
/// A successful reshape wins. Otherwise dynamic batch and channel axes become
/// 1 and 3, and dynamic spatial axes are an error because nothing fixes them.
pub fn resolve_shape(
    declared: &[Option<usize>],
    reshaped: Option<[usize; 4]>,
) -> Result<[usize; 4], InferError> {
    if let Some(shape) = reshaped {
        return Ok(shape);
    }
    match declared {
        &[n, c, Some(h), Some(w)] => Ok([n.unwrap_or(1), c.unwrap_or(3), h, w]),
        other => Err(InferError::ShapeMismatch {
            expected: "[N, C, H, W] with fixed H and W".to_string(),
            got: format!("{other:?}"),
        }),
    }
}

/// A loaded network that has not been compiled yet.
pub trait Model {
    fn info(&self) -> &ModelInfo;

    /// Fix the input to `[N, C, H, W]`. On error the model keeps its declared shape.
    fn reshape(&mut self, shape: [usize; 4]) -> Result<(), InferError>;
}

/// An inference runtime: enumerates devices, loads and compiles models.
pub trait Backend {
    type Model: Model;

    fn name(&self) -> &str;

    /// Devices in the order the runtime reports them, unfiltered.
    fn available_devices(&self) -> Result<Vec<Device>, InferError>;

    fn read_model(&self, source: &ModelSource) -> Result<Self::Model, InferError>;

    fn compile(
        &self,
        model: Self::Model,
        target: &DeviceTarget,
        options: &CompileOptions,
    ) -> Result<Box<dyn Session>, InferError>;
}
