use crate::backend::{
    CompileOptions, Model, ModelInfo, TensorInfo, check_reshape, resolve_shape,
};
use crate::{Backend, Device, DeviceTarget, InferError, ModelSource, Session};
use ndarray::ArrayView4;
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session as OrtSession;
use ort::value::{TensorRef, ValueType};
use std::path::PathBuf;
use style_base::tensor::element_count;

pub const CPU: &str = "CPU";
pub const CUDA: &str = "CUDA";
pub const TENSORRT: &str = "TensorRT";

/// ONNX Runtime backend.
///
/// Devices are execution providers: `CPU` always, plus `CUDA.n` and
/// `TensorRT.n` for the first `gpu_ordinals` GPUs when the provider was built
/// in and its runtime library is present.
pub struct OnnxBackend {
    gpu_ordinals: usize,
}

impl OnnxBackend {
    pub fn new(gpu_ordinals: usize) -> Self {
        Self { gpu_ordinals }
    }
}

impl Default for OnnxBackend {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Device list for the providers that are usable, CPU first.
pub fn device_names(cuda: bool, tensorrt: bool, gpu_ordinals: usize) -> Vec<Device> {
    let mut devices = vec![Device::new(CPU)];
    if cuda {
        devices.extend((0..gpu_ordinals).map(|n| Device::with_ordinal(CUDA, n)));
    }
    if tensorrt {
        devices.extend((0..gpu_ordinals).map(|n| Device::with_ordinal(TENSORRT, n)));
    }
    devices
}

/// Negative dimensions are symbolic in ONNX.
pub fn dims_from_ort(dims: &[i64]) -> Vec<Option<usize>> {
    dims.iter()
        .map(|&d| if d < 0 { None } else { Some(d as usize) })
        .collect()
}

fn tensor_info(name: &str, value_type: &ValueType) -> TensorInfo {
    match value_type {
        ValueType::Tensor { ty, shape, .. } => TensorInfo {
            name: (!name.is_empty()).then(|| name.to_string()),
            element_type: format!("{ty:?}"),
            shape: dims_from_ort(shape),
        },
        other => TensorInfo {
            name: (!name.is_empty()).then(|| name.to_string()),
            element_type: format!("{other:?}"),
            shape: Vec::new(),
        },
    }
}

/// Execution provider to register, decoupled from ort so the plan can be checked on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSpec {
    Cpu,
    Cuda {
        device_id: i32,
    },
    TensorRt {
        device_id: i32,
        engine_cache: Option<PathBuf>,
    },
}

/// Providers for `target` in priority order.
pub fn provider_plan(
    target: &DeviceTarget,
    options: &CompileOptions,
) -> Result<Vec<ProviderSpec>, InferError> {
    target
        .devices()
        .iter()
        .map(|device| {
            let device_id = device.ordinal().unwrap_or(0) as i32;
            match device.class() {
                c if c.eq_ignore_ascii_case(CPU) => Ok(ProviderSpec::Cpu),
                c if c.eq_ignore_ascii_case(CUDA) => Ok(ProviderSpec::Cuda { device_id }),
                c if c.eq_ignore_ascii_case(TENSORRT) => Ok(ProviderSpec::TensorRt {
                    device_id,
                    engine_cache: options.cache_for(device).map(|dir| dir.to_path_buf()),
                }),
                _ => Err(InferError::UnsupportedDevice(device.name().to_string())),
            }
        })
        .collect()
}

fn dispatch(spec: &ProviderSpec) -> Result<ExecutionProviderDispatch, InferError> {
    match spec {
        ProviderSpec::Cpu => Ok(CPUExecutionProvider::default().build()),
        #[cfg(feature = "cuda")]
        ProviderSpec::Cuda { device_id } => {
            use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
            let ep = CUDAExecutionProvider::default().with_device_id(*device_id);
            log::debug!(
                "[onnx] CUDA EP requested (device_id={}), available: {}",
                device_id,
                ep.is_available().unwrap_or(false)
            );
            Ok(ep.build().error_on_failure())
        }
        #[cfg(feature = "tensorrt")]
        ProviderSpec::TensorRt {
            device_id,
            engine_cache,
        } => {
            use ort::execution_providers::{ExecutionProvider, TensorRTExecutionProvider};
            let mut ep = TensorRTExecutionProvider::default()
                .with_device_id(*device_id)
                .with_fp16(false);
            if let Some(dir) = engine_cache {
                ep = ep
                    .with_engine_cache(true)
                    .with_engine_cache_path(dir.display().to_string());
            }
            log::debug!(
                "[onnx] TensorRT EP requested (device_id={}), available: {}",
                device_id,
                ep.is_available().unwrap_or(false)
            );
            Ok(ep.build().error_on_failure())
        }
        #[allow(unreachable_patterns)]
        other => Err(InferError::UnsupportedDevice(format!(
            "{other:?} (provider not built in)"
        ))),
    }
}

impl Backend for OnnxBackend {
    type Model = OnnxModel;

    fn name(&self) -> &str {
        "onnx"
    }

    fn available_devices(&self) -> Result<Vec<Device>, InferError> {
        #[cfg(feature = "cuda")]
        let cuda = {
            use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
            CUDAExecutionProvider::default().is_available()?
        };
        #[cfg(not(feature = "cuda"))]
        let cuda = false;

        #[cfg(feature = "tensorrt")]
        let tensorrt = {
            use ort::execution_providers::{ExecutionProvider, TensorRTExecutionProvider};
            TensorRTExecutionProvider::default().is_available()?
        };
        #[cfg(not(feature = "tensorrt"))]
        let tensorrt = false;

        Ok(device_names(cuda, tensorrt, self.gpu_ordinals))
    }

    fn read_model(&self, source: &ModelSource) -> Result<OnnxModel, InferError> {
        let bytes = source.read()?.into_owned();

        // Plain CPU session, only used to read the graph signature.
        let reader = OrtSession::builder()
            .and_then(|builder| builder.commit_from_memory(&bytes))
            .map_err(|e| InferError::ModelLoad(format!("{source}: {e}")))?;

        let info = ModelInfo {
            name: match source {
                ModelSource::File(path) => path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                ModelSource::Memory(_) => String::new(),
            },
            inputs: reader
                .inputs
                .iter()
                .map(|input| tensor_info(&input.name, &input.input_type))
                .collect(),
            outputs: reader
                .outputs
                .iter()
                .map(|output| tensor_info(&output.name, &output.output_type))
                .collect(),
        };
        if info.inputs.len() != 1 || info.outputs.len() != 1 {
            return Err(InferError::ModelLoad(format!(
                "style model must have one input and one output, found {} and {}",
                info.inputs.len(),
                info.outputs.len()
            )));
        }

        Ok(OnnxModel {
            bytes,
            info,
            reshaped: None,
        })
    }

    fn compile(
        &self,
        model: OnnxModel,
        target: &DeviceTarget,
        options: &CompileOptions,
    ) -> Result<Box<dyn Session>, InferError> {
        let shape = resolve_shape(model.info.input_shape()?, model.reshaped)?;
        if let Some(output) = model.info.outputs.first() {
            check_reshape(&output.shape, shape).map_err(|e| InferError::ShapeMismatch {
                expected: format!("output compatible with {shape:?}"),
                got: e.to_string(),
            })?;
        }

        let providers = provider_plan(target, options)?
            .iter()
            .map(dispatch)
            .collect::<Result<Vec<_>, _>>()?;

        let compile_err = |e: ort::Error| InferError::Compile(format!("{target}: {e}"));
        let mut builder = OrtSession::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_parallel_execution(false))
            .and_then(|b| b.with_execution_providers(providers))
            .map_err(compile_err)?;
        if let Some(threads) = options.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(compile_err)?;
        }
        let session = builder.commit_from_memory(&model.bytes).map_err(compile_err)?;

        let len = element_count(&shape)?;
        let mut session = OnnxSession {
            input_name: session.inputs[0].name.clone(),
            output_name: session.outputs[0].name.clone(),
            session,
            shape,
            input: vec![0.0; len],
            output: vec![0.0; len],
        };
        // Symbolic output dims are only known after a run. A graph whose output
        // does not match the input is rejected here rather than on the first frame.
        session
            .infer()
            .map_err(|e| InferError::Compile(format!("{target}: warm-up run failed: {e}")))?;
        log::info!("[onnx] session ready on {target} with input {shape:?}");
        Ok(Box::new(session))
    }
}

/// An ONNX graph plus the input shape requested for it.
pub struct OnnxModel {
    bytes: Vec<u8>,
    info: ModelInfo,
    reshaped: Option<[usize; 4]>,
}

impl Model for OnnxModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn reshape(&mut self, shape: [usize; 4]) -> Result<(), InferError> {
        check_reshape(self.info.input_shape()?, shape)?;
        self.reshaped = Some(shape);
        Ok(())
    }
}

pub struct OnnxSession {
    session: OrtSession,
    input_name: String,
    output_name: String,
    shape: [usize; 4],
    input: Vec<f32>,
    output: Vec<f32>,
}

impl Session for OnnxSession {
    fn input_shape(&self) -> [usize; 4] {
        self.shape
    }

    fn output_shape(&self) -> [usize; 4] {
        self.shape
    }

    fn input(&self) -> &[f32] {
        &self.input
    }

    fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    fn output(&self) -> &[f32] {
        &self.output
    }

    fn infer(&mut self) -> Result<(), InferError> {
        let [n, c, h, w] = self.shape;
        let view = ArrayView4::from_shape((n, c, h, w), &self.input)
            .map_err(|e| InferError::Backend(format!("input view: {e}")))?;
        let tensor = TensorRef::from_array_view(view)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| InferError::Backend(format!("inference failed: {e}")))?;

        let result = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        if result.len() != self.output.len() {
            return Err(InferError::ShapeMismatch {
                expected: format!("{:?}", self.shape),
                got: format!("{:?}", result.shape()),
            });
        }
        for (dst, src) in self.output.iter_mut().zip(result.iter()) {
            *dst = *src;
        }
        Ok(())
    }
}
