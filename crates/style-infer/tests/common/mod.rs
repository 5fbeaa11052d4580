#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use style_infer::backend::{check_reshape, resolve_shape};
use style_infer::{
    Backend, CompileOptions, Device, DeviceTarget, InferError, Model, ModelInfo, ModelSource,
    Session, TensorInfo,
};

/// In-process backend whose "network" maps every tensor value through `transform`.
pub struct MockBackend {
    pub devices: Vec<Device>,
    pub declared: Vec<Option<usize>>,
    pub transform: fn(f32) -> f32,
    pub fail_enumerate: bool,
    pub fail_infer: Rc<Cell<bool>>,
    pub compiled: Rc<Cell<usize>>,
}

impl MockBackend {
    /// Identity network with fully dynamic spatial dimensions.
    pub fn identity() -> Self {
        Self {
            devices: vec![Device::cpu(), Device::new("GNA"), Device::with_ordinal("CUDA", 0)],
            declared: vec![Some(1), Some(3), None, None],
            transform: |v| v,
            fail_enumerate: false,
            fail_infer: Rc::new(Cell::new(false)),
            compiled: Rc::new(Cell::new(0)),
        }
    }

    /// Network whose input is fixed at `width` x `height`.
    pub fn fixed(width: usize, height: usize) -> Self {
        Self {
            declared: vec![Some(1), Some(3), Some(height), Some(width)],
            ..Self::identity()
        }
    }

    pub fn with_transform(mut self, transform: fn(f32) -> f32) -> Self {
        self.transform = transform;
        self
    }
}

pub struct MockModel {
    info: ModelInfo,
    reshaped: Option<[usize; 4]>,
}

impl Model for MockModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn reshape(&mut self, shape: [usize; 4]) -> Result<(), InferError> {
        check_reshape(self.info.input_shape()?, shape)?;
        self.reshaped = Some(shape);
        Ok(())
    }
}

impl Backend for MockBackend {
    type Model = MockModel;

    fn name(&self) -> &str {
        "mock"
    }

    fn available_devices(&self) -> Result<Vec<Device>, InferError> {
        if self.fail_enumerate {
            return Err(InferError::Backend("enumeration failed".to_string()));
        }
        Ok(self.devices.clone())
    }

    fn read_model(&self, source: &ModelSource) -> Result<MockModel, InferError> {
        let bytes = source.read()?;
        if &*bytes != b"style" {
            return Err(InferError::ModelLoad("not a style model".to_string()));
        }
        let tensor = TensorInfo {
            name: Some("image".to_string()),
            element_type: "Float32".to_string(),
            shape: self.declared.clone(),
        };
        Ok(MockModel {
            info: ModelInfo {
                name: "mock".to_string(),
                inputs: vec![tensor.clone()],
                outputs: vec![tensor],
            },
            reshaped: None,
        })
    }

    fn compile(
        &self,
        model: MockModel,
        target: &DeviceTarget,
        _options: &CompileOptions,
    ) -> Result<Box<dyn Session>, InferError> {
        for device in target.devices() {
            if !self.devices.contains(device) {
                return Err(InferError::UnsupportedDevice(device.name().to_string()));
            }
        }
        let shape = resolve_shape(model.info.input_shape()?, model.reshaped)?;
        let len = shape.iter().product();
        self.compiled.set(self.compiled.get() + 1);
        Ok(Box::new(MockSession {
            shape,
            input: vec![0.0; len],
            output: vec![0.0; len],
            transform: self.transform,
            fail_infer: self.fail_infer.clone(),
        }))
    }
}

pub struct MockSession {
    pub shape: [usize; 4],
    pub input: Vec<f32>,
    pub output: Vec<f32>,
    pub transform: fn(f32) -> f32,
    pub fail_infer: Rc<Cell<bool>>,
}

impl Session for MockSession {
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
        if self.fail_infer.get() {
            return Err(InferError::Backend("device fault".to_string()));
        }
        for (dst, src) in self.output.iter_mut().zip(&self.input) {
            *dst = (self.transform)(*src);
        }
        Ok(())
    }
}

pub fn style_model() -> ModelSource {
    ModelSource::Memory(b"style".to_vec())
}

/// Value the decoder produces for an identity network fed `byte` on channel `c`.
pub fn identity_byte(byte: u8, c: usize) -> u8 {
    let n = style_infer::Normalization::IMAGENET;
    style_infer::codec::decode_value(byte as f32 / 255.0, n.mean[c], n.std[c])
}

/// Scratch directory unique to one test.
pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("style-infer-{}-{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
