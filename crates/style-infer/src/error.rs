use std::fmt;
use style_base::TensorError;
use style_image::ImageError;

#[derive(Debug)]
pub enum InferError {
    /// The model could not be read or parsed.
    ModelLoad(String),
    /// The model refused the requested input shape.
    Reshape(String),
    /// The model could not be compiled for the device target.
    Compile(String),
    UnsupportedDevice(String),
    DeviceIndex { index: usize, count: usize },
    InvalidDimensions { width: usize, height: usize },
    ShapeMismatch { expected: String, got: String },
    FrameSize { expected: usize, got: usize },
    NoSession,
    Backend(String),
    Config(String),
    Io(String),
    Image(ImageError),
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            InferError::Reshape(msg) => write!(f, "reshape error: {msg}"),
            InferError::Compile(msg) => write!(f, "compile error: {msg}"),
            InferError::UnsupportedDevice(device) => write!(f, "unsupported device: {device}"),
            InferError::DeviceIndex { index, count } => {
                write!(f, "device index {index} out of range ({count} devices)")
            }
            InferError::InvalidDimensions { width, height } => {
                write!(f, "invalid frame dimensions {width}x{height}")
            }
            InferError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {expected}, got {got}")
            }
            InferError::FrameSize { expected, got } => {
                write!(f, "frame size mismatch: expected {expected} elements, got {got}")
            }
            InferError::NoSession => write!(f, "no model loaded"),
            InferError::Backend(msg) => write!(f, "backend error: {msg}"),
            InferError::Config(msg) => write!(f, "config error: {msg}"),
            InferError::Io(msg) => write!(f, "io error: {msg}"),
            InferError::Image(err) => write!(f, "image error: {err}"),
        }
    }
}

impl std::error::Error for InferError {}

impl From<std::io::Error> for InferError {
    fn from(err: std::io::Error) -> Self {
        InferError::Io(err.to_string())
    }
}

impl From<ort::Error> for InferError {
    fn from(err: ort::Error) -> Self {
        InferError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for InferError {
    fn from(err: serde_json::Error) -> Self {
        InferError::Config(err.to_string())
    }
}

impl From<ImageError> for InferError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Layout { expected, got } => InferError::FrameSize { expected, got },
            other => InferError::Image(other),
        }
    }
}

impl From<TensorError> for InferError {
    fn from(err: TensorError) -> Self {
        InferError::ShapeMismatch {
            expected: "addressable tensor shape".to_string(),
            got: err.to_string(),
        }
    }
}
