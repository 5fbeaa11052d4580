//! Style-transfer inference host.
//!
//! Enumerates compute devices, prepares a style model for one of them at a
//! requested frame size and pushes caller-owned frames through it in place.
//! `StyleContext` ties those steps together behind a small stateful API.

pub mod backend;
pub mod backends;
pub mod codec;
pub mod config;
pub mod context;
pub mod device;
pub mod driver;
pub mod error;
pub mod modelsource;
pub mod prepare;
pub mod session;

pub use backend::{Backend, CompileOptions, Model, ModelInfo, TensorInfo};
pub use codec::Normalization;
pub use config::StyleConfig;
pub use context::{StyleContext, load_status_code};
pub use device::{Device, DeviceList, DeviceTarget};
pub use driver::{BenchmarkReport, FrameTiming, benchmark, run_on_frame};
pub use error::InferError;
pub use modelsource::ModelSource;
pub use prepare::{LoadStatus, Prepared, prepare_session};
pub use session::{Session, StyleSession};
pub use style_image::PixelFormat;
