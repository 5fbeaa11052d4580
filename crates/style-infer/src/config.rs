use crate::backend::CompileOptions;
use crate::codec::Normalization;
use crate::InferError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "STYLE_TRANSFER_CONFIG";

/// Host policy. Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Where the runtime keeps compiled artifacts between loads.
    pub cache_dir: PathBuf,
    /// Device class the compilation cache is enabled for.
    pub cache_device_class: String,
    /// Devices whose name contains this are never offered.
    pub excluded_device_class: String,
    pub normalization: Normalization,
    /// GPU ordinals offered per execution provider during enumeration.
    pub gpu_ordinals: usize,
    pub benchmark_iterations: usize,
    pub log_dir: Option<PathBuf>,
    pub intra_threads: Option<usize>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            cache_device_class: "TensorRT".to_string(),
            excluded_device_class: "GNA".to_string(),
            normalization: Normalization::IMAGENET,
            gpu_ordinals: 1,
            benchmark_iterations: 5,
            log_dir: None,
            intra_threads: None,
        }
    }
}

impl StyleConfig {
    pub fn from_json(text: &str) -> Result<Self, InferError> {
        let config: StyleConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| InferError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Load the file named by `STYLE_TRANSFER_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, InferError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::debug!("loading config from {:?}", path);
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), InferError> {
        self.normalization.validate()?;
        if self.benchmark_iterations == 0 {
            return Err(InferError::Config(
                "benchmark_iterations must be at least 1".to_string(),
            ));
        }
        if self.intra_threads == Some(0) {
            return Err(InferError::Config("intra_threads must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::latency_f32()
            .with_cache(self.cache_device_class.clone(), self.cache_dir.clone())
            .with_intra_threads(self.intra_threads)
    }
}
