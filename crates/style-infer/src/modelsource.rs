use crate::InferError;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

pub enum ModelSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl ModelSource {
    /// Model bytes. An unreadable file is a `ModelLoad` error.
    pub fn read(&self) -> Result<Cow<'_, [u8]>, InferError> {
        match self {
            ModelSource::File(path) => std::fs::read(path).map(Cow::Owned).map_err(|e| {
                InferError::ModelLoad(format!("failed to read {}: {}", path.display(), e))
            }),
            ModelSource::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::File(path) => write!(f, "{}", path.display()),
            ModelSource::Memory(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        ModelSource::File(path)
    }
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        ModelSource::File(path.to_path_buf())
    }
}
