use crate::source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("DataStore Error: {0}")]
    DataStoreError(String),
    #[error("Duplicate Error: {0}")]
    Duplicate(String),
    #[error("Decode Error: {0}")]
    DecodeError(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl RuntimeError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RuntimeError::Duplicate(_))
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::DecodeError(err.to_string())
    }
}
