use hrmrec_common::PeriodError;
use hrmrec_runtime::errors::RuntimeError;
use hrmrec_runtime::source::{RowError, SourceError};
use thiserror::Error;

/// Import failures. [`ImportError::Row`] only skips the offending row; every
/// other variant stops the run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Row(#[from] RowError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ImportError {
    pub fn is_row_level(&self) -> bool {
        matches!(self, ImportError::Row(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ImportError::Runtime(e) if e.is_duplicate())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
