use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Leave policy parameters. The defaults describe statutory accrual of 2.08 days
/// per month, where a difference of two months' accrual is excessive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeavePolicy {
    pub accrual_rate: Decimal,
    pub excessive_threshold: Decimal,
    pub annual_leave_type: String,
    pub ignored_statuses: Vec<String>,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            accrual_rate: dec!(2.08),
            excessive_threshold: dec!(4.16),
            annual_leave_type: "Annual Leave".to_string(),
            ignored_statuses: vec!["Cancelled".to_string(), "Rejected".to_string()],
        }
    }
}

impl LeavePolicy {
    pub fn from_json(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let policy: Self = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accrual_rate.is_sign_negative() {
            return Err(ConfigError::Invalid(format!(
                "accrual_rate must not be negative, got {}",
                self.accrual_rate
            )));
        }
        if self.excessive_threshold <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "excessive_threshold must be positive, got {}",
                self.excessive_threshold
            )));
        }
        if self.annual_leave_type.trim().is_empty() {
            return Err(ConfigError::Invalid("annual_leave_type must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn is_annual_leave(&self, leave_type: &str) -> bool {
        leave_type.trim().eq_ignore_ascii_case(self.annual_leave_type.trim())
    }

    pub fn is_ignored_status(&self, status: &str) -> bool {
        self.ignored_statuses
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(status.trim()))
    }
}
