pub mod errors;
pub mod importers;
pub mod reconcile;
pub mod reports;
pub mod roster;

pub use errors::{ImportError, ReportError};
