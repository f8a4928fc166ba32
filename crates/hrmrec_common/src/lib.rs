pub mod names;
pub mod period;
pub mod policy;

pub use names::{NameError, NameParts, normalize_name, normalize_tokens};
pub use period::{Period, PeriodError};
pub use policy::{ConfigError, LeavePolicy};
