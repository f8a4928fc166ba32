pub mod sqlite;

pub use crate::datastore::{DataStore, MemoryDataStore};
pub use sqlite::SqliteDataStore;

/// Rejects anything but plain `[A-Za-z_][A-Za-z0-9_]*` names before they are
/// spliced into SQL.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(format!("Invalid identifier: '{}'", name))
    }
}
