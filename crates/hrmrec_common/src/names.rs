//! Canonical name parsing for the free-text "Firstname Middlename Lastname"
//! strings found in the HR and payroll exports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name '{0}' has fewer than two usable tokens")]
    TooFewTokens(String),
}

/// A name split into its canonical parts.
///
/// `strippedname` is the concatenation of the parts with all whitespace removed.
/// It is the fallback join key when two files disagree on how a name is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub firstname: String,
    pub middlename: Option<String>,
    pub lastname: String,
    pub strippedname: String,
}

impl NameParts {
    pub fn new(firstname: &str, middlename: Option<&str>, lastname: &str) -> Self {
        let middlename = middlename.map(str::trim).filter(|m| !m.is_empty());
        Self {
            firstname: firstname.trim().to_string(),
            middlename: middlename.map(str::to_string),
            lastname: lastname.trim().to_string(),
            strippedname: stripped_name(firstname, middlename, lastname),
        }
    }

    pub fn display_name(&self) -> String {
        match &self.middlename {
            Some(middle) => format!("{} {} {}", self.firstname, middle, self.lastname),
            None => format!("{} {}", self.firstname, self.lastname),
        }
    }
}

pub fn stripped_name(firstname: &str, middlename: Option<&str>, lastname: &str) -> String {
    [firstname, middlename.unwrap_or(""), lastname]
        .concat()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

// Export tools append tags such as "(Past Employee)" to terminated staff.
fn is_artifact(token: &str) -> bool {
    token.starts_with('(') || token.ends_with(')')
}

/// Builds [`NameParts`] from ordered name tokens.
///
/// Empty tokens and parenthetical tags are discarded. While more than three
/// tokens remain the second one is dropped, since a misplaced title or
/// honorific usually sits there. Three tokens are first/middle/last, two are
/// first/last.
pub fn normalize_tokens<I, S>(tokens: I) -> Result<NameParts, NameError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values: Vec<String> = tokens
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && !is_artifact(t))
        .collect();

    while values.len() > 3 {
        values.remove(1);
    }

    match values.as_slice() {
        [first, middle, last] => Ok(NameParts::new(first, Some(middle), last)),
        [first, last] => Ok(NameParts::new(first, None, last)),
        _ => Err(NameError::TooFewTokens(values.join(" "))),
    }
}

pub fn normalize_name(raw: &str) -> Result<NameParts, NameError> {
    normalize_tokens(raw.split_whitespace()).map_err(|e| match e {
        NameError::TooFewTokens(_) => NameError::TooFewTokens(raw.trim().to_string()),
    })
}
