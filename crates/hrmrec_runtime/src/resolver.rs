//! Maps the partial identities found in import files onto canonical employees.

use crate::errors::RuntimeError;
use crate::ledger::Ledger;
use crate::models::Employee;
use hrmrec_common::NameParts;
use tracing::debug;

/// Outcome of an employee lookup. Misses are values, not errors: the caller
/// decides whether a row is skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Employee),
    NotFound { attempted: String },
    Ambiguous { attempted: String, candidates: Vec<String> },
}

impl Resolution {
    pub fn found(self) -> Option<Employee> {
        match self {
            Resolution::Found(employee) => Some(employee),
            _ => None,
        }
    }

    fn from_matches(attempted: String, mut matches: Vec<Employee>) -> Self {
        match matches.len() {
            0 => Resolution::NotFound { attempted },
            1 => Resolution::Found(matches.remove(0)),
            _ => Resolution::Ambiguous {
                attempted,
                candidates: matches.iter().map(|e| e.to_string()).collect(),
            },
        }
    }
}

#[derive(Clone)]
pub struct EmployeeResolver {
    ledger: Ledger,
}

impl EmployeeResolver {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Exact (lastname, firstname, middlename) first; then strippedname.
    pub async fn by_name(&self, name: &NameParts) -> Result<Resolution, RuntimeError> {
        let exact: Vec<Employee> = self
            .ledger
            .employees_by_name(&name.lastname, &name.firstname)
            .await?
            .into_iter()
            .filter(|e| e.middlename == name.middlename)
            .collect();
        if !exact.is_empty() {
            return Ok(Resolution::from_matches(name.display_name(), exact));
        }

        let stripped = self.ledger.employees_by_strippedname(&name.strippedname).await?;
        let resolution = Resolution::from_matches(name.display_name(), stripped);
        if let Resolution::NotFound { attempted } = &resolution {
            debug!(
                "no employee for '{}' (first={}, middle={:?}, last={}, stripped={})",
                attempted, name.firstname, name.middlename, name.lastname, name.strippedname
            );
        }
        Ok(resolution)
    }

    pub async fn by_number(&self, raw_number: &str) -> Result<Resolution, RuntimeError> {
        let attempted = format!("employee number {}", raw_number.trim());
        let Some(number) = Employee::canonical_number(raw_number) else {
            return Ok(Resolution::NotFound { attempted });
        };
        Ok(match self.ledger.employee_by_number(&number).await? {
            Some(employee) => Resolution::Found(employee),
            None => Resolution::NotFound { attempted },
        })
    }

    /// Loose lookup used for finance ledgers that only carry "Surname F":
    /// lastname contains `surname` and firstname starts with `initial`, both
    /// case-insensitive. More than one hit is ambiguous, never a guess.
    pub async fn by_surname_initial(&self, surname: &str, initial: char) -> Result<Resolution, RuntimeError> {
        let surname = surname.trim().to_lowercase();
        let initial = initial.to_lowercase().to_string();
        let attempted = format!("{} {}", surname, initial.to_uppercase());
        if surname.is_empty() {
            return Ok(Resolution::NotFound { attempted });
        }

        let matches: Vec<Employee> = self
            .ledger
            .employees()
            .await?
            .into_iter()
            .filter(|e| e.lastname.to_lowercase().contains(&surname))
            .filter(|e| e.firstname.to_lowercase().starts_with(&initial))
            .collect();
        Ok(Resolution::from_matches(attempted, matches))
    }
}
