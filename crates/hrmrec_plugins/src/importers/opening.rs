use super::{ImportStrategy, Merge, Upsert, WritePolicy};
use crate::errors::ImportError;
use async_trait::async_trait;
use chrono::NaiveDate;
use hrmrec_common::{NameParts, Period};
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, OPENING_BALANCE, OpeningBalance};
use hrmrec_runtime::resolver::{EmployeeResolver, Resolution};
use hrmrec_runtime::source::{Column, ColumnSchema, Row, RowError};
use tracing::{info, warn};

const COLUMNS: &[Column] = &[
    Column::required("employee_number", &["emp no", "number", "employee no"]),
    Column::required("lastname", &["surname", "last name"]),
    Column::required("firstname", &["first name", "first names"]),
    Column::optional("joined", &["joined date", "date joined", "engagement date"]),
    Column::required("balance", &["opening balance", "leave balance"]),
];

pub static OPENING_BALANCES: ColumnSchema = ColumnSchema::new("opening balances", COLUMNS);

/// Opening balances observed on `balance_date`, one per employee. An employee
/// number missing from the roster is added as a manually added employee so the
/// balance is not lost.
pub struct OpeningBalanceStrategy {
    ledger: Ledger,
    resolver: EmployeeResolver,
    balance_date: NaiveDate,
}

impl OpeningBalanceStrategy {
    pub fn new(ledger: Ledger, balance_date: NaiveDate) -> Self {
        Self {
            resolver: EmployeeResolver::new(ledger.clone()),
            ledger,
            balance_date,
        }
    }

    async fn synthesize(&self, row: &Row) -> Result<Employee, ImportError> {
        let number = row.employee_number("employee_number")?;
        let name = NameParts::new(row.require("firstname")?, None, row.require("lastname")?);
        let joined = row.optional_date("joined")?.unwrap_or(self.balance_date);

        let mut employee = Employee::new(&number, name, joined);
        employee.manually_added = true;
        let employee = self.ledger.create_employee(employee).await?;
        info!("added {} from the opening balances", employee);
        Ok(employee)
    }
}

#[async_trait]
impl ImportStrategy for OpeningBalanceStrategy {
    type Entry = OpeningBalance;

    fn name(&self) -> &'static str {
        "opening balances"
    }

    fn schema(&self) -> &'static ColumnSchema {
        &OPENING_BALANCES
    }

    fn default_policy(&self) -> WritePolicy {
        WritePolicy::UpsertByKey
    }

    fn compute_period_key(&self, _row: &Row) -> Result<Period, RowError> {
        Ok(Period::new(self.balance_date, self.balance_date))
    }

    fn read_entry(&self, row: &Row, period: Period) -> Result<OpeningBalance, RowError> {
        // Fields needed to synthesize an employee are checked here too, so a
        // bad row never leaves an employee without its balance.
        row.employee_number("employee_number")?;
        row.require("lastname")?;
        row.require("firstname")?;
        row.optional_date("joined")?;
        Ok(OpeningBalance {
            id: String::new(),
            employee_id: String::new(),
            balance: row.decimal("balance")?,
            balance_date: period.start,
        })
    }

    async fn resolve_employee(&self, row: &Row) -> Result<Resolution, ImportError> {
        match self.resolver.by_number(row.require("employee_number")?).await? {
            Resolution::Found(employee) => {
                if let Some(joined) = row.optional_date("joined")?
                    && joined != employee.joined
                {
                    warn!(
                        "{}: opening balances give joined date {}, roster has {}",
                        employee, joined, employee.joined
                    );
                }
                Ok(Resolution::Found(employee))
            }
            Resolution::NotFound { .. } => Ok(Resolution::Found(self.synthesize(row).await?)),
            ambiguous => Ok(ambiguous),
        }
    }

    async fn upsert_balance(
        &self,
        employee: &Employee,
        mut entry: OpeningBalance,
        policy: &WritePolicy,
    ) -> Result<Upsert, ImportError> {
        entry.employee_id = employee.id.clone();
        let Some(mut existing) = self.ledger.opening_for(&employee.id).await? else {
            self.ledger.save_opening(entry).await?;
            return Ok(Upsert::Created);
        };

        match policy.merge() {
            Merge::Add => existing.balance += entry.balance,
            Merge::Overwrite => {
                existing.balance = entry.balance;
                existing.balance_date = entry.balance_date;
            }
            Merge::Reject => {
                return Ok(Upsert::Duplicate(format!(
                    "{} already has an opening balance of {} on {}",
                    employee, existing.balance, existing.balance_date
                )));
            }
        }
        self.ledger.save_opening(existing).await?;
        Ok(Upsert::Updated)
    }

    async fn clear_period(&self, period: Period) -> Result<u64, ImportError> {
        Ok(self.ledger.clear_openings(period).await?)
    }

    async fn records_in_ledger(&self) -> Result<i64, ImportError> {
        Ok(self.ledger.count(OPENING_BALANCE).await?)
    }
}
