//! Employee roster loader. The roster is the canonical source of employees;
//! every balance import resolves against what it loads.

use crate::errors::ImportError;
use crate::importers::{ImportReport, IssueReason, RowIssue};
use hrmrec_common::normalize_tokens;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{EMPLOYEE, Employee};
use hrmrec_runtime::source::{Column, ColumnSchema, RecordSource, Row, RowError, SchemaReader};
use tracing::{info, warn};

const COLUMNS: &[Column] = &[
    Column::required("employee_number", &["employee id", "emp no", "id"]),
    Column::required("lastname", &["last name", "surname"]),
    Column::required("firstname", &["first name", "first names"]),
    Column::optional("middlename", &["middle name"]),
    Column::optional("location", &[]),
    Column::optional("subunit", &["sub unit", "department"]),
    Column::optional("job_title", &["job title", "title"]),
    Column::optional("employment_status", &["employment status", "status"]),
    Column::required("joined", &["joined date", "date joined"]),
    Column::optional("termination_date", &["terminated", "termination date"]),
];

pub static ROSTER: ColumnSchema = ColumnSchema::new("employee roster", COLUMNS);

pub struct RosterLoader {
    ledger: Ledger,
}

impl RosterLoader {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Creates one employee per roster row. With `reset`, every ledger is
    /// emptied first; balances cannot outlive the employees they belong to.
    pub async fn load(&self, source: &mut dyn RecordSource, reset: bool) -> Result<ImportReport, ImportError> {
        let mut reader = SchemaReader::open(source, &ROSTER)?;
        if reset {
            let removed = self.ledger.reset().await?;
            info!("roster reset removed {} records", removed);
        }

        let mut report = ImportReport {
            strategy: "employee roster",
            ..Default::default()
        };
        while let Some(row) = reader.next_row() {
            let row = row?;
            report.rows_read += 1;

            let reason = match Self::parse(&row) {
                Err(e) => Some(IssueReason::Malformed(e.to_string())),
                Ok(employee) => match self.ledger.create_employee(employee).await {
                    Ok(_) => None,
                    Err(e) if e.is_duplicate() => Some(IssueReason::Duplicate(e.to_string())),
                    Err(e) => return Err(e.into()),
                },
            };
            match reason {
                None => report.imported += 1,
                Some(reason) => {
                    warn!("roster line {} ({}): {}", row.line, row.summary(), reason);
                    report.skipped.push(RowIssue {
                        line: row.line,
                        identity: row.summary(),
                        reason,
                    });
                }
            }
        }

        report.records_in_ledger = self.ledger.count(EMPLOYEE).await?;
        info!("{}", report);
        Ok(report)
    }

    fn parse(row: &Row) -> Result<Employee, RowError> {
        let number = row.employee_number("employee_number")?;
        // A lastname column sometimes carries the middle name as well.
        let tokens = [
            row.require("firstname")?,
            row.text("middlename").unwrap_or_default(),
            row.require("lastname")?,
        ];
        let name = normalize_tokens(tokens.iter().flat_map(|part| part.split_whitespace()))?;

        let mut employee = Employee::new(&number, name, row.date("joined")?);
        employee.termination_date = row.optional_date("termination_date")?;
        employee.location = row.text("location").map(str::to_string);
        employee.subunit = row.text("subunit").map(str::to_string);
        employee.job_title = row.text("job_title").map(str::to_string);
        employee.employment_status = row.text("employment_status").map(str::to_string);
        Ok(employee)
    }
}
