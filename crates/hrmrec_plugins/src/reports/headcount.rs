use crate::errors::ReportError;
use chrono::NaiveDate;
use hrmrec_common::Period;
use hrmrec_common::period::add_months;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::Employee;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadcountRow {
    pub month: Period,
    pub joined: usize,
    pub terminated: usize,
    pub active: usize,
}

/// Staff movement per calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headcount {
    pub total: usize,
    pub rows: Vec<HeadcountRow>,
}

impl Headcount {
    /// `months` consecutive months starting with the one containing `first`.
    /// A span running past the last representable date is an error.
    pub async fn build(ledger: &Ledger, first: NaiveDate, months: u32) -> Result<Self, ReportError> {
        let employees = ledger.employees().await?;
        let Some(span) = months.checked_sub(1) else {
            return Ok(Self {
                total: employees.len(),
                rows: Vec::new(),
            });
        };
        let last = add_months(first, i32::try_from(span).unwrap_or(i32::MAX))?;

        let mut rows = Vec::new();
        for month in Period::months_between(first, last)? {
            rows.push(HeadcountRow {
                month,
                joined: ledger.employees_joined_between(month.start, month.end).await?.len(),
                terminated: ledger
                    .employees_terminated_between(month.start, month.end)
                    .await?
                    .len(),
                active: active_employees(&employees, month.end).len(),
            });
        }
        Ok(Self {
            total: employees.len(),
            rows,
        })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["month", "joined", "terminated", "active"])?;
        for row in &self.rows {
            csv.write_record([
                row.month.start.format("%Y-%m").to_string(),
                row.joined.to_string(),
                row.terminated.to_string(),
                row.active.to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Employees on the books at `month_end`: joined by then and not terminated
/// before it.
pub fn active_employees(employees: &[Employee], month_end: NaiveDate) -> Vec<&Employee> {
    employees.iter().filter(|e| e.is_active_on(month_end)).collect()
}
