use super::{amount, optional_amount};
use crate::errors::ReportError;
use crate::importers::{IssueReason, RowIssue};
use hrmrec_common::Period;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind};
use hrmrec_runtime::resolver::{EmployeeResolver, Resolution};
use hrmrec_runtime::source::{Column, ColumnSchema, RecordSource, Row, RowError, SchemaReader};
use rust_decimal::Decimal;
use std::io::Write;
use tracing::{info, warn};

const COLUMNS: &[Column] = &[
    Column::required("employee_name", &["name", "employee", "description"]),
    Column::required("balance", &["amount", "leave provision"]),
];

pub static FINANCE_LEDGER: ColumnSchema = ColumnSchema::new("finance ledger", COLUMNS);

#[derive(Debug, Clone, PartialEq)]
pub struct FinanceRow {
    pub employee: Employee,
    pub finance_balance: Decimal,
    pub vip_balance: Option<Decimal>,
    pub difference: Option<Decimal>,
}

/// Finance's leave ledger names people only as "Surname F" or
/// "Surname, Firstname". Rows are matched on surname and first initial and
/// compared with the VIP balance of the month.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceReconciliation {
    pub period: Period,
    pub rows: Vec<FinanceRow>,
    pub skipped: Vec<RowIssue>,
}

/// Splits a finance ledger name into surname and first initial.
pub fn surname_and_initial(raw: &str) -> Option<(String, char)> {
    if let Some((surname, rest)) = raw.split_once(',') {
        let initial = rest.trim().chars().next()?;
        let surname = surname.trim();
        return (!surname.is_empty()).then(|| (surname.to_string(), initial));
    }
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let (last, surname) = tokens.split_last()?;
    if surname.is_empty() {
        return None;
    }
    let initial = last.chars().next()?;
    Some((surname.join(" "), initial))
}

impl FinanceReconciliation {
    pub async fn build(ledger: &Ledger, source: &mut dyn RecordSource, period: Period) -> Result<Self, ReportError> {
        let resolver = EmployeeResolver::new(ledger.clone());
        let mut reader = SchemaReader::open(source, &FINANCE_LEDGER)?;
        let mut report = Self {
            period,
            rows: Vec::new(),
            skipped: Vec::new(),
        };

        while let Some(row) = reader.next_row() {
            let row = row?;
            match Self::match_row(ledger, &resolver, &row, period).await? {
                Ok(matched) => report.rows.push(matched),
                Err(reason) => {
                    warn!("finance line {} ({}): {}", row.line, row.summary(), reason);
                    report.skipped.push(RowIssue {
                        line: row.line,
                        identity: row.summary(),
                        reason,
                    });
                }
            }
        }

        info!(
            "finance reconciliation for {}: {} matched, {} skipped",
            period,
            report.rows.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn match_row(
        ledger: &Ledger,
        resolver: &EmployeeResolver,
        row: &Row,
        period: Period,
    ) -> Result<Result<FinanceRow, IssueReason>, ReportError> {
        let parsed = row.require("employee_name").and_then(|name| {
            let key = surname_and_initial(name)
                .ok_or_else(|| RowError::Invalid(format!("'{}' is not 'Surname F' or 'Surname, Firstname'", name)))?;
            Ok((key, row.decimal("balance")?))
        });
        let ((surname, initial), finance_balance) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return Ok(Err(IssueReason::Malformed(e.to_string()))),
        };

        let employee = match resolver.by_surname_initial(&surname, initial).await? {
            Resolution::Found(employee) => employee,
            Resolution::NotFound { attempted } => return Ok(Err(IssueReason::Unresolved(attempted))),
            Resolution::Ambiguous { attempted, candidates } => {
                return Ok(Err(IssueReason::Ambiguous { attempted, candidates }));
            }
        };

        let vip_balance = ledger
            .monthly_for(LedgerKind::Vip, &employee.id, period)
            .await?
            .map(|r| r.balance);
        Ok(Ok(FinanceRow {
            employee,
            finance_balance,
            difference: vip_balance.map(|vip| finance_balance - vip),
            vip_balance,
        }))
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["employee_number", "lastname", "firstname", "finance", "vip", "diff"])?;
        for row in &self.rows {
            csv.write_record([
                row.employee.employee_number.clone(),
                row.employee.lastname.clone(),
                row.employee.firstname.clone(),
                amount(row.finance_balance),
                optional_amount(row.vip_balance),
                optional_amount(row.difference),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}
