use super::{amount, optional_amount};
use crate::errors::ReportError;
use crate::reconcile::Reconciler;
use chrono::NaiveDate;
use hrmrec_common::Period;
use hrmrec_runtime::models::LedgerKind;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;
use tracing::info;

/// One row per employee, one `H`/`V` column pair per month: HRM leave taken and
/// the VIP balance. `total` is the balance carried from the opening balance to
/// the end of the last month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub months: Vec<Period>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MonthlySummary {
    pub async fn build(reconciler: &Reconciler, first: NaiveDate, last: NaiveDate) -> Result<Self, ReportError> {
        let months = Period::months_between(first, last)?;
        let Some(reference) = months.last().map(|p| p.end) else {
            return Ok(Self::empty());
        };

        let mut header: Vec<String> = ["employee_number", "lastname", "firstname", "termination_date", "opening"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        for month in &months {
            for kind in [LedgerKind::Hrm, LedgerKind::Vip] {
                header.push(format!("{}{}", kind.prefix(), month.label()));
            }
        }
        header.push("total".to_string());

        let ledger = reconciler.ledger();
        let mut rows = Vec::new();
        for employee in ledger.employees().await? {
            let opening = ledger.opening_for(&employee.id).await?;
            let mut row = vec![
                employee.employee_number.clone(),
                employee.lastname.clone(),
                employee.firstname.clone(),
                employee
                    .termination_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                optional_amount(opening.as_ref().map(|o| o.balance)),
            ];

            let mut by_month: HashMap<(LedgerKind, Period), Decimal> = HashMap::new();
            for kind in [LedgerKind::Hrm, LedgerKind::Vip] {
                for record in ledger.monthly_history(kind, &employee.id).await? {
                    by_month.insert((kind, record.period()), record.balance);
                }
            }
            for month in &months {
                for kind in [LedgerKind::Hrm, LedgerKind::Vip] {
                    row.push(optional_amount(by_month.get(&(kind, *month)).copied()));
                }
            }

            let total = reconciler.balance_from_opening(&employee, reference).await?;
            row.push(total.map(|a| amount(a.balance)).unwrap_or_default());
            rows.push(row);
        }

        info!("monthly summary: {} employees over {} months", rows.len(), months.len());
        Ok(Self { months, header, rows })
    }

    fn empty() -> Self {
        Self {
            months: Vec::new(),
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.header)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }
}
