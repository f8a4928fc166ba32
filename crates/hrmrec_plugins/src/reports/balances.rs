use super::amount;
use crate::errors::ReportError;
use crate::reconcile::CalculatedBalance;
use std::io::Write;

pub const HEADER: &[&str] = &[
    "employee_number",
    "lastname",
    "firstname",
    "balance_date",
    "opening",
    "months",
    "accrued",
    "taken",
    "balance",
    "vip",
    "diff",
];

/// Writes calculated balances, one row per employee with an opening balance.
pub fn write_balances_csv<W: Write>(balances: &[CalculatedBalance], writer: W) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for b in balances {
        csv.write_record([
            b.employee.employee_number.clone(),
            b.employee.lastname.clone(),
            b.employee.firstname.clone(),
            b.accrual.anchor.format("%Y-%m-%d").to_string(),
            amount(b.accrual.opening),
            b.accrual.months.to_string(),
            amount(b.accrual.accrued),
            amount(b.accrual.taken),
            amount(b.accrual.balance),
            amount(b.vip_balance),
            amount(b.difference),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
