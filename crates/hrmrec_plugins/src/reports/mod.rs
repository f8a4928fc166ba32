//! CSV reports over the reconciled ledgers.

use rust_decimal::Decimal;

pub mod balances;
pub mod discrepancy;
pub mod finance;
pub mod headcount;
pub mod summary;

pub use balances::write_balances_csv;
pub use discrepancy::{DiscrepancyExport, DiscrepancyRow};
pub use finance::{FinanceReconciliation, FinanceRow};
pub use headcount::{Headcount, HeadcountRow};
pub use summary::MonthlySummary;

/// Two decimal places, halves rounded away from zero.
pub fn amount(value: Decimal) -> String {
    format!("{:.2}", crate::reconcile::round(value))
}

pub fn optional_amount(value: Option<Decimal>) -> String {
    value.map(amount).unwrap_or_default()
}
