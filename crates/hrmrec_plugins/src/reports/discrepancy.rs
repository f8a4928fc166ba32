use super::{amount, optional_amount};
use crate::errors::ReportError;
use crate::reconcile::Discrepancy;
use hrmrec_common::{LeavePolicy, Period};
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind, UsageBalance};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

pub const HEADER: &[&str] = &[
    "employee_number",
    "lastname",
    "firstname",
    "location",
    "subunit",
    "period",
    "entitlements",
    "pending_approval",
    "scheduled",
    "taken",
    "available_balance",
    "total_overdrawn",
    "hrm",
    "vip",
    "diff",
    "gr_in_hrm",
    "gr_in_vip",
    "excessive",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepancyRow {
    pub employee: Employee,
    pub usage: UsageBalance,
    pub vip: Decimal,
    pub discrepancy: Discrepancy,
}

impl DiscrepancyRow {
    fn record(&self) -> Vec<String> {
        let e = &self.employee;
        let u = &self.usage;
        let d = &self.discrepancy;
        vec![
            e.employee_number.clone(),
            e.lastname.clone(),
            e.firstname.clone(),
            e.location.clone().unwrap_or_default(),
            e.subunit.clone().unwrap_or_default(),
            u.period().to_string(),
            amount(u.entitlements),
            amount(u.pending_approval),
            amount(u.scheduled),
            amount(u.taken),
            amount(u.available_balance),
            amount(u.total_overdrawn),
            amount(u.hrm_balance),
            amount(self.vip),
            amount(d.diff),
            optional_amount(d.gross_in_hrm),
            optional_amount(d.gross_in_vip),
            optional_amount(d.excessive),
        ]
    }
}

/// HRM usage against VIP balances for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepancyExport {
    pub period: Period,
    pub rows: Vec<DiscrepancyRow>,
    /// Running total of `hrm - vip` over every row.
    pub total: Decimal,
}

impl DiscrepancyExport {
    /// Employees with both a usage record and a VIP balance for `period`,
    /// ordered by name. Anyone missing either side has nothing to compare.
    pub async fn build(ledger: &Ledger, policy: &LeavePolicy, period: Period) -> Result<Self, ReportError> {
        let mut usage: HashMap<String, UsageBalance> = ledger
            .usage_in(period)
            .await?
            .into_iter()
            .map(|u| (u.employee_id.clone(), u))
            .collect();
        let vip: HashMap<String, Decimal> = ledger
            .monthly_in(LedgerKind::Vip, period)
            .await?
            .into_iter()
            .map(|r| (r.employee_id, r.balance))
            .collect();

        let mut rows = Vec::new();
        let mut total = Decimal::ZERO;
        for employee in ledger.employees().await? {
            let (Some(usage), Some(&vip)) = (usage.remove(&employee.id), vip.get(&employee.id)) else {
                debug!("{}: no usage/VIP pair for {}", employee, period);
                continue;
            };
            let discrepancy = Discrepancy::classify(usage.hrm_balance, vip, policy.excessive_threshold);
            total += discrepancy.diff;
            rows.push(DiscrepancyRow {
                employee,
                usage,
                vip,
                discrepancy,
            });
        }

        info!("discrepancy export for {}: {} rows, total={}", period, rows.len(), total);
        Ok(Self { period, rows, total })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(HEADER)?;
        for row in &self.rows {
            csv.write_record(row.record())?;
        }
        csv.flush()?;
        Ok(())
    }
}
