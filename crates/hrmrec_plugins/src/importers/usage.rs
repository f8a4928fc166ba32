use super::{ImportStrategy, Merge, Upsert, WritePolicy};
use crate::errors::ImportError;
use async_trait::async_trait;
use hrmrec_common::period::parse_period_range;
use hrmrec_common::{Period, normalize_name};
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind, USAGE_BALANCE, UsageBalance};
use hrmrec_runtime::resolver::{EmployeeResolver, Resolution};
use hrmrec_runtime::source::{Column, ColumnSchema, Row, RowError};
use rust_decimal::Decimal;

const COLUMNS: &[Column] = &[
    Column::required("employee_name", &["employee", "name", "employee full name"]),
    Column::required("leave_period", &["period"]),
    Column::required("entitlements", &["entitlements (days)"]),
    Column::required("pending_approval", &["pending approval (days)"]),
    Column::required("scheduled", &["scheduled (days)"]),
    Column::required("taken", &["taken (days)"]),
    Column::required("available_balance", &["available balance (days)"]),
    Column::required("total_overdrawn", &["overdrawn"]),
];

pub static USAGE_REPORT: ColumnSchema = ColumnSchema::new("usage report", COLUMNS);

/// The HRM leave-entitlement usage report, one row per employee, loaded under
/// the month it was pulled for.
pub struct UsageReportStrategy {
    ledger: Ledger,
    resolver: EmployeeResolver,
    period: Period,
}

impl UsageReportStrategy {
    pub fn new(ledger: Ledger, period: Period) -> Self {
        Self {
            resolver: EmployeeResolver::new(ledger.clone()),
            ledger,
            period,
        }
    }

    fn add(existing: &mut UsageBalance, entry: &UsageBalance) {
        existing.entitlements += entry.entitlements;
        existing.pending_approval += entry.pending_approval;
        existing.scheduled += entry.scheduled;
        existing.taken += entry.taken;
        existing.available_balance += entry.available_balance;
        existing.total_overdrawn += entry.total_overdrawn;
        existing.hrm_balance = UsageBalance::compute_hrm_balance(
            existing.entitlements,
            existing.pending_approval,
            existing.scheduled,
            existing.taken,
        );
    }
}

#[async_trait]
impl ImportStrategy for UsageReportStrategy {
    type Entry = UsageBalance;

    fn name(&self) -> &'static str {
        "usage report"
    }

    fn schema(&self) -> &'static ColumnSchema {
        &USAGE_REPORT
    }

    fn default_policy(&self) -> WritePolicy {
        WritePolicy::ReplacePeriod(self.period)
    }

    fn compute_period_key(&self, _row: &Row) -> Result<Period, RowError> {
        Ok(self.period)
    }

    fn read_entry(&self, row: &Row, period: Period) -> Result<UsageBalance, RowError> {
        let report = parse_period_range(row.require("leave_period")?).map_err(|source| RowError::InvalidDate {
            column: "leave_period",
            source,
        })?;
        let entitlements = row.decimal("entitlements")?;
        let pending_approval = row.decimal("pending_approval")?;
        let scheduled = row.decimal("scheduled")?;
        let taken = row.decimal("taken")?;

        Ok(UsageBalance {
            id: String::new(),
            employee_id: String::new(),
            fullname: row.require("employee_name")?.to_string(),
            period_start: period.start,
            period_end: period.end,
            report_start: report.start,
            report_end: report.end,
            entitlements,
            pending_approval,
            scheduled,
            taken,
            available_balance: row.decimal("available_balance")?,
            total_overdrawn: row.decimal("total_overdrawn")?,
            hrm_balance: UsageBalance::compute_hrm_balance(entitlements, pending_approval, scheduled, taken),
            vip_balance: Decimal::ZERO,
        })
    }

    async fn resolve_employee(&self, row: &Row) -> Result<Resolution, ImportError> {
        let name = normalize_name(row.require("employee_name")?).map_err(RowError::from)?;
        Ok(self.resolver.by_name(&name).await?)
    }

    async fn upsert_balance(
        &self,
        employee: &Employee,
        mut entry: UsageBalance,
        policy: &WritePolicy,
    ) -> Result<Upsert, ImportError> {
        entry.employee_id = employee.id.clone();
        let Some(mut existing) = self.ledger.usage_for(&employee.id, entry.period()).await? else {
            // The VIP file may have been loaded first.
            if let Some(vip) = self
                .ledger
                .monthly_for(LedgerKind::Vip, &employee.id, entry.period())
                .await?
            {
                entry.vip_balance = vip.balance;
            }
            self.ledger.save_usage(entry).await?;
            return Ok(Upsert::Created);
        };

        match policy.merge() {
            Merge::Add => Self::add(&mut existing, &entry),
            Merge::Overwrite => {
                entry.id = existing.id;
                entry.vip_balance = existing.vip_balance;
                existing = entry;
            }
            Merge::Reject => {
                return Ok(Upsert::Duplicate(format!(
                    "{} already has a usage record for {}",
                    employee,
                    existing.period()
                )));
            }
        }
        self.ledger.save_usage(existing).await?;
        Ok(Upsert::Updated)
    }

    async fn clear_period(&self, period: Period) -> Result<u64, ImportError> {
        Ok(self.ledger.clear_usage(period).await?)
    }

    async fn records_in_ledger(&self) -> Result<i64, ImportError> {
        Ok(self.ledger.count(USAGE_BALANCE).await?)
    }
}
