use super::{ImportStrategy, Merge, Upsert, WritePolicy};
use crate::errors::ImportError;
use async_trait::async_trait;
use hrmrec_common::{LeavePolicy, Period};
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind, MonthlyBalance};
use hrmrec_runtime::resolver::{EmployeeResolver, Resolution};
use hrmrec_runtime::source::{Column, ColumnSchema, Row, RowError};
use rust_decimal::Decimal;
use tracing::error;

const VIP_COLUMNS: &[Column] = &[
    Column::required("employee_number", &["emp no", "number", "employee no"]),
    Column::required("employee_name", &["name", "employee"]),
    Column::required("balance", &["leave balance", "closing balance"]),
];

const HRM_COLUMNS: &[Column] = &[
    Column::required("employee_number", &["emp no", "number", "employee no"]),
    Column::required("employee_name", &["name", "employee"]),
    Column::required("leave_type", &["type"]),
    Column::required("leave_date", &["date", "leave dates"]),
    Column::required("days", &["number of days", "duration"]),
    Column::required("status", &["leave status"]),
];

pub static VIP_MONTHLY_LEDGER: ColumnSchema = ColumnSchema::new("VIP monthly ledger", VIP_COLUMNS);
pub static HRM_LEAVE_LIST: ColumnSchema = ColumnSchema::new("HRM leave list", HRM_COLUMNS);

/// Monthly ledgers keyed by (employee, calendar month), shared by the VIP
/// balance export and the HRM annual-leave list.
pub struct MonthlyLedgerStrategy {
    kind: LedgerKind,
    ledger: Ledger,
    resolver: EmployeeResolver,
    period: Period,
    policy: LeavePolicy,
}

impl MonthlyLedgerStrategy {
    /// VIP closing balances. Every contribution is mirrored into the usage
    /// record of the same employee and month.
    pub fn vip(ledger: Ledger, period: Period) -> Self {
        Self::new(LedgerKind::Vip, ledger, period, LeavePolicy::default())
    }

    /// Annual leave taken per month, from the HRM leave list.
    pub fn hrm(ledger: Ledger, period: Period, policy: LeavePolicy) -> Self {
        Self::new(LedgerKind::Hrm, ledger, period, policy)
    }

    fn new(kind: LedgerKind, ledger: Ledger, period: Period, policy: LeavePolicy) -> Self {
        Self {
            kind,
            resolver: EmployeeResolver::new(ledger.clone()),
            ledger,
            period,
            policy,
        }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    /// Keeps the usage ledger's view of the external balance current.
    async fn mirror_into_usage(&self, employee: &Employee, period: Period, amount: Decimal, merge: Merge) -> Result<(), ImportError> {
        let Some(mut usage) = self.ledger.usage_for(&employee.id, period).await? else {
            return Ok(());
        };
        // A rejecting policy only gets here for a freshly created record.
        match merge {
            Merge::Add | Merge::Reject => usage.vip_balance += amount,
            Merge::Overwrite => usage.vip_balance = amount,
        }
        self.ledger.save_usage(usage).await?;
        Ok(())
    }

    /// Puts a monthly record back the way it was before a row that failed
    /// half way through.
    async fn restore(&self, previous: Option<MonthlyBalance>, saved: &MonthlyBalance) {
        let restored = match previous {
            Some(previous) => self.ledger.save_monthly(self.kind, previous).await.map(|_| ()),
            None => self.ledger.delete_monthly(self.kind, &saved.id).await,
        };
        if let Err(e) = restored {
            error!(
                "{}: could not restore the record of {} for {}: {}",
                self.name(),
                saved.employee_number,
                saved.period(),
                e
            );
        }
    }
}

#[async_trait]
impl ImportStrategy for MonthlyLedgerStrategy {
    type Entry = MonthlyBalance;

    fn name(&self) -> &'static str {
        match self.kind {
            LedgerKind::Vip => "VIP monthly",
            LedgerKind::Hrm => "HRM monthly",
        }
    }

    fn schema(&self) -> &'static ColumnSchema {
        match self.kind {
            LedgerKind::Vip => &VIP_MONTHLY_LEDGER,
            LedgerKind::Hrm => &HRM_LEAVE_LIST,
        }
    }

    fn default_policy(&self) -> WritePolicy {
        WritePolicy::Accumulate
    }

    fn accepts(&self, row: &Row) -> Result<(), String> {
        if self.kind == LedgerKind::Vip {
            return Ok(());
        }
        let leave_type = row.text("leave_type").unwrap_or_default();
        if !self.policy.is_annual_leave(leave_type) {
            return Err(format!("leave type '{}'", leave_type));
        }
        let status = row.text("status").unwrap_or_default();
        if self.policy.is_ignored_status(status) {
            return Err(format!("status '{}'", status));
        }
        Ok(())
    }

    fn compute_period_key(&self, row: &Row) -> Result<Period, RowError> {
        if self.kind == LedgerKind::Hrm {
            let leave_date = row.date("leave_date")?;
            if !self.period.contains(leave_date) {
                return Err(RowError::Invalid(format!(
                    "leave date {} falls outside {}",
                    leave_date, self.period
                )));
            }
        }
        Ok(self.period)
    }

    fn read_entry(&self, row: &Row, period: Period) -> Result<MonthlyBalance, RowError> {
        let balance = match self.kind {
            LedgerKind::Vip => row.decimal("balance")?,
            LedgerKind::Hrm => row.decimal("days")?,
        };
        Ok(MonthlyBalance {
            id: String::new(),
            employee_id: String::new(),
            employee_number: row.employee_number("employee_number")?,
            fullname: row.text("employee_name").unwrap_or_default().to_string(),
            period_start: period.start,
            period_end: period.end,
            balance,
        })
    }

    async fn resolve_employee(&self, row: &Row) -> Result<Resolution, ImportError> {
        Ok(self.resolver.by_number(row.require("employee_number")?).await?)
    }

    async fn upsert_balance(
        &self,
        employee: &Employee,
        mut entry: MonthlyBalance,
        policy: &WritePolicy,
    ) -> Result<Upsert, ImportError> {
        entry.employee_id = employee.id.clone();
        entry.employee_number = employee.employee_number.clone();
        if entry.fullname.is_empty() {
            entry.fullname = employee.name_parts().display_name();
        }
        let period = entry.period();
        let amount = entry.balance;
        let merge = policy.merge();

        let previous = self.ledger.monthly_for(self.kind, &employee.id, period).await?;
        let (outcome, saved) = match previous.clone() {
            None => (Upsert::Created, self.ledger.save_monthly(self.kind, entry).await?),
            Some(mut existing) => match merge {
                Merge::Add => {
                    existing.balance += amount;
                    (Upsert::Updated, self.ledger.save_monthly(self.kind, existing).await?)
                }
                Merge::Overwrite => {
                    entry.id = existing.id;
                    (Upsert::Updated, self.ledger.save_monthly(self.kind, entry).await?)
                }
                Merge::Reject => {
                    return Ok(Upsert::Duplicate(format!(
                        "{} already has a {} record for {}",
                        employee,
                        self.name(),
                        period
                    )));
                }
            },
        };

        if self.kind == LedgerKind::Vip
            && let Err(e) = self.mirror_into_usage(employee, period, amount, merge).await
        {
            self.restore(previous, &saved).await;
            return Err(e);
        }
        Ok(outcome)
    }

    async fn clear_period(&self, period: Period) -> Result<u64, ImportError> {
        let removed = self.ledger.clear_monthly(self.kind, period).await?;
        if self.kind == LedgerKind::Vip {
            // The mirrored balances go with the records they came from.
            for mut usage in self.ledger.usage_in(period).await? {
                if !usage.vip_balance.is_zero() {
                    usage.vip_balance = Decimal::ZERO;
                    self.ledger.save_usage(usage).await?;
                }
            }
        }
        Ok(removed)
    }

    async fn records_in_ledger(&self) -> Result<i64, ImportError> {
        Ok(self.ledger.count(self.kind.table()).await?)
    }
}
