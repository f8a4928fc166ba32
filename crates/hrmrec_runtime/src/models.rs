use chrono::NaiveDate;
use hrmrec_common::{NameParts, Period};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EMPLOYEE: &str = "employee";
pub const USAGE_BALANCE: &str = "usage_balance";
pub const VIP_MONTHLY: &str = "vip_monthly";
pub const HRM_MONTHLY: &str = "hrm_monthly";
pub const OPENING_BALANCE: &str = "opening_balance";

pub const ALL_ENTITIES: &[&str] = &[USAGE_BALANCE, VIP_MONTHLY, HRM_MONTHLY, OPENING_BALANCE, EMPLOYEE];

/// Canonical identity every balance record hangs off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default)]
    pub id: String,
    pub employee_number: String,
    pub firstname: String,
    pub middlename: Option<String>,
    pub lastname: String,
    pub strippedname: String,
    pub subunit: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub employment_status: Option<String>,
    pub joined: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    #[serde(default)]
    pub manually_added: bool,
}

impl Employee {
    pub fn new(employee_number: &str, name: NameParts, joined: NaiveDate) -> Self {
        Self {
            id: String::new(),
            employee_number: employee_number.to_string(),
            firstname: name.firstname,
            middlename: name.middlename,
            lastname: name.lastname,
            strippedname: name.strippedname,
            subunit: None,
            location: None,
            job_title: None,
            employment_status: None,
            joined,
            termination_date: None,
            manually_added: false,
        }
    }

    pub fn name_parts(&self) -> NameParts {
        NameParts::new(&self.firstname, self.middlename.as_deref(), &self.lastname)
    }

    /// Joined on or before `date` and not terminated before it.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.joined <= date && self.termination_date.is_none_or(|t| t >= date)
    }

    /// Payroll exports pad employee numbers with zeros; "0010" and "10" are the
    /// same employee.
    pub fn canonical_number(raw: &str) -> Option<String> {
        raw.trim().parse::<u64>().ok().map(|n| n.to_string())
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} ({})", self.lastname, self.firstname, self.employee_number)
    }
}

/// One row of the HRM leave-entitlement usage report for an employee and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageBalance {
    #[serde(default)]
    pub id: String,
    pub employee_id: String,
    pub fullname: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub report_start: NaiveDate,
    pub report_end: NaiveDate,
    pub entitlements: Decimal,
    pub pending_approval: Decimal,
    pub scheduled: Decimal,
    pub taken: Decimal,
    pub available_balance: Decimal,
    pub total_overdrawn: Decimal,
    pub hrm_balance: Decimal,
    pub vip_balance: Decimal,
}

impl UsageBalance {
    pub fn period(&self) -> Period {
        Period::new(self.period_start, self.period_end)
    }

    pub fn report_period(&self) -> Period {
        Period::new(self.report_start, self.report_end)
    }

    /// Entitlements less everything already booked against them.
    pub fn compute_hrm_balance(entitlements: Decimal, pending_approval: Decimal, scheduled: Decimal, taken: Decimal) -> Decimal {
        entitlements - (pending_approval + scheduled + taken)
    }
}

/// Which monthly ledger a [`MonthlyBalance`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerKind {
    /// Balances reported by the external VIP payroll system.
    Vip,
    /// Annual leave taken, from the HRM leave list.
    Hrm,
}

impl LedgerKind {
    pub fn table(&self) -> &'static str {
        match self {
            LedgerKind::Vip => VIP_MONTHLY,
            LedgerKind::Hrm => HRM_MONTHLY,
        }
    }

    /// Column prefix used by the monthly summary.
    pub fn prefix(&self) -> &'static str {
        match self {
            LedgerKind::Vip => "V",
            LedgerKind::Hrm => "H",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    #[serde(default)]
    pub id: String,
    pub employee_id: String,
    pub employee_number: String,
    pub fullname: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub balance: Decimal,
}

impl MonthlyBalance {
    pub fn period(&self) -> Period {
        Period::new(self.period_start, self.period_end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBalance {
    #[serde(default)]
    pub id: String,
    pub employee_id: String,
    pub balance: Decimal,
    pub balance_date: NaiveDate,
}
