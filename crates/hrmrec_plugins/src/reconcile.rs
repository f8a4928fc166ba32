//! Leave accrual and ledger comparison.
//!
//! Balances accrue at the policy rate for every whole calendar month after an
//! anchor date, less the annual leave recorded in the HRM monthly ledger over
//! the same span.

use crate::errors::ReportError;
use chrono::{Datelike, NaiveDate};
use hrmrec_common::period::whole_months_between;
use hrmrec_common::{LeavePolicy, Period};
use hrmrec_runtime::errors::RuntimeError;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Rounds to cents, halves away from zero.
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Leave used in each period, given the balance before the first period and the
/// balance reported at the end of each: `prior - current`, where each period's
/// closing balance opens the next.
pub fn implied_usage(opening: Decimal, balances: &[Decimal]) -> Vec<Decimal> {
    let mut prior = opening;
    balances
        .iter()
        .map(|&current| {
            let used = prior - current;
            prior = current;
            used
        })
        .collect()
}

/// A balance carried forward from an anchor date to a reference date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accrual {
    pub anchor: NaiveDate,
    pub reference: NaiveDate,
    pub opening: Decimal,
    pub months: i32,
    pub accrued: Decimal,
    pub taken: Decimal,
    pub balance: Decimal,
}

/// Which side overstates the balance, and whether by too much.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub diff: Decimal,
    pub gross_in_hrm: Option<Decimal>,
    pub gross_in_vip: Option<Decimal>,
    pub excessive: Option<Decimal>,
}

impl Discrepancy {
    pub fn classify(hrm: Decimal, vip: Decimal, threshold: Decimal) -> Self {
        let diff = hrm - vip;
        let magnitude = diff.abs();
        Self {
            diff,
            gross_in_hrm: (diff > Decimal::ZERO).then_some(magnitude),
            gross_in_vip: (diff < Decimal::ZERO).then_some(magnitude),
            excessive: (magnitude >= threshold).then_some(magnitude),
        }
    }
}

/// One employee's computed balance next to the VIP balance for the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedBalance {
    pub employee: Employee,
    pub accrual: Accrual,
    pub vip_balance: Decimal,
    pub difference: Decimal,
}

#[derive(Clone)]
pub struct Reconciler {
    ledger: Ledger,
    policy: LeavePolicy,
}

impl Reconciler {
    pub fn new(ledger: Ledger, policy: LeavePolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn policy(&self) -> &LeavePolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// HRM leave taken in months ending after `anchor` and no later than
    /// `reference`. A month that ends on the anchor is already in the opening.
    async fn taken(&self, employee: &Employee, anchor: NaiveDate, reference: NaiveDate) -> Result<Decimal, RuntimeError> {
        let history = self.ledger.monthly_history(LedgerKind::Hrm, &employee.id).await?;
        Ok(history
            .iter()
            .filter(|r| r.period_end > anchor && r.period_end <= reference)
            .map(|r| r.balance)
            .sum())
    }

    fn accrue(&self, anchor: NaiveDate, reference: NaiveDate, opening: Decimal, taken: Decimal) -> Accrual {
        let months = whole_months_between(anchor, reference).max(0);
        let accrued = self.policy.accrual_rate * Decimal::from(months);
        Accrual {
            anchor,
            reference,
            opening,
            months,
            accrued,
            taken,
            balance: round(opening + accrued - taken),
        }
    }

    /// Carries the stored opening balance forward to `reference`. `None` when
    /// the employee has no opening balance.
    pub async fn balance_from_opening(
        &self,
        employee: &Employee,
        reference: NaiveDate,
    ) -> Result<Option<Accrual>, RuntimeError> {
        let Some(opening) = self.ledger.opening_for(&employee.id).await? else {
            return Ok(None);
        };
        let taken = self.taken(employee, opening.balance_date, reference).await?;
        Ok(Some(self.accrue(opening.balance_date, reference, opening.balance, taken)))
    }

    /// Carries `carry_forward` from the start of the employee's current leave
    /// year, which begins on the first of their joined month.
    pub async fn balance_for_leave_period(
        &self,
        employee: &Employee,
        reference: NaiveDate,
        carry_forward: Decimal,
    ) -> Result<Accrual, ReportError> {
        let anchor = leave_year_start(employee.joined, reference)?;
        let taken = self.taken(employee, anchor, reference).await?;
        Ok(self.accrue(anchor, reference, carry_forward, taken))
    }

    /// Computed balances at `reference` for every employee with an opening
    /// balance, against the VIP balance of the month containing `reference`.
    pub async fn compute_balances(&self, reference: NaiveDate) -> Result<Vec<CalculatedBalance>, ReportError> {
        let month = Period::containing(reference);
        let mut balances = Vec::new();
        for employee in self.ledger.employees().await? {
            let Some(accrual) = self.balance_from_opening(&employee, reference).await? else {
                continue;
            };
            let vip_balance = self
                .ledger
                .monthly_for(LedgerKind::Vip, &employee.id, month)
                .await?
                .map(|r| r.balance)
                .unwrap_or_default();
            balances.push(CalculatedBalance {
                difference: accrual.balance - vip_balance,
                employee,
                accrual,
                vip_balance,
            });
        }
        Ok(balances)
    }
}

/// First day of the joined month in the reference year, or in the year before
/// when that day is still ahead of `reference`.
pub fn leave_year_start(joined: NaiveDate, reference: NaiveDate) -> Result<NaiveDate, ReportError> {
    let this_year = Period::month(reference.year(), joined.month())?.start;
    if this_year <= reference {
        Ok(this_year)
    } else {
        Ok(Period::month(reference.year() - 1, joined.month())?.start)
    }
}
