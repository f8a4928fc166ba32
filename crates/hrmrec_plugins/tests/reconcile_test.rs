mod common;

use common::{add_employee, add_employee_joined, date, ledger};
use hrmrec_common::{LeavePolicy, Period};
use hrmrec_plugins::reconcile::Reconciler;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{Employee, LedgerKind, MonthlyBalance, OpeningBalance};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn record(ledger: &Ledger, kind: LedgerKind, employee: &Employee, year: i32, month: u32, balance: Decimal) {
    let period = Period::month(year, month).unwrap();
    ledger
        .save_monthly(
            kind,
            MonthlyBalance {
                id: String::new(),
                employee_id: employee.id.clone(),
                employee_number: employee.employee_number.clone(),
                fullname: employee.name_parts().display_name(),
                period_start: period.start,
                period_end: period.end,
                balance,
            },
        )
        .await
        .unwrap();
}

async fn opening(ledger: &Ledger, employee: &Employee, balance: Decimal, balance_date: chrono::NaiveDate) {
    ledger
        .save_opening(OpeningBalance {
            id: String::new(),
            employee_id: employee.id.clone(),
            balance,
            balance_date,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nine_months_of_accrual() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(18.30), date(2015, 3, 31)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let accrual = reconciler
        .balance_from_opening(&emp, date(2015, 12, 31))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accrual.months, 9);
    assert_eq!(accrual.accrued, dec!(18.72));
    assert_eq!(accrual.taken, dec!(0));
    assert_eq!(accrual.balance, dec!(37.02));
}

#[tokio::test]
async fn test_taken_counts_months_after_the_opening_date() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(18.30), date(2015, 3, 31)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 3, dec!(5)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 4, dec!(2)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 12, dec!(1)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2016, 1, dec!(4)).await;
    // VIP balances are not leave taken.
    record(&ledger, LedgerKind::Vip, &emp, 2015, 6, dec!(9)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let accrual = reconciler
        .balance_from_opening(&emp, date(2015, 12, 31))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accrual.taken, dec!(3));
    assert_eq!(accrual.balance, dec!(34.02));
}

#[tokio::test]
async fn test_month_end_anchor_counts_shorter_months() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(18.30), date(2014, 12, 31)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    for (reference, months, balance) in [
        (date(2015, 2, 28), 2, dec!(22.46)),
        (date(2015, 4, 30), 4, dec!(26.62)),
        (date(2015, 9, 30), 9, dec!(37.02)),
    ] {
        let accrual = reconciler
            .balance_from_opening(&emp, reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accrual.months, months, "at {}", reference);
        assert_eq!(accrual.balance, balance, "at {}", reference);
    }
}

#[tokio::test]
async fn test_leap_february_end_is_a_whole_month() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(0), date(2016, 1, 31)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    for (reference, months) in [(date(2016, 2, 28), 0), (date(2016, 2, 29), 1)] {
        let accrual = reconciler
            .balance_from_opening(&emp, reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accrual.months, months, "at {}", reference);
    }
}

#[tokio::test]
async fn test_leave_in_the_opening_month_is_taken() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(10), date(2015, 1, 1)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2014, 12, dec!(3)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 1, dec!(5)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let accrual = reconciler
        .balance_from_opening(&emp, date(2015, 3, 31))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accrual.months, 2);
    assert_eq!(accrual.taken, dec!(5));
    assert_eq!(accrual.balance, dec!(9.16));
}

#[tokio::test]
async fn test_partial_month_does_not_accrue() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(10), date(2015, 1, 15)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let accrual = reconciler
        .balance_from_opening(&emp, date(2015, 3, 14))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accrual.months, 1);
    assert_eq!(accrual.balance, dec!(12.08));
}

#[tokio::test]
async fn test_no_opening_balance_means_nothing_to_report() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    assert!(reconciler
        .balance_from_opening(&emp, date(2015, 12, 31))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_custom_accrual_rate() {
    let ledger = ledger();
    let emp = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    opening(&ledger, &emp, dec!(0), date(2015, 1, 31)).await;
    let policy = LeavePolicy {
        accrual_rate: dec!(1.25),
        ..LeavePolicy::default()
    };
    let reconciler = Reconciler::new(ledger, policy);

    let accrual = reconciler
        .balance_from_opening(&emp, date(2015, 3, 31))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(accrual.balance, dec!(2.50));
}

#[tokio::test]
async fn test_balance_for_leave_period() {
    let ledger = ledger();
    let emp = add_employee_joined(&ledger, "10", "Thandi", None, "Nkosi", date(2014, 3, 15)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 2, dec!(7)).await;
    record(&ledger, LedgerKind::Hrm, &emp, 2015, 3, dec!(2)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let accrual = reconciler
        .balance_for_leave_period(&emp, date(2015, 12, 31), dec!(5))
        .await
        .unwrap();

    assert_eq!(accrual.anchor, date(2015, 3, 1));
    assert_eq!(accrual.months, 9);
    assert_eq!(accrual.taken, dec!(2));
    assert_eq!(accrual.balance, dec!(21.72));
}

#[tokio::test]
async fn test_compute_balances_against_vip() {
    let ledger = ledger();
    let thandi = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    add_employee(&ledger, "11", "Sipho", None, "Dlamini").await;
    opening(&ledger, &thandi, dec!(18.30), date(2015, 3, 31)).await;
    record(&ledger, LedgerKind::Vip, &thandi, 2015, 12, dec!(30)).await;
    let reconciler = Reconciler::new(ledger, LeavePolicy::default());

    let balances = reconciler.compute_balances(date(2015, 12, 31)).await.unwrap();

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].employee.employee_number, "10");
    assert_eq!(balances[0].accrual.balance, dec!(37.02));
    assert_eq!(balances[0].vip_balance, dec!(30));
    assert_eq!(balances[0].difference, dec!(7.02));
}
