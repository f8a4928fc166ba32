use chrono::NaiveDate;
use hrmrec_common::{NameParts, Period};
use hrmrec_runtime::datastore::MemoryDataStore;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{EMPLOYEE, Employee, LedgerKind, MonthlyBalance, OpeningBalance, USAGE_BALANCE, UsageBalance};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ledger() -> Ledger {
    Ledger::new(Arc::new(MemoryDataStore::new()))
}

fn employee(number: &str, first: &str, last: &str) -> Employee {
    Employee::new(number, NameParts::new(first, None, last), date(2014, 3, 15))
}

fn monthly(employee: &Employee, period: Period, balance: rust_decimal::Decimal) -> MonthlyBalance {
    MonthlyBalance {
        id: String::new(),
        employee_id: employee.id.clone(),
        employee_number: employee.employee_number.clone(),
        fullname: employee.name_parts().display_name(),
        period_start: period.start,
        period_end: period.end,
        balance,
    }
}

#[tokio::test]
async fn test_create_employee_assigns_id() {
    let ledger = ledger();
    let created = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();

    assert!(!created.id.is_empty());
    let loaded = ledger.employee(&created.id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(ledger.count(EMPLOYEE).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_number_rejected() {
    let ledger = ledger();
    ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();

    let err = ledger
        .create_employee(employee("10", "Sipho", "Dlamini"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(ledger.count(EMPLOYEE).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let ledger = ledger();
    ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();

    let err = ledger
        .create_employee(employee("11", "Thandi", "Nkosi"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_employees_sorted_by_name() {
    let ledger = ledger();
    ledger.create_employee(employee("3", "Zola", "Mokoena")).await.unwrap();
    ledger.create_employee(employee("1", "Anele", "Mokoena")).await.unwrap();
    ledger.create_employee(employee("2", "Bongani", "Adams")).await.unwrap();

    let numbers: Vec<String> = ledger
        .employees()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.employee_number)
        .collect();
    assert_eq!(numbers, vec!["2", "1", "3"]);
}

#[tokio::test]
async fn test_joined_and_terminated_ranges() {
    let ledger = ledger();
    let mut early = employee("1", "Anele", "Mokoena");
    early.joined = date(2015, 1, 10);
    early.termination_date = Some(date(2015, 6, 30));
    let mut late = employee("2", "Bongani", "Adams");
    late.joined = date(2015, 3, 1);
    ledger.create_employee(early).await.unwrap();
    ledger.create_employee(late).await.unwrap();

    let joined = ledger
        .employees_joined_between(date(2015, 3, 1), date(2015, 3, 31))
        .await
        .unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].employee_number, "2");

    let left = ledger
        .employees_terminated_between(date(2015, 6, 1), date(2015, 6, 30))
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].employee_number, "1");
}

#[tokio::test]
async fn test_save_monthly_updates_in_place() {
    let ledger = ledger();
    let emp = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();
    let march = Period::month(2015, 3).unwrap();

    let saved = ledger
        .save_monthly(LedgerKind::Vip, monthly(&emp, march, dec!(4.00)))
        .await
        .unwrap();
    let mut again = saved.clone();
    again.balance = dec!(6.50);
    ledger.save_monthly(LedgerKind::Vip, again).await.unwrap();

    let records = ledger.monthly_in(LedgerKind::Vip, march).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, saved.id);
    assert_eq!(records[0].balance, dec!(6.50));

    // The two monthly ledgers do not share records.
    assert!(ledger.monthly_in(LedgerKind::Hrm, march).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_monthly_only_touches_one_period() {
    let ledger = ledger();
    let emp = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();
    let march = Period::month(2015, 3).unwrap();
    let april = Period::month(2015, 4).unwrap();
    ledger
        .save_monthly(LedgerKind::Hrm, monthly(&emp, march, dec!(1)))
        .await
        .unwrap();
    ledger
        .save_monthly(LedgerKind::Hrm, monthly(&emp, april, dec!(2)))
        .await
        .unwrap();

    assert_eq!(ledger.clear_monthly(LedgerKind::Hrm, march).await.unwrap(), 1);

    let history = ledger.monthly_history(LedgerKind::Hrm, &emp.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].period(), april);
}

#[tokio::test]
async fn test_monthly_ending_between() {
    let ledger = ledger();
    let emp = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();
    for month in 1..=6 {
        let period = Period::month(2015, month).unwrap();
        ledger
            .save_monthly(LedgerKind::Hrm, monthly(&emp, period, dec!(1)))
            .await
            .unwrap();
    }

    let found = ledger
        .monthly_ending_between(LedgerKind::Hrm, &emp.id, date(2015, 2, 1), date(2015, 4, 30))
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn test_usage_keyed_by_period() {
    let ledger = ledger();
    let emp = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();
    let march = Period::month(2015, 3).unwrap();
    let usage = UsageBalance {
        id: String::new(),
        employee_id: emp.id.clone(),
        fullname: "Thandi Nkosi".to_string(),
        period_start: march.start,
        period_end: march.end,
        report_start: date(2015, 1, 1),
        report_end: date(2015, 12, 31),
        entitlements: dec!(20),
        pending_approval: dec!(2),
        scheduled: dec!(3),
        taken: dec!(5),
        available_balance: dec!(10),
        total_overdrawn: dec!(0),
        hrm_balance: UsageBalance::compute_hrm_balance(dec!(20), dec!(2), dec!(3), dec!(5)),
        vip_balance: dec!(0),
    };
    ledger.save_usage(usage).await.unwrap();

    let loaded = ledger.usage_for(&emp.id, march).await.unwrap().unwrap();
    assert_eq!(loaded.hrm_balance, dec!(10));
    assert_eq!(loaded.report_period(), Period::new(date(2015, 12, 31), date(2015, 1, 1)));
    assert!(ledger
        .usage_for(&emp.id, Period::month(2015, 4).unwrap())
        .await
        .unwrap()
        .is_none());

    assert_eq!(ledger.clear_usage(march).await.unwrap(), 1);
    assert_eq!(ledger.count(USAGE_BALANCE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let ledger = ledger();
    let emp = ledger.create_employee(employee("10", "Thandi", "Nkosi")).await.unwrap();
    ledger
        .save_opening(OpeningBalance {
            id: String::new(),
            employee_id: emp.id.clone(),
            balance: dec!(18.30),
            balance_date: date(2015, 3, 31),
        })
        .await
        .unwrap();
    ledger
        .save_monthly(LedgerKind::Vip, monthly(&emp, Period::month(2015, 4).unwrap(), dec!(20)))
        .await
        .unwrap();

    assert_eq!(ledger.reset().await.unwrap(), 3);
    assert!(ledger.employees().await.unwrap().is_empty());
    assert!(ledger.opening_for(&emp.id).await.unwrap().is_none());
}
