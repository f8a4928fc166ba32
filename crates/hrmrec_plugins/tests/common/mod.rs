#![allow(dead_code)]

use chrono::NaiveDate;
use hrmrec_common::NameParts;
use hrmrec_runtime::datastore::MemoryDataStore;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::Employee;
use hrmrec_runtime::source::MemorySource;
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ledger() -> Ledger {
    Ledger::new(Arc::new(MemoryDataStore::new()))
}

pub fn rows(rows: &[&[&str]]) -> MemorySource {
    MemorySource::new(rows.iter().map(|r| r.iter().copied()))
}

pub async fn add_employee(ledger: &Ledger, number: &str, first: &str, middle: Option<&str>, last: &str) -> Employee {
    add_employee_joined(ledger, number, first, middle, last, date(2014, 3, 15)).await
}

pub async fn add_employee_joined(
    ledger: &Ledger,
    number: &str,
    first: &str,
    middle: Option<&str>,
    last: &str,
    joined: NaiveDate,
) -> Employee {
    ledger
        .create_employee(Employee::new(number, NameParts::new(first, middle, last), joined))
        .await
        .unwrap()
}
