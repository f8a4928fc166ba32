use chrono::NaiveDate;
use hrmrec_common::{NameParts, normalize_name};
use hrmrec_runtime::datastore::MemoryDataStore;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::Employee;
use hrmrec_runtime::resolver::{EmployeeResolver, Resolution};
use std::sync::Arc;

async fn seeded() -> (Ledger, EmployeeResolver) {
    let ledger = Ledger::new(Arc::new(MemoryDataStore::new()));
    let joined = NaiveDate::from_ymd_opt(2014, 3, 15).unwrap();
    let people = [
        ("10", NameParts::new("Thandi", Some("Grace"), "Nkosi")),
        ("11", NameParts::new("Mary Anne", None, "Smith")),
        ("12", NameParts::new("Sipho", None, "Dlamini")),
        ("13", NameParts::new("Sibusiso", None, "Dlamini-Zulu")),
    ];
    for (number, name) in people {
        ledger.create_employee(Employee::new(number, name, joined)).await.unwrap();
    }
    let resolver = EmployeeResolver::new(ledger.clone());
    (ledger, resolver)
}

#[tokio::test]
async fn test_exact_name_match() {
    let (_, resolver) = seeded().await;
    let name = normalize_name("Thandi Grace Nkosi").unwrap();

    let found = resolver.by_name(&name).await.unwrap().found().unwrap();
    assert_eq!(found.employee_number, "10");
}

#[tokio::test]
async fn test_strippedname_fallback() {
    let (_, resolver) = seeded().await;
    // Parsed as first=Mary, middle=Anne, last=Smith; stored as first="Mary Anne".
    let name = normalize_name("Mary Anne Smith").unwrap();
    assert_eq!(name.middlename.as_deref(), Some("Anne"));

    let found = resolver.by_name(&name).await.unwrap().found().unwrap();
    assert_eq!(found.employee_number, "11");
}

#[tokio::test]
async fn test_middlename_mismatch_is_not_found() {
    let (_, resolver) = seeded().await;
    let name = normalize_name("Thandi Nkosi").unwrap();

    let resolution = resolver.by_name(&name).await.unwrap();
    assert_eq!(
        resolution,
        Resolution::NotFound {
            attempted: "Thandi Nkosi".to_string()
        }
    );
}

#[tokio::test]
async fn test_by_number_ignores_padding() {
    let (_, resolver) = seeded().await;

    let found = resolver.by_number("0012").await.unwrap().found().unwrap();
    assert_eq!(found.firstname, "Sipho");
    assert!(resolver.by_number("abc").await.unwrap().found().is_none());
    assert!(resolver.by_number("99").await.unwrap().found().is_none());
}

#[tokio::test]
async fn test_surname_initial_unique() {
    let (_, resolver) = seeded().await;

    let found = resolver.by_surname_initial("nkosi", 't').await.unwrap().found().unwrap();
    assert_eq!(found.employee_number, "10");
}

#[tokio::test]
async fn test_surname_initial_ambiguous() {
    let (_, resolver) = seeded().await;

    match resolver.by_surname_initial("Dlamini", 'S').await.unwrap() {
        Resolution::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguous match, got {:?}", other),
    }
}
