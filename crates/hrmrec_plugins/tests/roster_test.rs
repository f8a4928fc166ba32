mod common;

use common::{date, ledger, rows};
use hrmrec_common::Period;
use hrmrec_plugins::importers::{Importer, IssueReason, MonthlyLedgerStrategy};
use hrmrec_plugins::roster::RosterLoader;
use hrmrec_runtime::models::LedgerKind;

const HEADER: &[&str] = &[
    "Employee Id",
    "Last Name",
    "First Name",
    "Middle Name",
    "Location",
    "Sub Unit",
    "Job Title",
    "Employment Status",
    "Joined Date",
    "Termination Date",
];

#[tokio::test]
async fn test_roster_load() {
    let ledger = ledger();
    let loader = RosterLoader::new(ledger.clone());

    let mut source = rows(&[
        HEADER,
        &["0010", "Nkosi", "Thandi", "Grace", "Cape Town", "Finance", "Clerk", "Full-Time", "2014-03-15", ""],
        &["11", "Van der Merwe", "Pieter", "", "Durban", "Sales", "Rep", "Contract", "01/02/2013", "30/06/2015"],
    ]);
    let report = loader.load(&mut source, false).await.unwrap();

    assert_eq!(report.imported, 2);
    assert_eq!(report.records_in_ledger, 2);

    let thandi = ledger.employee_by_number("10").await.unwrap().unwrap();
    assert_eq!(thandi.middlename.as_deref(), Some("Grace"));
    assert_eq!(thandi.strippedname, "ThandiGraceNkosi");
    assert_eq!(thandi.location.as_deref(), Some("Cape Town"));
    assert_eq!(thandi.termination_date, None);

    // Multi-word surnames go through the same token rules as any other name.
    let pieter = ledger.employee_by_number("11").await.unwrap().unwrap();
    assert_eq!(pieter.firstname, "Pieter");
    assert_eq!(pieter.middlename.as_deref(), Some("der"));
    assert_eq!(pieter.lastname, "Merwe");
    assert_eq!(pieter.strippedname, "PieterderMerwe");
    assert_eq!(pieter.joined, date(2013, 2, 1));
    assert_eq!(pieter.termination_date, Some(date(2015, 6, 30)));
}

#[tokio::test]
async fn test_roster_duplicates_are_skipped() {
    let ledger = ledger();
    let loader = RosterLoader::new(ledger.clone());

    let mut source = rows(&[
        HEADER,
        &["10", "Nkosi", "Thandi", "", "", "", "", "", "2014-03-15", ""],
        &["010", "Mokoena", "Anele", "", "", "", "", "", "2014-03-15", ""],
        &["12", "Nkosi", "Thandi", "", "", "", "", "", "2014-03-15", ""],
        &["abc", "Adams", "Bongani", "", "", "", "", "", "2014-03-15", ""],
    ]);
    let report = loader.load(&mut source, false).await.unwrap();

    assert_eq!(report.imported, 1);
    assert!(matches!(report.skipped[0].reason, IssueReason::Duplicate(_)));
    assert!(matches!(report.skipped[1].reason, IssueReason::Duplicate(_)));
    assert!(matches!(report.skipped[2].reason, IssueReason::Malformed(_)));
}

#[tokio::test]
async fn test_roster_reset_reloads_from_scratch() {
    let ledger = ledger();
    let loader = RosterLoader::new(ledger.clone());
    let mut first = rows(&[HEADER, &["10", "Nkosi", "Thandi", "", "", "", "", "", "2014-03-15", ""]]);
    loader.load(&mut first, false).await.unwrap();

    let march = Period::month(2015, 3).unwrap();
    let vip = MonthlyLedgerStrategy::vip(ledger.clone(), march);
    let mut balances = rows(&[&["Employee Number", "Employee Name", "Balance"], &["10", "Thandi Nkosi", "4"]]);
    Importer::run(&vip, &mut balances, None).await.unwrap();

    let mut second = rows(&[HEADER, &["20", "Adams", "Bongani", "", "", "", "", "", "2015-01-05", ""]]);
    let report = loader.load(&mut second, true).await.unwrap();

    assert_eq!(report.records_in_ledger, 1);
    assert!(ledger.employee_by_number("10").await.unwrap().is_none());
    assert!(ledger.monthly_in(LedgerKind::Vip, march).await.unwrap().is_empty());
}
