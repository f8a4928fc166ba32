mod common;

use async_trait::async_trait;
use common::{add_employee, rows};
use hrmrec_common::Period;
use hrmrec_plugins::importers::{Importer, MonthlyLedgerStrategy, UsageReportStrategy};
use hrmrec_runtime::datastore::{DataStore, MemoryDataStore};
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::models::{LedgerKind, USAGE_BALANCE};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Memory store whose usage-ledger updates can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryDataStore,
    fail_usage_updates: AtomicBool,
}

#[async_trait]
impl DataStore for FlakyStore {
    async fn insert(&self, entity: &str, record: Value) -> Result<String, String> {
        self.inner.insert(entity, record).await
    }
    async fn get(&self, entity: &str, id: &str) -> Result<Option<Arc<Value>>, String> {
        self.inner.get(entity, id).await
    }
    async fn update(&self, entity: &str, id: &str, record: Value) -> Result<(), String> {
        if entity == USAGE_BALANCE && self.fail_usage_updates.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.inner.update(entity, id, record).await
    }
    async fn delete(&self, entity: &str, id: &str) -> Result<(), String> {
        self.inner.delete(entity, id).await
    }
    async fn list(&self, entity: &str, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<Arc<Value>>, String> {
        self.inner.list(entity, limit, offset).await
    }
    async fn find(&self, entity: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String> {
        self.inner.find(entity, filters).await
    }
    async fn find_first(&self, entity: &str, filters: HashMap<String, String>) -> Result<Option<Arc<Value>>, String> {
        self.inner.find_first(entity, filters).await
    }
    async fn find_range(
        &self,
        entity: &str,
        field: &str,
        from: &str,
        to: &str,
        filters: HashMap<String, String>,
    ) -> Result<Vec<Arc<Value>>, String> {
        self.inner.find_range(entity, field, from, to, filters).await
    }
    async fn delete_where(&self, entity: &str, filters: HashMap<String, String>) -> Result<u64, String> {
        self.inner.delete_where(entity, filters).await
    }
    async fn count(&self, entity: &str, filters: HashMap<String, String>) -> Result<i64, String> {
        self.inner.count(entity, filters).await
    }
}

const USAGE_HEADER: &[&str] = &[
    "Employee Name",
    "Leave Period",
    "Entitlements (Days)",
    "Pending Approval (Days)",
    "Scheduled (Days)",
    "Taken (Days)",
    "Available Balance (Days)",
    "Total Overdrawn",
];

const VIP_HEADER: &[&str] = &["Employee Number", "Employee Name", "Balance"];

#[tokio::test]
async fn test_failed_usage_mirror_leaves_vip_record_as_it_was() {
    let store = Arc::new(FlakyStore::default());
    let ledger = Ledger::new(store.clone());
    let thandi = add_employee(&ledger, "10", "Thandi", None, "Nkosi").await;
    let sipho = add_employee(&ledger, "11", "Sipho", None, "Dlamini").await;
    let march = Period::month(2015, 3).unwrap();

    let usage = UsageReportStrategy::new(ledger.clone(), march);
    let mut report = rows(&[
        USAGE_HEADER,
        &["Thandi Nkosi", "2015-01-01 - 2015-12-31", "20", "0", "0", "0", "20", "0"],
        &["Sipho Dlamini", "2015-01-01 - 2015-12-31", "20", "0", "0", "0", "20", "0"],
    ]);
    Importer::run(&usage, &mut report, None).await.unwrap();

    let vip = MonthlyLedgerStrategy::vip(ledger.clone(), march);
    let mut first = rows(&[VIP_HEADER, &["10", "Thandi Nkosi", "4"]]);
    Importer::run(&vip, &mut first, None).await.unwrap();

    store.fail_usage_updates.store(true, Ordering::SeqCst);

    // An accumulated record goes back to its earlier balance.
    let mut more = rows(&[VIP_HEADER, &["10", "Thandi Nkosi", "3"]]);
    assert!(Importer::run(&vip, &mut more, None).await.is_err());
    let record = ledger.monthly_for(LedgerKind::Vip, &thandi.id, march).await.unwrap().unwrap();
    assert_eq!(record.balance, dec!(4));

    // A freshly created record is removed again.
    let mut fresh = rows(&[VIP_HEADER, &["11", "Sipho Dlamini", "5"]]);
    assert!(Importer::run(&vip, &mut fresh, None).await.is_err());
    assert!(ledger.monthly_for(LedgerKind::Vip, &sipho.id, march).await.unwrap().is_none());
    assert_eq!(ledger.usage_for(&thandi.id, march).await.unwrap().unwrap().vip_balance, dec!(4));
}
