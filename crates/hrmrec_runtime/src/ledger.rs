//! Typed access to the leave records held in a [`DataStore`].

use crate::datastore::DataStore;
use crate::errors::RuntimeError;
use crate::models::{
    ALL_ENTITIES, EMPLOYEE, Employee, LedgerKind, MonthlyBalance, OPENING_BALANCE, OpeningBalance, USAGE_BALANCE,
    UsageBalance,
};
use chrono::NaiveDate;
use hrmrec_common::Period;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn filters(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, RuntimeError> {
    Ok(T::deserialize(value)?)
}

fn decode_all<T: DeserializeOwned>(values: Vec<Arc<Value>>) -> Result<Vec<T>, RuntimeError> {
    values.iter().map(|v| decode(v)).collect()
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn DataStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub fn datastore(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    async fn find<T: DeserializeOwned>(
        &self,
        entity: &str,
        filters: HashMap<String, String>,
    ) -> Result<Vec<T>, RuntimeError> {
        let rows = self
            .store
            .find(entity, filters)
            .await
            .map_err(RuntimeError::DataStoreError)?;
        decode_all(rows)
    }

    async fn find_first<T: DeserializeOwned>(
        &self,
        entity: &str,
        filters: HashMap<String, String>,
    ) -> Result<Option<T>, RuntimeError> {
        let row = self
            .store
            .find_first(entity, filters)
            .await
            .map_err(RuntimeError::DataStoreError)?;
        row.map(|v| decode(&v)).transpose()
    }

    /// Inserts when `id` is empty, otherwise overwrites the stored record.
    async fn save<T: Serialize>(&self, entity: &str, id: &mut String, record: &T) -> Result<(), RuntimeError> {
        if id.is_empty() {
            *id = Uuid::new_v4().to_string();
            let mut value = serde_json::to_value(record)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("id".to_string(), Value::String(id.clone()));
            }
            self.store
                .insert(entity, value)
                .await
                .map_err(RuntimeError::DataStoreError)?;
        } else {
            let value = serde_json::to_value(record)?;
            self.store
                .update(entity, id, value)
                .await
                .map_err(RuntimeError::DataStoreError)?;
        }
        Ok(())
    }

    pub async fn count(&self, entity: &str) -> Result<i64, RuntimeError> {
        self.store
            .count(entity, HashMap::new())
            .await
            .map_err(RuntimeError::DataStoreError)
    }

    /// Deletes every record of every entity.
    pub async fn reset(&self) -> Result<u64, RuntimeError> {
        let mut removed = 0;
        for entity in ALL_ENTITIES {
            removed += self
                .store
                .delete_where(entity, HashMap::new())
                .await
                .map_err(RuntimeError::DataStoreError)?;
        }
        Ok(removed)
    }

    // --- employees ---

    /// Creates an employee. A taken employee number or (firstname, lastname)
    /// pair yields [`RuntimeError::Duplicate`].
    pub async fn create_employee(&self, mut employee: Employee) -> Result<Employee, RuntimeError> {
        if let Some(existing) = self.employee_by_number(&employee.employee_number).await? {
            return Err(RuntimeError::Duplicate(format!(
                "employee number {} already belongs to {}",
                employee.employee_number, existing
            )));
        }
        if let Some(existing) = self
            .employees_by_name(&employee.lastname, &employee.firstname)
            .await?
            .into_iter()
            .next()
        {
            return Err(RuntimeError::Duplicate(format!(
                "name {} {} already belongs to {}",
                employee.firstname, employee.lastname, existing
            )));
        }

        let mut id = String::new();
        self.save(EMPLOYEE, &mut id, &employee).await?;
        employee.id = id;
        Ok(employee)
    }

    pub async fn update_employee(&self, employee: &Employee) -> Result<(), RuntimeError> {
        let mut id = employee.id.clone();
        self.save(EMPLOYEE, &mut id, employee).await
    }

    pub async fn employee(&self, id: &str) -> Result<Option<Employee>, RuntimeError> {
        let row = self
            .store
            .get(EMPLOYEE, id)
            .await
            .map_err(RuntimeError::DataStoreError)?;
        row.map(|v| decode(&v)).transpose()
    }

    pub async fn employee_by_number(&self, number: &str) -> Result<Option<Employee>, RuntimeError> {
        self.find_first(EMPLOYEE, filters(&[("employee_number", number)])).await
    }

    pub async fn employees_by_name(&self, lastname: &str, firstname: &str) -> Result<Vec<Employee>, RuntimeError> {
        self.find(EMPLOYEE, filters(&[("lastname", lastname), ("firstname", firstname)]))
            .await
    }

    pub async fn employees_by_strippedname(&self, strippedname: &str) -> Result<Vec<Employee>, RuntimeError> {
        self.find(EMPLOYEE, filters(&[("strippedname", strippedname)])).await
    }

    /// All employees ordered by lastname, then firstname.
    pub async fn employees(&self) -> Result<Vec<Employee>, RuntimeError> {
        let mut employees: Vec<Employee> = self.find(EMPLOYEE, HashMap::new()).await?;
        employees.sort_by(|a, b| {
            a.lastname
                .cmp(&b.lastname)
                .then_with(|| a.firstname.cmp(&b.firstname))
                .then_with(|| a.employee_number.cmp(&b.employee_number))
        });
        Ok(employees)
    }

    async fn employees_in_range(&self, field: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Employee>, RuntimeError> {
        let rows = self
            .store
            .find_range(EMPLOYEE, field, &iso(from), &iso(to), HashMap::new())
            .await
            .map_err(RuntimeError::DataStoreError)?;
        decode_all(rows)
    }

    pub async fn employees_joined_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Employee>, RuntimeError> {
        self.employees_in_range("joined", from, to).await
    }

    pub async fn employees_terminated_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Employee>, RuntimeError> {
        self.employees_in_range("termination_date", from, to).await
    }

    // --- usage report ledger ---

    fn for_period(period: Period) -> HashMap<String, String> {
        HashMap::from([
            ("period_start".to_string(), iso(period.start)),
            ("period_end".to_string(), iso(period.end)),
        ])
    }

    fn keyed(employee_id: &str, period: Period) -> HashMap<String, String> {
        let mut map = Self::for_period(period);
        map.insert("employee_id".to_string(), employee_id.to_string());
        map
    }

    pub async fn clear_usage(&self, period: Period) -> Result<u64, RuntimeError> {
        self.store
            .delete_where(USAGE_BALANCE, Self::for_period(period))
            .await
            .map_err(RuntimeError::DataStoreError)
    }

    pub async fn usage_for(&self, employee_id: &str, period: Period) -> Result<Option<UsageBalance>, RuntimeError> {
        self.find_first(USAGE_BALANCE, Self::keyed(employee_id, period)).await
    }

    pub async fn usage_in(&self, period: Period) -> Result<Vec<UsageBalance>, RuntimeError> {
        self.find(USAGE_BALANCE, Self::for_period(period)).await
    }

    pub async fn save_usage(&self, mut usage: UsageBalance) -> Result<UsageBalance, RuntimeError> {
        let mut id = usage.id.clone();
        self.save(USAGE_BALANCE, &mut id, &usage).await?;
        usage.id = id;
        Ok(usage)
    }

    // --- monthly ledgers ---

    pub async fn clear_monthly(&self, kind: LedgerKind, period: Period) -> Result<u64, RuntimeError> {
        self.store
            .delete_where(kind.table(), Self::for_period(period))
            .await
            .map_err(RuntimeError::DataStoreError)
    }

    pub async fn monthly_for(
        &self,
        kind: LedgerKind,
        employee_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyBalance>, RuntimeError> {
        self.find_first(kind.table(), Self::keyed(employee_id, period)).await
    }

    pub async fn monthly_in(&self, kind: LedgerKind, period: Period) -> Result<Vec<MonthlyBalance>, RuntimeError> {
        self.find(kind.table(), Self::for_period(period)).await
    }

    /// Every monthly record of one employee, oldest period first.
    pub async fn monthly_history(&self, kind: LedgerKind, employee_id: &str) -> Result<Vec<MonthlyBalance>, RuntimeError> {
        let mut records: Vec<MonthlyBalance> = self
            .find(kind.table(), filters(&[("employee_id", employee_id)]))
            .await?;
        records.sort_by_key(|r| (r.period_end, r.period_start));
        Ok(records)
    }

    /// Monthly records of one employee whose period ends within `from..=to`.
    pub async fn monthly_ending_between(
        &self,
        kind: LedgerKind,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MonthlyBalance>, RuntimeError> {
        let rows = self
            .store
            .find_range(
                kind.table(),
                "period_end",
                &iso(from),
                &iso(to),
                filters(&[("employee_id", employee_id)]),
            )
            .await
            .map_err(RuntimeError::DataStoreError)?;
        decode_all(rows)
    }

    pub async fn save_monthly(&self, kind: LedgerKind, mut record: MonthlyBalance) -> Result<MonthlyBalance, RuntimeError> {
        let mut id = record.id.clone();
        self.save(kind.table(), &mut id, &record).await?;
        record.id = id;
        Ok(record)
    }

    pub async fn delete_monthly(&self, kind: LedgerKind, id: &str) -> Result<(), RuntimeError> {
        self.store
            .delete(kind.table(), id)
            .await
            .map_err(RuntimeError::DataStoreError)
    }

    // --- opening balances ---

    pub async fn opening_for(&self, employee_id: &str) -> Result<Option<OpeningBalance>, RuntimeError> {
        self.find_first(OPENING_BALANCE, filters(&[("employee_id", employee_id)]))
            .await
    }

    pub async fn save_opening(&self, mut opening: OpeningBalance) -> Result<OpeningBalance, RuntimeError> {
        let mut id = opening.id.clone();
        self.save(OPENING_BALANCE, &mut id, &opening).await?;
        opening.id = id;
        Ok(opening)
    }

    /// Removes opening balances observed within `period`.
    pub async fn clear_openings(&self, period: Period) -> Result<u64, RuntimeError> {
        let rows = self
            .store
            .find_range(
                OPENING_BALANCE,
                "balance_date",
                &iso(period.start),
                &iso(period.end),
                HashMap::new(),
            )
            .await
            .map_err(RuntimeError::DataStoreError)?;
        let mut removed = 0;
        for row in rows {
            if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
                self.store
                    .delete(OPENING_BALANCE, id)
                    .await
                    .map_err(RuntimeError::DataStoreError)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
