use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Record store keyed by entity (table) name. Records are JSON objects carrying
/// a string `id`; filters are exact matches on the string form of a field.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn insert(&self, entity: &str, record: Value) -> Result<String, String>;
    async fn get(&self, entity: &str, id: &str) -> Result<Option<Arc<Value>>, String>;
    async fn update(&self, entity: &str, id: &str, record: Value) -> Result<(), String>;
    async fn delete(&self, entity: &str, id: &str) -> Result<(), String>;
    async fn list(&self, entity: &str, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<Arc<Value>>, String>;
    async fn find(&self, entity: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String>;
    async fn find_first(&self, entity: &str, filters: HashMap<String, String>) -> Result<Option<Arc<Value>>, String>;
    /// Records whose `field` lies in the inclusive range `from..=to`, compared as
    /// strings (ISO dates order correctly).
    async fn find_range(
        &self,
        entity: &str,
        field: &str,
        from: &str,
        to: &str,
        filters: HashMap<String, String>,
    ) -> Result<Vec<Arc<Value>>, String>;
    async fn delete_where(&self, entity: &str, filters: HashMap<String, String>) -> Result<u64, String>;
    async fn count(&self, entity: &str, filters: HashMap<String, String>) -> Result<i64, String>;
}

type DataStoreData = HashMap<String, HashMap<String, Arc<Value>>>;

pub struct MemoryDataStore {
    data: Arc<Mutex<DataStoreData>>,
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

struct CompiledFilter {
    key: String,
    val: String,
    val_i64: Option<i64>,
    val_bool: Option<bool>,
}

impl CompiledFilter {
    fn new(key: String, val: String) -> Self {
        Self {
            val_i64: val.parse::<i64>().ok(),
            val_bool: val.parse::<bool>().ok(),
            key,
            val,
        }
    }

    fn matches(&self, record: &Value) -> bool {
        match record.get(&self.key) {
            Some(Value::String(s)) => s == &self.val,
            Some(Value::Number(n)) => match (n.as_i64(), self.val_i64) {
                (Some(i), Some(vi)) => i == vi,
                _ => n.to_string() == self.val,
            },
            Some(Value::Bool(b)) => self.val_bool == Some(*b),
            _ => false,
        }
    }
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DataStoreData>, String> {
        self.data.lock().map_err(|e| format!("MemoryDataStore lock poisoned: {}", e))
    }

    fn matches_filters(record: &Value, filters: &[CompiledFilter]) -> bool {
        filters.iter().all(|f| f.matches(record))
    }

    fn compile_filters(filters: HashMap<String, String>) -> Vec<CompiledFilter> {
        filters.into_iter().map(|(k, v)| CompiledFilter::new(k, v)).collect()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn insert(&self, entity: &str, mut record: Value) -> Result<String, String> {
        let mut data = self.lock()?;
        let table = data.entry(entity.to_string()).or_default();

        let id = match record.get("id").and_then(|v| v.as_str()) {
            Some(existing_id) if !existing_id.is_empty() => existing_id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if table.contains_key(&id) {
            return Err(format!("Record {} already exists in {}", id, entity));
        }

        match record.as_object_mut() {
            Some(obj) => {
                obj.insert("id".to_string(), Value::String(id.clone()));
            }
            None => return Err("Record must be object".to_string()),
        }

        table.insert(id.clone(), Arc::new(record));
        Ok(id)
    }

    async fn get(&self, entity: &str, id: &str) -> Result<Option<Arc<Value>>, String> {
        let data = self.lock()?;
        Ok(data.get(entity).and_then(|table| table.get(id).cloned()))
    }

    async fn update(&self, entity: &str, id: &str, record: Value) -> Result<(), String> {
        let mut data = self.lock()?;
        let table = data.entry(entity.to_string()).or_default();

        let Some(existing) = table.get(id) else {
            return Err("Record not found".to_string());
        };

        // Merge existing with new record
        let mut new_record = (**existing).clone();
        if let Some(target) = new_record.as_object_mut()
            && let Value::Object(source) = record
        {
            for (k, v) in source {
                target.insert(k, v);
            }
            target.insert("id".to_string(), Value::String(id.to_string()));
        }

        table.insert(id.to_string(), Arc::new(new_record));
        Ok(())
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<(), String> {
        let mut data = self.lock()?;
        match data.get_mut(entity).and_then(|table| table.remove(id)) {
            Some(_) => Ok(()),
            None => Err("Record not found".to_string()),
        }
    }

    async fn list(&self, entity: &str, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<Arc<Value>>, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(entity) {
            let skip = offset.unwrap_or(0);
            let take = limit.unwrap_or(usize::MAX);
            Ok(table.values().skip(skip).take(take).cloned().collect())
        } else {
            Ok(vec![])
        }
    }

    async fn find(&self, entity: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(entity) {
            let parsed_filters = Self::compile_filters(filters);
            Ok(table
                .values()
                .filter(|record| Self::matches_filters(record, &parsed_filters))
                .cloned()
                .collect())
        } else {
            Ok(vec![])
        }
    }

    async fn find_first(&self, entity: &str, filters: HashMap<String, String>) -> Result<Option<Arc<Value>>, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(entity) {
            let parsed_filters = Self::compile_filters(filters);
            Ok(table
                .values()
                .find(|record| Self::matches_filters(record, &parsed_filters))
                .cloned())
        } else {
            Ok(None)
        }
    }

    async fn find_range(
        &self,
        entity: &str,
        field: &str,
        from: &str,
        to: &str,
        filters: HashMap<String, String>,
    ) -> Result<Vec<Arc<Value>>, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(entity) {
            let parsed_filters = Self::compile_filters(filters);
            Ok(table
                .values()
                .filter(|record| {
                    record
                        .get(field)
                        .and_then(|v| v.as_str())
                        .is_some_and(|v| v >= from && v <= to)
                })
                .filter(|record| Self::matches_filters(record, &parsed_filters))
                .cloned()
                .collect())
        } else {
            Ok(vec![])
        }
    }

    async fn delete_where(&self, entity: &str, filters: HashMap<String, String>) -> Result<u64, String> {
        let mut data = self.lock()?;
        if let Some(table) = data.get_mut(entity) {
            let parsed_filters = Self::compile_filters(filters);
            let before = table.len();
            table.retain(|_, record| !Self::matches_filters(record, &parsed_filters));
            Ok((before - table.len()) as u64)
        } else {
            Ok(0)
        }
    }

    async fn count(&self, entity: &str, filters: HashMap<String, String>) -> Result<i64, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(entity) {
            let parsed_filters = Self::compile_filters(filters);
            let count = table
                .values()
                .filter(|record| Self::matches_filters(record, &parsed_filters))
                .count();
            Ok(count as i64)
        } else {
            Ok(0)
        }
    }
}
