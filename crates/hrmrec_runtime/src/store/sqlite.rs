use super::{DataStore, validate_identifier};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

// Dates and decimals are kept as TEXT: ISO dates sort correctly and decimals
// keep their scale.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "employee" (
        "id" TEXT PRIMARY KEY,
        "employee_number" TEXT NOT NULL UNIQUE,
        "firstname" TEXT NOT NULL,
        "middlename" TEXT,
        "lastname" TEXT NOT NULL,
        "strippedname" TEXT NOT NULL,
        "subunit" TEXT,
        "location" TEXT,
        "job_title" TEXT,
        "employment_status" TEXT,
        "joined" TEXT NOT NULL,
        "termination_date" TEXT,
        "manually_added" BOOLEAN NOT NULL DEFAULT 0,
        UNIQUE ("firstname", "lastname")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "employee_strippedname" ON "employee" ("strippedname")"#,
    r#"CREATE TABLE IF NOT EXISTS "usage_balance" (
        "id" TEXT PRIMARY KEY,
        "employee_id" TEXT NOT NULL REFERENCES "employee" ("id"),
        "fullname" TEXT NOT NULL,
        "period_start" TEXT NOT NULL,
        "period_end" TEXT NOT NULL,
        "report_start" TEXT NOT NULL,
        "report_end" TEXT NOT NULL,
        "entitlements" TEXT NOT NULL,
        "pending_approval" TEXT NOT NULL,
        "scheduled" TEXT NOT NULL,
        "taken" TEXT NOT NULL,
        "available_balance" TEXT NOT NULL,
        "total_overdrawn" TEXT NOT NULL,
        "hrm_balance" TEXT NOT NULL,
        "vip_balance" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "vip_monthly" (
        "id" TEXT PRIMARY KEY,
        "employee_id" TEXT NOT NULL REFERENCES "employee" ("id"),
        "employee_number" TEXT NOT NULL,
        "fullname" TEXT NOT NULL,
        "period_start" TEXT NOT NULL,
        "period_end" TEXT NOT NULL,
        "balance" TEXT NOT NULL,
        UNIQUE ("employee_id", "period_start", "period_end")
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "hrm_monthly" (
        "id" TEXT PRIMARY KEY,
        "employee_id" TEXT NOT NULL REFERENCES "employee" ("id"),
        "employee_number" TEXT NOT NULL,
        "fullname" TEXT NOT NULL,
        "period_start" TEXT NOT NULL,
        "period_end" TEXT NOT NULL,
        "balance" TEXT NOT NULL,
        UNIQUE ("employee_id", "period_start", "period_end")
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "opening_balance" (
        "id" TEXT PRIMARY KEY,
        "employee_id" TEXT NOT NULL UNIQUE REFERENCES "employee" ("id"),
        "balance" TEXT NOT NULL,
        "balance_date" TEXT NOT NULL
    )"#,
];

pub struct SqliteDataStore {
    pool: SqlitePool,
}

impl SqliteDataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url`, e.g. `sqlite://hrmrec.db`.
    pub async fn connect(url: &str) -> Result<Self, String> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.to_string())?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), String> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn row_to_json(row: &SqliteRow) -> Value {
        let mut map = serde_json::Map::new();
        for col in row.columns() {
            let name = col.name();
            let val = match col.type_info().name() {
                "INTEGER" | "INT" | "BIGINT" => row
                    .try_get::<Option<i64>, _>(name)
                    .ok()
                    .flatten()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                "REAL" | "FLOAT" | "DOUBLE" => row
                    .try_get::<Option<f64>, _>(name)
                    .ok()
                    .flatten()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                "BOOLEAN" => row
                    .try_get::<Option<bool>, _>(name)
                    .ok()
                    .flatten()
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),
                _ => row
                    .try_get::<Option<String>, _>(name)
                    .ok()
                    .flatten()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            };
            map.insert(name.to_string(), val);
        }
        Value::Object(map)
    }

    fn bind_value<'q>(q: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
        match value {
            Value::String(s) => q.bind(s.clone()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    q.bind(i)
                } else if let Some(f) = n.as_f64() {
                    q.bind(f)
                } else {
                    q.bind(n.to_string())
                }
            }
            Value::Bool(b) => q.bind(*b),
            Value::Null => q.bind(Option::<String>::None),
            other => q.bind(other.to_string()),
        }
    }

    /// Appends ` WHERE "k" = ? AND ...` for the given filters and returns the
    /// values to bind, in order.
    fn where_clause(
        query: &mut String,
        filters: &HashMap<String, String>,
        mut has_where: bool,
    ) -> Result<Vec<String>, String> {
        let mut params = Vec::with_capacity(filters.len());
        for (k, v) in filters {
            validate_identifier(k)?;
            query.push_str(if has_where { " AND " } else { " WHERE " });
            has_where = true;
            query.push_str(&format!("\"{}\" = ?", k));
            params.push(v.clone());
        }
        Ok(params)
    }

    async fn fetch(&self, query: &str, params: Vec<String>) -> Result<Vec<Arc<Value>>, String> {
        let mut q = sqlx::query(query);
        for p in params {
            q = q.bind(p);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(|e| e.to_string())?;
        Ok(rows.iter().map(|r| Arc::new(Self::row_to_json(r))).collect())
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn insert(&self, entity: &str, record: Value) -> Result<String, String> {
        validate_identifier(entity)?;
        let obj = record.as_object().ok_or("Record must be object")?;

        let mut query = format!("INSERT INTO \"{}\" (", entity);
        let mut values_clause = String::from(") VALUES (");
        for (i, k) in obj.keys().enumerate() {
            validate_identifier(k)?;
            if i > 0 {
                query.push_str(", ");
                values_clause.push_str(", ");
            }
            query.push('"');
            query.push_str(k);
            query.push('"');
            values_clause.push('?');
        }
        query.push_str(&values_clause);
        query.push_str(") RETURNING id");

        let mut q = sqlx::query(&query);
        for v in obj.values() {
            q = Self::bind_value(q, v);
        }

        let row = q.fetch_one(&self.pool).await.map_err(|e| e.to_string())?;
        row.try_get::<String, _>("id").map_err(|e| e.to_string())
    }

    async fn get(&self, entity: &str, id: &str) -> Result<Option<Arc<Value>>, String> {
        validate_identifier(entity)?;
        let query = format!("SELECT * FROM \"{}\" WHERE id = ?", entity);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.to_string())?;

        Ok(row.map(|row| Arc::new(Self::row_to_json(&row))))
    }

    async fn update(&self, entity: &str, id: &str, record: Value) -> Result<(), String> {
        validate_identifier(entity)?;
        let obj = record.as_object().ok_or("Record must be object")?;
        let mut query = format!("UPDATE \"{}\" SET ", entity);
        let mut params = vec![];

        for (k, v) in obj.iter().filter(|(k, _)| k.as_str() != "id") {
            validate_identifier(k)?;
            if !params.is_empty() {
                query.push_str(", ");
            }
            query.push_str(&format!("\"{}\" = ?", k));
            params.push(v);
        }
        if params.is_empty() {
            return Ok(());
        }
        query.push_str(" WHERE id = ?");

        let mut q = sqlx::query(&query);
        for p in params {
            q = Self::bind_value(q, p);
        }
        q = q.bind(id.to_string());

        let result = q.execute(&self.pool).await.map_err(|e| e.to_string())?;
        if result.rows_affected() == 0 {
            return Err("Record not found".to_string());
        }
        Ok(())
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<(), String> {
        validate_identifier(entity)?;
        let query = format!("DELETE FROM \"{}\" WHERE id = ?", entity);
        let result = sqlx::query(&query)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| e.to_string())?;
        if result.rows_affected() == 0 {
            return Err("Record not found".to_string());
        }
        Ok(())
    }

    async fn list(&self, entity: &str, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<Arc<Value>>, String> {
        validate_identifier(entity)?;
        let mut query = format!("SELECT * FROM \"{}\"", entity);
        // SQLite needs a LIMIT before it accepts an OFFSET.
        match (limit, offset) {
            (Some(l), Some(o)) => query.push_str(&format!(" LIMIT {} OFFSET {}", l, o)),
            (Some(l), None) => query.push_str(&format!(" LIMIT {}", l)),
            (None, Some(o)) => query.push_str(&format!(" LIMIT -1 OFFSET {}", o)),
            (None, None) => {}
        }
        self.fetch(&query, vec![]).await
    }

    async fn find(&self, entity: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String> {
        validate_identifier(entity)?;
        let mut query = format!("SELECT * FROM \"{}\"", entity);
        let params = Self::where_clause(&mut query, &filters, false)?;
        self.fetch(&query, params).await
    }

    async fn find_first(&self, entity: &str, filters: HashMap<String, String>) -> Result<Option<Arc<Value>>, String> {
        validate_identifier(entity)?;
        let mut query = format!("SELECT * FROM \"{}\"", entity);
        let params = Self::where_clause(&mut query, &filters, false)?;
        query.push_str(" LIMIT 1");
        Ok(self.fetch(&query, params).await?.into_iter().next())
    }

    async fn find_range(
        &self,
        entity: &str,
        field: &str,
        from: &str,
        to: &str,
        filters: HashMap<String, String>,
    ) -> Result<Vec<Arc<Value>>, String> {
        validate_identifier(entity)?;
        validate_identifier(field)?;
        let mut query = format!("SELECT * FROM \"{}\" WHERE \"{}\" BETWEEN ? AND ?", entity, field);
        let mut params = vec![from.to_string(), to.to_string()];
        params.extend(Self::where_clause(&mut query, &filters, true)?);
        self.fetch(&query, params).await
    }

    async fn delete_where(&self, entity: &str, filters: HashMap<String, String>) -> Result<u64, String> {
        validate_identifier(entity)?;
        let mut query = format!("DELETE FROM \"{}\"", entity);
        let params = Self::where_clause(&mut query, &filters, false)?;

        let mut q = sqlx::query(&query);
        for p in params {
            q = q.bind(p);
        }
        let result = q.execute(&self.pool).await.map_err(|e| e.to_string())?;
        Ok(result.rows_affected())
    }

    async fn count(&self, entity: &str, filters: HashMap<String, String>) -> Result<i64, String> {
        validate_identifier(entity)?;
        let mut query = format!("SELECT COUNT(*) FROM \"{}\"", entity);
        let params = Self::where_clause(&mut query, &filters, false)?;

        let mut q = sqlx::query_scalar(&query);
        for p in params {
            q = q.bind(p);
        }
        let count: i64 = q.fetch_one(&self.pool).await.map_err(|e| e.to_string())?;
        Ok(count)
    }
}
