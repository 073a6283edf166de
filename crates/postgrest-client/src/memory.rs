//! In-memory table endpoint.
//!
//! Keeps rows per table, evaluates [`Filter`]s locally and records every
//! call so tests can assert on the exact traffic a caller produced.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::endpoint::TableEndpoint;
use crate::error::{Error, Result};
use crate::filter::Filter;

/// Kind of endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadOne,
    ReadMany,
    Insert,
    Update,
    Delete,
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct EndpointCall {
    pub operation: Operation,
    pub table: String,
    pub filter: Filter,
    pub body: Option<Value>,
}

struct InjectedFailure {
    operation: Operation,
    status: u16,
    message: String,
}

/// Endpoint backed by in-memory tables.
#[derive(Default)]
pub struct MemoryEndpoint {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<EndpointCall>>,
    failures: Mutex<VecDeque<InjectedFailure>>,
    unique_column: Option<String>,
}

impl MemoryEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts that duplicate `column`, like a primary key would.
    pub fn with_unique(mut self, column: impl Into<String>) -> Self {
        self.unique_column = Some(column.into());
        self
    }

    /// Add rows to a table without recording a call.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<EndpointCall> {
        self.calls.lock().clone()
    }

    /// Calls of one kind.
    pub fn calls_of(&self, operation: Operation) -> Vec<EndpointCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make the next call of `operation` fail with an API error.
    pub fn fail_next(&self, operation: Operation, status: u16, message: impl Into<String>) {
        self.failures.lock().push_back(InjectedFailure {
            operation,
            status,
            message: message.into(),
        });
    }

    fn record(
        &self,
        operation: Operation,
        table: &str,
        filter: &Filter,
        body: Option<&Value>,
    ) -> Result<()> {
        self.calls.lock().push(EndpointCall {
            operation,
            table: table.to_string(),
            filter: filter.clone(),
            body: body.cloned(),
        });

        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|f| f.operation == operation) {
            if let Some(failure) = failures.remove(pos) {
                return Err(Error::Api {
                    status: failure.status,
                    code: "injected".to_string(),
                    message: failure.message,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TableEndpoint for MemoryEndpoint {
    async fn read_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>> {
        self.record(Operation::ReadOne, table, filter, None)?;
        Ok(self
            .tables
            .lock()
            .get(table)
            .and_then(|rows| rows.iter().find(|r| filter.matches(r)).cloned()))
    }

    async fn read_many(&self, table: &str, filter: &Filter) -> Result<Vec<Value>> {
        self.record(Operation::ReadMany, table, filter, None)?;
        Ok(self
            .tables
            .lock()
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<()> {
        self.record(Operation::Insert, table, &Filter::new(), Some(row))?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(column) = &self.unique_column {
            let key = row.get(column);
            if key.is_some() && rows.iter().any(|r| r.get(column) == key) {
                return Err(Error::Api {
                    status: 409,
                    code: "23505".to_string(),
                    message: format!(
                        "duplicate key value violates unique constraint on {}",
                        column
                    ),
                });
            }
        }

        rows.push(row.clone());
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Value) -> Result<()> {
        self.record(Operation::Update, table, filter, Some(patch))?;
        let fields = match patch {
            Value::Object(fields) => fields,
            _ => {
                return Err(Error::Api {
                    status: 400,
                    code: "PGRST102".to_string(),
                    message: "patch body must be an object".to_string(),
                });
            }
        };

        if let Some(rows) = self.tables.lock().get_mut(table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                if let Value::Object(existing) = row {
                    for (k, v) in fields {
                        existing.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        self.record(Operation::Delete, table, filter, None)?;
        if let Some(rows) = self.tables.lock().get_mut(table) {
            rows.retain(|r| !filter.matches(r));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let endpoint = MemoryEndpoint::new();
        endpoint
            .insert("sessions", &json!({"sid": "a", "expire": 10}))
            .await
            .unwrap();

        let by_sid = Filter::new().eq("sid", "a");
        endpoint
            .update("sessions", &by_sid, &json!({"expire": 20}))
            .await
            .unwrap();

        let row = endpoint.read_one("sessions", &by_sid).await.unwrap().unwrap();
        assert_eq!(row["expire"], 20);

        endpoint.delete("sessions", &by_sid).await.unwrap();
        assert!(endpoint.read_one("sessions", &by_sid).await.unwrap().is_none());
        assert_eq!(endpoint.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_unique_column() {
        let endpoint = MemoryEndpoint::new().with_unique("sid");
        endpoint.insert("t", &json!({"sid": "a"})).await.unwrap();

        let err = endpoint.insert("t", &json!({"sid": "a"})).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(endpoint.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let endpoint = MemoryEndpoint::new();
        endpoint.fail_next(Operation::Delete, 503, "unavailable");

        let filter = Filter::new();
        assert!(endpoint.read_many("t", &filter).await.is_ok());
        assert!(endpoint.delete("t", &filter).await.is_err());
        assert!(endpoint.delete("t", &filter).await.is_ok());
        assert_eq!(endpoint.call_count(Operation::Delete), 2);
    }
}
