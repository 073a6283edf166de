//! Row-level CRUD abstraction over a remote table.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::filter::Filter;

/// A tabular endpoint offering filtered CRUD.
///
/// Rows travel as JSON values so callers decide how to interpret them.
#[async_trait]
pub trait TableEndpoint: Send + Sync {
    /// Fetch at most one row matching the filter.
    ///
    /// Returns `Ok(None)` when no row matches.
    async fn read_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>>;

    /// Fetch every row matching the filter.
    async fn read_many(&self, table: &str, filter: &Filter) -> Result<Vec<Value>>;

    /// Insert a new row.
    async fn insert(&self, table: &str, row: &Value) -> Result<()>;

    /// Patch every row matching the filter with the fields in `patch`.
    async fn update(&self, table: &str, filter: &Filter, patch: &Value) -> Result<()>;

    /// Delete every row matching the filter. Matching nothing is not an error.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<()>;
}

#[async_trait]
impl<T: TableEndpoint + ?Sized> TableEndpoint for std::sync::Arc<T> {
    async fn read_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>> {
        (**self).read_one(table, filter).await
    }

    async fn read_many(&self, table: &str, filter: &Filter) -> Result<Vec<Value>> {
        (**self).read_many(table, filter).await
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<()> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Value) -> Result<()> {
        (**self).update(table, filter, patch).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        (**self).delete(table, filter).await
    }
}
