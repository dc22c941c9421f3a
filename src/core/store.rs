//! The generic relational data interface the core is built on
//!
//! The order board never talks to a database directly. Every read and write
//! goes through a [`DataStore`], which exposes the four operations of a
//! PostgREST-style service over JSON rows. Typed access for each table lives
//! in [`Tables`].

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::error::{PedidosError, StorageError};
use crate::core::query::{Filter, Sort};

/// A row as exchanged with the store
pub type Row = Map<String, Value>;

/// Logical table names
pub mod tables {
    pub const ORDERS: &str = "pedidos";
    pub const ADVISORS: &str = "asesoras";
    pub const CLIENTS: &str = "clientes";
    pub const PROFILES: &str = "profiles";
    pub const PRODUCTS: &str = "products";
}

/// Generic query/mutation interface of the external data service
///
/// Implementations decide how rows are persisted; the core only relies on
/// `update` applying the whole patch in one request.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Select rows matching the filter, optionally sorted
    async fn select(&self, table: &str, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Row>>;

    /// Insert rows and return them as stored
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Merge `patch` into the row with this id and return the updated rows
    async fn update(&self, table: &str, id: &Uuid, patch: Row) -> Result<Vec<Row>>;

    /// Delete the row with this id
    async fn delete(&self, table: &str, id: &Uuid) -> Result<()>;
}

/// Typed helpers over a [`DataStore`]
///
/// Converts collaborator failures into [`StorageError`] and rows into
/// domain types, so callers only ever see [`PedidosError`].
pub struct Tables<'a> {
    store: &'a dyn DataStore,
}

impl<'a> Tables<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// Select and decode every matching row; a row that fails to decode
    /// fails the whole call
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<T>, PedidosError> {
        let rows = self.select_rows(table, filter, sort).await?;
        rows.into_iter().map(|row| decode(table, row)).collect()
    }

    /// Select and decode, skipping rows that cannot be decoded
    pub async fn select_lenient<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<T>, PedidosError> {
        let rows = self.select_rows(table, filter, sort).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match decode::<T>(table, row) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(table, error = %e, "Skipping malformed row");
                    None
                }
            })
            .collect())
    }

    /// Select rows as stored, without decoding
    pub async fn select_rows(
        &self,
        table: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Row>, PedidosError> {
        self.store
            .select(table, filter, sort)
            .await
            .map_err(|e| PedidosError::persistence(table, "select", e))
    }

    /// Fetch one row by id
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &Uuid,
    ) -> Result<T, PedidosError> {
        let filter = Filter::all().eq("id", id.to_string()).limit(1);
        self.select::<T>(table, &filter, None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StorageError::NotFound {
                    table: table.to_string(),
                    id: *id,
                }
                .into()
            })
    }

    /// Insert one value and decode the stored row
    pub async fn insert<T: Serialize + DeserializeOwned>(
        &self,
        table: &str,
        value: &T,
    ) -> Result<T, PedidosError> {
        let row = encode(table, value)?;
        let stored = self
            .store
            .insert(table, vec![row])
            .await
            .map_err(|e| PedidosError::persistence(table, "insert", e))?;
        first(table, stored)
    }

    /// Apply a patch and decode the updated row
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &Uuid,
        patch: Row,
    ) -> Result<T, PedidosError> {
        let stored = self
            .store
            .update(table, id, patch)
            .await
            .map_err(|e| PedidosError::persistence(table, "update", e))?;
        if stored.is_empty() {
            return Err(StorageError::NotFound {
                table: table.to_string(),
                id: *id,
            }
            .into());
        }
        first(table, stored)
    }

    /// Apply a patch without decoding the result
    pub async fn patch(&self, table: &str, id: &Uuid, patch: Row) -> Result<(), PedidosError> {
        let stored = self
            .store
            .update(table, id, patch)
            .await
            .map_err(|e| PedidosError::persistence(table, "update", e))?;
        if stored.is_empty() {
            return Err(StorageError::NotFound {
                table: table.to_string(),
                id: *id,
            }
            .into());
        }
        Ok(())
    }

    pub async fn delete(&self, table: &str, id: &Uuid) -> Result<(), PedidosError> {
        self.store
            .delete(table, id)
            .await
            .map_err(|e| PedidosError::persistence(table, "delete", e))
    }
}

/// Serialize a value into a row
pub fn encode<T: Serialize>(table: &str, value: &T) -> Result<Row, PedidosError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StorageError::Decode {
            table: table.to_string(),
            message: format!("expected an object, got {}", other),
        }
        .into()),
        Err(e) => Err(StorageError::Decode {
            table: table.to_string(),
            message: e.to_string(),
        }
        .into()),
    }
}

/// Deserialize a row into a value
pub fn decode<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, PedidosError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        StorageError::Decode {
            table: table.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn first<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<T, PedidosError> {
    let row = rows.into_iter().next().ok_or_else(|| StorageError::Decode {
        table: table.to_string(),
        message: "store returned no rows".to_string(),
    })?;
    decode(table, row)
}
