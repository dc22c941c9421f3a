//! In-memory implementations of the store and identity seams for testing
//! and development

use crate::core::query::{Filter, Sort};
use crate::core::store::{DataStore, Row, encode};
use crate::core::{IdentityProvider, Principal, PrincipalEvent};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

/// In-memory data store
///
/// Tables are created on first write. Rows keep insertion order, so an
/// unsorted select returns them in the order they were inserted. Uses
/// RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryDataStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl InMemoryDataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add values to a table as-is, without id or timestamp defaults
    pub fn seed<T: Serialize>(&self, table: &str, values: &[T]) -> Result<()> {
        let rows = values
            .iter()
            .map(|v| encode(table, v).map_err(|e| anyhow!("{}", e)))
            .collect::<Result<Vec<Row>>>()?;
        self.seed_rows(table, rows)
    }

    /// Add raw rows to a table, e.g. legacy shapes that no longer encode
    pub fn seed_rows(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    /// Number of rows in a table
    pub fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Raw row by id
    pub fn row(&self, table: &str, id: &Uuid) -> Option<Row> {
        let tables = self.tables.read().ok()?;
        let id = id.to_string();
        tables
            .get(table)?
            .iter()
            .find(|row| has_id(row, &id))
            .cloned()
    }
}

fn has_id(row: &Row, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn select(&self, table: &str, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = sort {
            rows.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let now = Value::String(Utc::now().to_rfc3339());
        let stored: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                row.entry("id")
                    .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                row.entry("created_at").or_insert_with(|| now.clone());
                row
            })
            .collect();

        tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());

        Ok(stored)
    }

    async fn update(&self, table: &str, id: &Uuid, patch: Row) -> Result<Vec<Row>> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = id.to_string();
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| has_id(row, &id)))
        else {
            return Ok(Vec::new());
        };

        for (column, value) in patch {
            row.insert(column, value);
        }
        Ok(vec![row.clone()])
    }

    async fn delete(&self, table: &str, id: &Uuid) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = id.to_string();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !has_id(row, &id));
        }
        Ok(())
    }
}

/// In-memory identity service
///
/// Holds at most one principal and broadcasts every change to subscribers.
#[derive(Clone)]
pub struct InMemoryIdentityProvider {
    current: Arc<RwLock<Option<Principal>>>,
    events: broadcast::Sender<PrincipalEvent>,
}

impl InMemoryIdentityProvider {
    /// Create a provider with nobody signed in
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            current: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Create a provider with `principal` already signed in
    pub fn signed_in(principal: Principal) -> Self {
        let provider = Self::new();
        if let Ok(mut current) = provider.current.write() {
            *current = Some(principal);
        }
        provider
    }

    /// Sign a principal in and notify subscribers
    pub fn sign_in(&self, principal: Principal) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        *current = Some(principal.clone());
        // No subscribers is fine
        let _ = self.events.send(PrincipalEvent::SignedIn(principal));
        Ok(())
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_principal(&self) -> Result<Option<Principal>> {
        let current = self
            .current
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(current.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<PrincipalEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        *current = None;
        let _ = self.events.send(PrincipalEvent::SignedOut);
        Ok(())
    }
}
