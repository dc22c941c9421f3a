//! PostgREST-backed implementation of the data store
//!
//! Speaks the REST dialect of PostgREST/Supabase: filters become query
//! parameters (`col=eq.value`, `or=(a.ilike.*x*,b.ilike.*x*)`), writes ask
//! for `return=representation` so the stored rows come back.

use crate::config::PostgrestConfig;
use crate::core::query::{Condition, Direction, Filter, Sort};
use crate::core::store::{DataStore, Row};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use uuid::Uuid;

/// Data store talking to a PostgREST endpoint
#[derive(Clone)]
pub struct PostgrestDataStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestDataStore {
    pub fn new(config: &PostgrestConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows(table: &str, operation: &str, response: Response) -> Result<Vec<Row>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(table, operation, %status, body = %body, "PostgREST request failed");
            return Err(anyhow!("{} {} failed with {}: {}", operation, table, status, body));
        }
        let rows: Vec<Row> = response.json().await.map_err(|e| {
            anyhow!("{} {} returned an unreadable body: {}", operation, table, e)
        })?;
        Ok(rows)
    }
}

/// Render a filter and sort as PostgREST query parameters
pub fn query_params(filter: &Filter, sort: Option<&Sort>) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for condition in &filter.conditions {
        match condition {
            Condition::Eq { column, value } => {
                params.push((column.clone(), format!("eq.{}", literal(value))));
            }
            Condition::ContainsAny { columns, needle } => {
                let needle: String = needle.chars().filter(|c| !"\",()".contains(*c)).collect();
                let alternatives: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{}.ilike.*{}*", column, needle))
                    .collect();
                params.push(("or".to_string(), format!("({})", alternatives.join(","))));
            }
        }
    }

    if let Some(sort) = sort {
        let direction = match sort.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", sort.column, direction)));
    }
    if let Some(limit) = filter.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DataStore for PostgrestDataStore {
    async fn select(&self, table: &str, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Row>> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query_params(filter, sort))
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
        Self::rows(table, "select", response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
        Self::rows(table, "insert", response).await
    }

    async fn update(&self, table: &str, id: &Uuid, patch: Row) -> Result<Vec<Row>> {
        let response = self
            .authorized(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
        Self::rows(table, "update", response).await
    }

    async fn delete(&self, table: &str, id: &Uuid) -> Result<()> {
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("delete {} failed with {}: {}", table, status, body));
        }
        Ok(())
    }
}
