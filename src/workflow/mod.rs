//! Order workflow engine
//!
//! Owns the status state machine, the status history and the notes of an
//! order. Every change is validated first, then written to the store as a
//! single update carrying the whole rewritten array; the caller only sees
//! the new order once that write succeeded.
//!
//! ```text
//!            send to review          approve/invoice           finalize
//!   Creado ──────────────────▶ En Revisión ─────────────▶ Facturado ─────────▶ Finalizado
//!      ▲                           │                          │
//!      └──────── return (reason) ──┴──────── return (reason) ─┘
//! ```

pub mod transitions;

pub use transitions::{Action, Transition, available_transitions, find_transition};

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::error::{PedidosError, WorkflowError};
use crate::core::store::{DataStore, Row, Tables, tables};
use crate::core::{Note, Order, OrderStatus, StatusChange};

/// Applies status transitions and notes to orders
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn DataStore>,
    author_label: String,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn DataStore>, config: &AppConfig) -> Self {
        Self {
            store,
            author_label: config.notes.author_label.clone(),
        }
    }

    /// Move an order to `to`
    ///
    /// Fails with `InvalidTransition` when the edge does not exist and with
    /// `MissingReason` when a return has no reason; in both cases nothing is
    /// written. On a failed write the given order is left untouched.
    pub async fn transition(
        &self,
        order: &Order,
        to: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order, PedidosError> {
        let (change, history) = plan_transition(order, to, reason)?;

        let mut patch = Row::new();
        patch.insert("status".to_string(), json!(to.label()));
        patch.insert("history".to_string(), json!(history));

        if let Err(e) = Tables::new(self.store.as_ref())
            .patch(tables::ORDERS, &order.id, patch)
            .await
        {
            tracing::warn!(
                order_id = %order.id,
                from = %change.from_status,
                to = %to,
                error = %e,
                "Status change was not persisted"
            );
            return Err(e);
        }

        tracing::info!(
            order_id = %order.id,
            from = %change.from_status,
            to = %to,
            "Order status changed"
        );

        let mut updated = order.clone();
        updated.status = Some(to);
        updated.history = history;
        Ok(updated)
    }

    /// Prepend a note to an order
    ///
    /// `author` falls back to the configured author label.
    pub async fn add_note(
        &self,
        order: &Order,
        content: &str,
        author: Option<&str>,
    ) -> Result<Order, PedidosError> {
        if content.trim().is_empty() {
            return Err(WorkflowError::EmptyNote.into());
        }

        let note = Note {
            content: content.to_string(),
            created_at: Utc::now(),
            author_label: author.unwrap_or(&self.author_label).to_string(),
        };

        let mut notes = Vec::with_capacity(order.notes.len() + 1);
        notes.push(note);
        notes.extend(order.notes.iter().cloned());

        let mut patch = Row::new();
        patch.insert("notes".to_string(), json!(notes));

        Tables::new(self.store.as_ref())
            .patch(tables::ORDERS, &order.id, patch)
            .await
            .inspect_err(|e| {
                tracing::warn!(order_id = %order.id, error = %e, "Note was not persisted");
            })?;

        tracing::debug!(order_id = %order.id, notes = notes.len(), "Note added");

        let mut updated = order.clone();
        updated.notes = notes;
        Ok(updated)
    }
}

/// Validate a transition and build the rewritten history without any I/O
///
/// Returns the new entry and the full history with that entry first.
pub fn plan_transition(
    order: &Order,
    to: OrderStatus,
    reason: Option<&str>,
) -> Result<(StatusChange, Vec<StatusChange>), WorkflowError> {
    let from = order.status;
    let edge = from
        .and_then(|from| find_transition(from, to))
        .ok_or(WorkflowError::InvalidTransition { from, to })?;

    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    if edge.requires_reason && reason.is_none() {
        return Err(WorkflowError::MissingReason { from: edge.from });
    }

    let change = StatusChange {
        to_status: to,
        from_status: edge.from,
        changed_at: Utc::now(),
        reason: reason.map(str::to_string),
    };

    let mut history = Vec::with_capacity(order.history.len() + 1);
    history.push(change.clone());
    history.extend(order.history.iter().cloned());

    Ok((change, history))
}
