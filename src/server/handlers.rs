//! HTTP handlers for the order board
//!
//! Handlers are thin: they decode the request, call the library component
//! that owns the operation, merge any returned order into the shared
//! [`Board`] and encode the result. Every failure is a [`PedidosError`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::board::Board;
use crate::catalog::CatalogLookups;
use crate::composer::{OrderComposer, OrderDraft};
use crate::config::AppConfig;
use crate::core::error::{PedidosError, StorageError, ValidationError};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{
    Advisor, Channel, Client, Currency, LineItem, Order, OrderStatus, OrderType, Product,
};
use crate::reporting::{IsoWeek, ReportRenderer, ReportService, WeeklyReport};
use crate::session::SessionContext;
use crate::workflow::{Transition, WorkflowEngine, available_transitions};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DataStore>,
    /// The only in-memory order list; see [`Board`]
    pub board: Arc<RwLock<Board>>,
    pub engine: WorkflowEngine,
    pub composer: OrderComposer,
    pub catalog: CatalogLookups,
    pub reports: ReportService,
    pub renderer: Arc<dyn ReportRenderer>,
    pub session: Option<Arc<SessionContext>>,
}

impl AppState {
    fn user_id(&self) -> Option<Uuid> {
        self.session
            .as_ref()
            .and_then(|s| s.principal())
            .map(|p| p.id)
    }

    /// Admin-only routes are open when the server runs without a session
    fn require_admin(&self, operation: &str) -> Result<(), PedidosError> {
        match &self.session {
            Some(session) => Ok(session.require_admin(operation)?),
            None => Ok(()),
        }
    }

    /// Latest stored version of an order, merged into the board
    async fn load_order(&self, id: &Uuid) -> Result<Order, PedidosError> {
        let order: Order = Tables::new(self.store.as_ref())
            .get(tables::ORDERS, id)
            .await?;
        self.board.write().await.merge(order.clone());
        Ok(order)
    }
}

// =============================================================================
// Health
// =============================================================================

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pedidos-board"
    }))
}

// =============================================================================
// Orders
// =============================================================================

/// Request body for creating an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub advisor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// Request body for a status change
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to: OrderStatus,
    pub reason: Option<String>,
}

/// Request body for a note
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
    pub author: Option<String>,
}

/// Order together with the moves it currently allows
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub available_transitions: Vec<Transition>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let available_transitions = order
            .status
            .map(|s| available_transitions(s).into_iter().copied().collect())
            .unwrap_or_default();
        Self {
            order,
            available_transitions,
        }
    }
}

/// List orders, newest first, after a full refresh
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, PedidosError> {
    let mut board = state.board.write().await;
    board.refresh(state.store.as_ref()).await?;
    Ok(Json(board.orders().to_vec()))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, PedidosError> {
    let order = state.load_order(&id).await?;
    Ok(Json(order.into()))
}

/// Compose a draft from the request and submit it
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response, PedidosError> {
    let db = Tables::new(state.store.as_ref());
    let mut draft = OrderDraft::new();
    draft.order_type = request.order_type;
    draft.channel = request.channel;
    draft.currency = request.currency;
    draft.replace_line_items(request.items);

    if let Some(advisor_id) = request.advisor_id {
        let advisor: Advisor = db
            .get(tables::ADVISORS, &advisor_id)
            .await
            .map_err(|e| unknown_reference(e, "advisor_id"))?;
        draft.select_advisor(&advisor)?;
    }
    if let Some(client_id) = request.client_id {
        let client: Client = db
            .get(tables::CLIENTS, &client_id)
            .await
            .map_err(|e| unknown_reference(e, "client_id"))?;
        if draft.advisor().is_some() {
            draft.select_client(&client)?;
        }
    }

    let order = state.composer.submit(&draft, state.user_id()).await?;
    state.board.write().await.merge(order.clone());

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))).into_response())
}

fn unknown_reference(error: PedidosError, field: &str) -> PedidosError {
    match error {
        PedidosError::Storage(StorageError::NotFound { id, .. }) => ValidationError::Field {
            field: field.to_string(),
            message: format!("{} does not exist", id),
        }
        .into(),
        other => other,
    }
}

pub async fn list_transitions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transition>>, PedidosError> {
    let order = state.load_order(&id).await?;
    Ok(Json(OrderResponse::from(order).available_transitions))
}

pub async fn transition_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, PedidosError> {
    let order = state.load_order(&id).await?;
    let updated = state
        .engine
        .transition(&order, request.to, request.reason.as_deref())
        .await?;
    state.board.write().await.merge(updated.clone());
    Ok(Json(updated.into()))
}

pub async fn add_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<OrderResponse>, PedidosError> {
    let order = state.load_order(&id).await?;
    let updated = state
        .engine
        .add_note(&order, &request.content, request.author.as_deref())
        .await?;
    state.board.write().await.merge(updated.clone());
    Ok(Json(updated.into()))
}

// =============================================================================
// Board
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub grouped: bool,
}

pub async fn get_board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Value>, PedidosError> {
    let mut board = state.board.write().await;
    board.refresh(state.store.as_ref()).await?;

    let columns = if query.grouped {
        serde_json::to_value(board.grouped_columns())
    } else {
        serde_json::to_value(board.columns())
    }
    .map_err(|e| StorageError::Decode {
        table: tables::ORDERS.to_string(),
        message: e.to_string(),
    })?;

    Ok(Json(json!({
        "grouped": query.grouped,
        "columns": columns,
    })))
}

// =============================================================================
// Reports
// =============================================================================

pub async fn weekly_report(
    State(state): State<AppState>,
    Path(week): Path<String>,
) -> Result<Json<WeeklyReport>, PedidosError> {
    state.require_admin("weekly_report")?;
    let week = IsoWeek::parse(&week)?;
    Ok(Json(state.reports.weekly(week).await?))
}

pub async fn weekly_report_html(
    State(state): State<AppState>,
    Path(week): Path<String>,
) -> Result<Response, PedidosError> {
    state.require_admin("weekly_report")?;
    let week = IsoWeek::parse(&week)?;
    let report = state.reports.weekly(week).await?;
    let body = state.renderer.render(&report)?;
    Ok(([(header::CONTENT_TYPE, state.renderer.content_type())], body).into_response())
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn list_advisors(
    State(state): State<AppState>,
) -> Result<Json<Vec<Advisor>>, PedidosError> {
    Ok(Json(state.catalog.active_advisors().await?))
}

pub async fn list_advisor_clients(
    State(state): State<AppState>,
    Path(advisor_id): Path<Uuid>,
) -> Result<Json<Vec<Client>>, PedidosError> {
    Ok(Json(state.catalog.clients_for_advisor(&advisor_id).await?))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, PedidosError> {
    Ok(Json(state.catalog.search_products(&query.q).await?))
}
