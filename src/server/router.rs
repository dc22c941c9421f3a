//! Route table of the REST exposure

use super::handlers::{
    AppState, add_note, create_order, get_board, get_order, health_check, list_advisor_clients,
    list_advisors, list_orders, list_transitions, search_products, transition_order,
    weekly_report, weekly_report_html,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the board routes
///
/// - GET /health, GET /healthz - Liveness
/// - GET /orders, POST /orders - List (refreshing the board) and create
/// - GET /orders/{id} - One order with its available transitions
/// - GET|POST /orders/{id}/transitions - List or apply status changes
/// - POST /orders/{id}/notes - Add a note
/// - GET /board?grouped= - Kanban columns
/// - GET /reports/weekly/{week}, GET /reports/weekly/{week}/html - Weekly report
/// - GET /advisors, GET /advisors/{id}/clients, GET /products?q= - Catalog
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route(
            "/orders/{id}/transitions",
            get(list_transitions).post(transition_order),
        )
        .route("/orders/{id}/notes", post(add_note))
        .route("/board", get(get_board))
        .route("/reports/weekly/{week}", get(weekly_report))
        .route("/reports/weekly/{week}/html", get(weekly_report_html))
        .route("/advisors", get(list_advisors))
        .route("/advisors/{id}/clients", get(list_advisor_clients))
        .route("/products", get(search_products))
        .with_state(state)
}
