//! Server module exposing the order board over HTTP
//!
//! This module provides a `ServerBuilder` that assembles the shared state
//! (store, session, workflow engine, composer, catalog and reports) and
//! registers the board routes on an axum `Router`.

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::AppState;
pub use router::build_routes;
