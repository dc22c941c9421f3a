//! # Pedidos Board
//!
//! Order workflow core for a small-business order board: customer orders
//! are composed from line items, move through a fixed status workflow,
//! are shown on a kanban board and are rolled up into weekly reports.
//!
//! ## Features
//!
//! - **Order Composer**: drafts with line items, lenient numeric input and derived totals
//! - **Workflow Engine**: fixed state machine with an append-only status history and notes
//! - **Board Projection**: pure partition of orders into status columns, optionally grouped
//! - **Weekly Reports**: ISO-week windows, advisor/client rollups and top orders
//! - **Session**: principal and role resolution with a bounded role lookup
//! - **Pluggable Storage**: a generic `DataStore` seam with in-memory and PostgREST backends
//! - **REST Exposure**: optional axum server over all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pedidos::prelude::*;
//!
//! let store: Arc<dyn DataStore> = Arc::new(InMemoryDataStore::new());
//! let config = AppConfig::default();
//!
//! let mut draft = OrderDraft::new();
//! draft.select_advisor(&advisor)?;
//! draft.select_client(&client)?;
//! let row = draft.items()[0].draft_id;
//! draft.update_line_item(row, LineItemField::Description, "Funda");
//! draft.update_line_item(row, LineItemField::Quantity, "2");
//! draft.update_line_item(row, LineItemField::UnitCost, "5.00");
//!
//! let order = OrderComposer::new(store.clone()).submit(&draft, None).await?;
//!
//! let engine = WorkflowEngine::new(store.clone(), &config);
//! let order = engine.transition(&order, OrderStatus::EnRevision, None).await?;
//!
//! let mut board = Board::new();
//! board.merge(order);
//! ```

pub mod admin;
pub mod board;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod core;
pub mod migration;
pub mod reporting;
pub mod server;
pub mod session;
pub mod storage;
pub mod workflow;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Types ===
    pub use crate::core::{
        Advisor, AdvisorForm, AdvisorRef, Channel, Client, ClientForm, Currency, LineItem, Note,
        Order, OrderStatus, OrderType, Product, Profile, Role, StatusChange,
    };

    // === Collaborator Seams ===
    pub use crate::core::{
        DataStore, Filter, IdentityProvider, Principal, PrincipalEvent, Row, Sort, Tables, tables,
    };

    // === Selection Helpers ===
    pub use crate::core::{Mapper, SearchableSelect, SelectOption};

    // === Errors ===
    pub use crate::core::error::{
        ConfigError, DraftIssue, IdentityError, PedidosError, StorageError, ValidationError,
        WorkflowError,
    };

    // === Components ===
    pub use crate::admin::AdminService;
    pub use crate::board::{Board, project, project_grouped};
    pub use crate::catalog::CatalogLookups;
    pub use crate::composer::{LineItemField, OrderComposer, OrderDraft};
    pub use crate::config::AppConfig;
    pub use crate::migration::{backfill_advisor_refs, repair_mojibake};
    pub use crate::reporting::{
        HtmlReportRenderer, IsoWeek, ReportRenderer, ReportService, WeeklyReport,
    };
    pub use crate::session::{SessionContext, SessionState};
    pub use crate::workflow::{Action, Transition, WorkflowEngine, available_transitions};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::{InMemoryDataStore, InMemoryIdentityProvider};
    #[cfg(feature = "postgrest")]
    pub use crate::storage::PostgrestDataStore;

    // === External Re-exports ===
    pub use async_trait::async_trait;
    pub use rust_decimal::Decimal;
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
