//! Typed error handling for the order board
//!
//! Every failure the core can produce is one of the categories below, so
//! callers can match on the exact condition instead of inspecting strings.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: draft or form input that cannot be submitted
//! - [`WorkflowError`]: status changes and notes rejected by the workflow rules
//! - [`StorageError`]: the external data store failed or returned bad rows
//! - [`IdentityError`]: session resolution and authorization failures
//! - [`ConfigError`]: configuration parsing and validation
//! - `Render`: the weekly report template failed
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.transition(&order, OrderStatus::Creado, None).await {
//!     Ok(updated) => board.merge(updated),
//!     Err(PedidosError::Workflow(WorkflowError::MissingReason { .. })) => {
//!         // ask the user for a reason and retry
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::order::OrderStatus;

/// Convenience alias used across the crate
pub type Result<T, E = PedidosError> = std::result::Result<T, E>;

/// The main error type for the crate
#[derive(Debug, Error)]
pub enum PedidosError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Report rendering failed: {0}")]
    Render(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PedidosError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PedidosError::Validation(_) => StatusCode::BAD_REQUEST,
            PedidosError::Workflow(e) => e.status_code(),
            PedidosError::Storage(e) => e.status_code(),
            PedidosError::Identity(e) => e.status_code(),
            PedidosError::Config(_) | PedidosError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PedidosError::Validation(_) => "VALIDATION_ERROR",
            PedidosError::Workflow(e) => e.error_code(),
            PedidosError::Storage(e) => e.error_code(),
            PedidosError::Identity(e) => e.error_code(),
            PedidosError::Config(_) => "CONFIG_ERROR",
            PedidosError::Render(_) => "RENDER_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Shorthand for a failed call to the external store
    pub fn persistence(table: &str, operation: &str, err: impl std::fmt::Display) -> Self {
        PedidosError::Storage(StorageError::Persistence {
            table: table.to_string(),
            operation: operation.to_string(),
            message: err.to_string(),
        })
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            PedidosError::Validation(ValidationError::Draft(issues)) => {
                Some(serde_json::json!({ "issues": issues }))
            }
            PedidosError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            PedidosError::Workflow(WorkflowError::InvalidTransition { from, to }) => {
                Some(serde_json::json!({
                    "from": from.map(|s| s.label()),
                    "to": to.label(),
                }))
            }
            PedidosError::Storage(StorageError::NotFound { table, id }) => {
                Some(serde_json::json!({ "table": table, "id": id.to_string() }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for PedidosError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A condition an order draft failed to meet at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftIssue {
    MissingAdvisor,
    MissingClient,
    MissingItems,
}

impl std::fmt::Display for DraftIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftIssue::MissingAdvisor => write!(f, "an advisor must be selected"),
            DraftIssue::MissingClient => write!(f, "a client must be selected"),
            DraftIssue::MissingItems => {
                write!(f, "at least one item needs a description")
            }
        }
    }
}

/// Field-level validation failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The draft is not ready to submit; every unmet condition is listed
    #[error("Order draft is incomplete: {}", join_issues(.0))]
    Draft(Vec<DraftIssue>),

    /// Single field validation error
    #[error("Validation failed for field '{field}': {message}")]
    Field { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation failed for {} field(s)", .0.len())]
    FieldErrors(Vec<FieldError>),
}

fn join_issues(issues: &[DraftIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

// =============================================================================
// Workflow Errors
// =============================================================================

/// Errors raised by the order workflow rules
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested status change is not an edge of the workflow
    #[error("Cannot move order from {} to {}", .from.map(|s| s.label()).unwrap_or("<unknown>"), .to.label())]
    InvalidTransition {
        from: Option<OrderStatus>,
        to: OrderStatus,
    },

    /// Returning an order to `Creado` needs a reason
    #[error("Returning an order from {} requires a reason", .from.label())]
    MissingReason { from: OrderStatus },

    /// Note content was empty or whitespace only
    #[error("Note content cannot be empty")]
    EmptyNote,
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
            WorkflowError::MissingReason { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::EmptyNote => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::InvalidTransition { .. } => "INVALID_TRANSITION",
            WorkflowError::MissingReason { .. } => "MISSING_REASON",
            WorkflowError::EmptyNote => "EMPTY_NOTE",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to the external data store
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store call failed or returned an error payload
    #[error("Failed to {operation} {table}: {message}")]
    Persistence {
        table: String,
        operation: String,
        message: String,
    },

    /// No row with this id
    #[error("{table} row with id '{id}' not found")]
    NotFound { table: String, id: Uuid },

    /// A row came back in a shape the core cannot read
    #[error("Could not decode {table} row: {message}")]
    Decode { table: String, message: String },
}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Persistence { .. } => StatusCode::BAD_GATEWAY,
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Persistence { .. } => "PERSISTENCE_ERROR",
            StorageError::NotFound { .. } => "NOT_FOUND",
            StorageError::Decode { .. } => "DECODE_ERROR",
        }
    }
}

// =============================================================================
// Identity Errors
// =============================================================================

/// Errors related to the session and authorization
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Role lookup did not answer in time
    #[error("Role lookup timed out after {timeout_ms} ms")]
    LookupTimeout { timeout_ms: u64 },

    /// No signed-in principal
    #[error("Not authenticated")]
    Unauthenticated,

    /// Principal lacks the role needed for the operation
    #[error("Operation '{operation}' requires the admin role")]
    Forbidden { operation: String },
}

impl IdentityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::LookupTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            IdentityError::Unauthenticated => StatusCode::UNAUTHORIZED,
            IdentityError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityError::LookupTimeout { .. } => "LOOKUP_TIMEOUT",
            IdentityError::Unauthenticated => "UNAUTHENTICATED",
            IdentityError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error reading '{path}': {message}")]
    IoError { path: String, message: String },
}
