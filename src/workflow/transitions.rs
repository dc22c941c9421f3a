//! The fixed edge table of the order workflow

use serde::Serialize;

use crate::core::OrderStatus;

/// User-facing trigger of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SendToReview,
    Return,
    Invoice,
    Finalize,
}

/// One allowed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub action: Action,
    pub requires_reason: bool,
}

const fn edge(
    from: OrderStatus,
    to: OrderStatus,
    action: Action,
    requires_reason: bool,
) -> Transition {
    Transition {
        from,
        to,
        action,
        requires_reason,
    }
}

/// Every allowed edge; anything else is an invalid transition
pub static TRANSITIONS: [Transition; 5] = [
    edge(OrderStatus::Creado, OrderStatus::EnRevision, Action::SendToReview, false),
    edge(OrderStatus::EnRevision, OrderStatus::Creado, Action::Return, true),
    edge(OrderStatus::EnRevision, OrderStatus::Facturado, Action::Invoice, false),
    edge(OrderStatus::Facturado, OrderStatus::Creado, Action::Return, true),
    edge(OrderStatus::Facturado, OrderStatus::Finalizado, Action::Finalize, false),
];

/// Look up the edge `from → to`
pub fn find_transition(from: OrderStatus, to: OrderStatus) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.to == to)
}

/// Edges leaving `from`, in table order
pub fn available_transitions(from: OrderStatus) -> Vec<&'static Transition> {
    TRANSITIONS.iter().filter(|t| t.from == from).collect()
}
