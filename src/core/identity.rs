//! Identity collaborator: who is signed in

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// The authenticated user as reported by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Change notification from the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalEvent {
    SignedIn(Principal),
    SignedOut,
}

impl PrincipalEvent {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            PrincipalEvent::SignedIn(p) => Some(p),
            PrincipalEvent::SignedOut => None,
        }
    }
}

/// External authentication service
///
/// `subscribe` plays the role of an `onPrincipalChange` callback
/// registration: dropping the receiver unsubscribes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self) -> Result<Option<Principal>>;

    fn subscribe(&self) -> broadcast::Receiver<PrincipalEvent>;

    async fn sign_out(&self) -> Result<()>;
}
