//! Session context: the signed-in principal and its role
//!
//! A [`SessionContext`] is created once with [`SessionContext::init`] and
//! handed to whoever needs it. It listens to principal changes from the
//! identity service until [`SessionContext::teardown`] is called or the
//! context is dropped. The current [`SessionState`] is published on a
//! `watch` channel.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::error::{IdentityError, PedidosError};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{IdentityProvider, Principal, PrincipalEvent, Profile, Role};

/// Snapshot of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub principal: Option<Principal>,
    pub role: Role,
    /// True while the role of a new principal is being resolved
    pub loading: bool,
}

impl SessionState {
    fn signed_out(role: Role) -> Self {
        Self {
            principal: None,
            role,
            loading: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_some() && self.role.is_admin()
    }

    /// Fail unless an admin is signed in
    pub fn require_admin(&self, operation: &str) -> Result<(), IdentityError> {
        if self.principal.is_none() {
            return Err(IdentityError::Unauthenticated);
        }
        if !self.role.is_admin() {
            return Err(IdentityError::Forbidden {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

/// Settings the role resolver needs
#[derive(Debug, Clone, Copy)]
struct RoleLookup {
    timeout: Duration,
    default_role: Role,
}

impl RoleLookup {
    /// Role from `profiles`, or the default role when the lookup fails,
    /// finds no profile or does not answer within the timeout
    async fn resolve(&self, store: &dyn DataStore, principal_id: &Uuid) -> Role {
        let db = Tables::new(store);
        let lookup = db.get::<Profile>(tables::PROFILES, principal_id);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(profile)) => profile.role,
            Ok(Err(e)) => {
                tracing::warn!(
                    principal_id = %principal_id,
                    error = %e,
                    default_role = %self.default_role,
                    "Profile lookup failed, using default role"
                );
                self.default_role
            }
            Err(_) => {
                let e = IdentityError::LookupTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                tracing::warn!(
                    principal_id = %principal_id,
                    error = %e,
                    default_role = %self.default_role,
                    "Role lookup timed out, using default role"
                );
                self.default_role
            }
        }
    }

    async fn state_for(&self, store: &dyn DataStore, principal: Option<Principal>) -> SessionState {
        match principal {
            Some(principal) => SessionState {
                role: self.resolve(store, &principal.id).await,
                principal: Some(principal),
                loading: false,
            },
            None => SessionState::signed_out(self.default_role),
        }
    }
}

/// Session lifecycle owner
pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionState>>,
    listener: AbortHandle,
    default_role: Role,
}

impl SessionContext {
    /// Resolve the current principal and start following principal changes
    ///
    /// Never fails: an unreachable identity service yields a signed-out
    /// session and a slow role lookup yields the default role.
    pub async fn init(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DataStore>,
        config: &AppConfig,
    ) -> Self {
        let lookup = RoleLookup {
            timeout: config.role_lookup_timeout(),
            default_role: config.identity.default_role,
        };

        // Subscribe before reading so no change slips in between
        let events = identity.subscribe();

        let (sender, _) = watch::channel(SessionState {
            principal: None,
            role: lookup.default_role,
            loading: true,
        });
        let state = Arc::new(sender);

        let principal = match identity.current_principal().await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read current principal, starting signed out");
                None
            }
        };
        state.send_replace(lookup.state_for(store.as_ref(), principal).await);

        let listener = tokio::spawn(follow_principal(events, store, Arc::clone(&state), lookup));

        let initial = state.borrow().clone();
        tracing::debug!(
            signed_in = initial.principal.is_some(),
            role = %initial.role,
            "Session initialized"
        );

        Self {
            identity,
            state,
            listener: listener.abort_handle(),
            default_role: lookup.default_role,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().principal.clone()
    }

    /// Fail unless an admin is signed in
    pub fn require_admin(&self, operation: &str) -> Result<(), IdentityError> {
        self.state.borrow().require_admin(operation)
    }

    /// Sign out through the identity service and clear the session
    pub async fn sign_out(&self) -> Result<(), PedidosError> {
        self.identity
            .sign_out()
            .await
            .map_err(|e| PedidosError::persistence("auth", "sign_out", e))?;
        self.state.send_replace(SessionState::signed_out(self.default_role));
        tracing::info!("Signed out");
        Ok(())
    }

    /// Stop following principal changes
    pub fn teardown(&self) {
        self.listener.abort();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn follow_principal(
    mut events: broadcast::Receiver<PrincipalEvent>,
    store: Arc<dyn DataStore>,
    state: Arc<watch::Sender<SessionState>>,
    lookup: RoleLookup,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let principal = event.principal().cloned();
                if principal.is_some() {
                    state.send_modify(|s| s.loading = true);
                }
                let next = lookup.state_for(store.as_ref(), principal).await;
                tracing::debug!(
                    signed_in = next.principal.is_some(),
                    role = %next.role,
                    "Principal changed"
                );
                state.send_replace(next);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed principal change events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
