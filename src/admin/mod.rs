//! Administration of reference data, users and orders
//!
//! Every operation requires a signed-in admin. Forms are validated before
//! the store is called.

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{PedidosError, StorageError, ValidationError};
use crate::core::query::{Filter, Sort};
use crate::core::store::{DataStore, Row, Tables, tables};
use crate::core::{Advisor, AdvisorForm, Client, ClientForm, Profile, Role};
use crate::session::SessionContext;

/// Admin-only operations
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn DataStore>,
    session: Arc<SessionContext>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DataStore>, session: Arc<SessionContext>) -> Self {
        Self { store, session }
    }

    fn tables(&self) -> Tables<'_> {
        Tables::new(self.store.as_ref())
    }

    fn guard(&self, operation: &str) -> Result<(), PedidosError> {
        self.session.require_admin(operation).map_err(|e| {
            tracing::warn!(operation, error = %e, "Admin operation refused");
            PedidosError::from(e)
        })
    }

    // ---------------------------------------------------------------------
    // Advisors
    // ---------------------------------------------------------------------

    /// Every advisor, active or not, by name
    pub async fn list_advisors(&self) -> Result<Vec<Advisor>, PedidosError> {
        self.guard("list_advisors")?;
        self.tables()
            .select(tables::ADVISORS, &Filter::all(), Some(&Sort::asc("name")))
            .await
    }

    pub async fn create_advisor(&self, form: AdvisorForm) -> Result<Advisor, PedidosError> {
        self.guard("create_advisor")?;
        form.validate().map_err(ValidationError::from)?;

        let advisor = Advisor {
            id: Uuid::new_v4(),
            name: required("name", &form.name)?,
            active: form.active,
        };
        let stored = self.tables().insert(tables::ADVISORS, &advisor).await?;
        tracing::info!(advisor_id = %stored.id, name = %stored.name, "Advisor created");
        Ok(stored)
    }

    pub async fn update_advisor(
        &self,
        id: &Uuid,
        form: AdvisorForm,
    ) -> Result<Advisor, PedidosError> {
        self.guard("update_advisor")?;
        form.validate().map_err(ValidationError::from)?;

        let mut patch = Row::new();
        patch.insert("name".to_string(), json!(required("name", &form.name)?));
        patch.insert("active".to_string(), json!(form.active));
        let updated: Advisor = self.tables().update(tables::ADVISORS, id, patch).await?;
        tracing::info!(advisor_id = %id, "Advisor updated");
        Ok(updated)
    }

    /// Advisors are deactivated rather than deleted so existing orders keep
    /// a valid reference
    pub async fn set_advisor_active(
        &self,
        id: &Uuid,
        active: bool,
    ) -> Result<Advisor, PedidosError> {
        self.guard("set_advisor_active")?;

        let mut patch = Row::new();
        patch.insert("active".to_string(), json!(active));
        let updated: Advisor = self.tables().update(tables::ADVISORS, id, patch).await?;
        tracing::info!(advisor_id = %id, active, "Advisor activation changed");
        Ok(updated)
    }

    // ---------------------------------------------------------------------
    // Clients
    // ---------------------------------------------------------------------

    /// Clients by name, optionally only those of one advisor
    pub async fn list_clients(
        &self,
        advisor_id: Option<&Uuid>,
    ) -> Result<Vec<Client>, PedidosError> {
        self.guard("list_clients")?;
        let filter = match advisor_id {
            Some(id) => Filter::all().eq("advisor_id", id.to_string()),
            None => Filter::all(),
        };
        self.tables()
            .select(tables::CLIENTS, &filter, Some(&Sort::asc("client_name")))
            .await
    }

    pub async fn create_client(&self, form: ClientForm) -> Result<Client, PedidosError> {
        self.guard("create_client")?;
        let client = self.client_from_form(Uuid::new_v4(), form).await?;
        let stored = self.tables().insert(tables::CLIENTS, &client).await?;
        tracing::info!(client_id = %stored.id, advisor_id = %stored.advisor_id, "Client created");
        Ok(stored)
    }

    pub async fn update_client(&self, id: &Uuid, form: ClientForm) -> Result<Client, PedidosError> {
        self.guard("update_client")?;
        let client = self.client_from_form(*id, form).await?;

        let mut patch = crate::core::store::encode(tables::CLIENTS, &client)?;
        patch.remove("id");
        // Cleared optional fields must be written as null, not skipped
        for column in ["business_name", "rif_cedula", "phone", "address"] {
            patch.entry(column.to_string()).or_insert(serde_json::Value::Null);
        }
        let updated: Client = self.tables().update(tables::CLIENTS, id, patch).await?;
        tracing::info!(client_id = %id, "Client updated");
        Ok(updated)
    }

    pub async fn delete_client(&self, id: &Uuid) -> Result<(), PedidosError> {
        self.guard("delete_client")?;
        self.tables().delete(tables::CLIENTS, id).await?;
        tracing::info!(client_id = %id, "Client deleted");
        Ok(())
    }

    async fn client_from_form(&self, id: Uuid, form: ClientForm) -> Result<Client, PedidosError> {
        form.validate().map_err(ValidationError::from)?;
        let display_name = required("client_name", &form.client_name)?;

        match self
            .tables()
            .get::<Advisor>(tables::ADVISORS, &form.advisor_id)
            .await
        {
            Ok(_) => {}
            Err(PedidosError::Storage(StorageError::NotFound { .. })) => {
                return Err(ValidationError::Field {
                    field: "advisor_id".to_string(),
                    message: format!("advisor {} does not exist", form.advisor_id),
                }
                .into());
            }
            Err(e) => return Err(e),
        }

        Ok(Client {
            id,
            advisor_id: form.advisor_id,
            display_name,
            business_name: optional(form.business_name),
            tax_id: optional(form.rif_cedula),
            phone: optional(form.phone),
            address: optional(form.address),
        })
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    /// Profiles, newest first
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, PedidosError> {
        self.guard("list_profiles")?;
        self.tables()
            .select(tables::PROFILES, &Filter::all(), Some(&Sort::desc("created_at")))
            .await
    }

    pub async fn set_role(&self, profile_id: &Uuid, role: Role) -> Result<Profile, PedidosError> {
        self.guard("set_role")?;

        let mut patch = Row::new();
        patch.insert("role".to_string(), json!(role));
        let updated: Profile = self.tables().update(tables::PROFILES, profile_id, patch).await?;
        tracing::info!(profile_id = %profile_id, role = %role, "Role changed");
        Ok(updated)
    }

    // ---------------------------------------------------------------------
    // Orders
    // ---------------------------------------------------------------------

    /// Hard delete, outside the workflow
    pub async fn delete_order(&self, order_id: &Uuid) -> Result<(), PedidosError> {
        self.guard("delete_order")?;
        self.tables().delete(tables::ORDERS, order_id).await?;
        tracing::warn!(order_id = %order_id, "Order deleted");
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Field {
            field: field.to_string(),
            message: "cannot be blank".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
