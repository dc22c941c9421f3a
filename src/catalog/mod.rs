//! Read-only lookups used while composing an order

use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::error::PedidosError;
use crate::core::query::{Filter, Sort};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{Advisor, Client, Mapper, Product, SearchableSelect};

/// Catalog queries against the external store
#[derive(Clone)]
pub struct CatalogLookups {
    store: Arc<dyn DataStore>,
    product_search_limit: usize,
}

impl CatalogLookups {
    pub fn new(store: Arc<dyn DataStore>, config: &AppConfig) -> Self {
        Self {
            store,
            product_search_limit: config.catalog.product_search_limit,
        }
    }

    /// Advisors that can take new orders, by name
    pub async fn active_advisors(&self) -> Result<Vec<Advisor>, PedidosError> {
        Tables::new(self.store.as_ref())
            .select(
                tables::ADVISORS,
                &Filter::all().eq("active", true),
                Some(&Sort::asc("name")),
            )
            .await
    }

    /// Clients owned by one advisor, by name
    pub async fn clients_for_advisor(
        &self,
        advisor_id: &Uuid,
    ) -> Result<Vec<Client>, PedidosError> {
        Tables::new(self.store.as_ref())
            .select(
                tables::CLIENTS,
                &Filter::all().eq("advisor_id", advisor_id.to_string()),
                Some(&Sort::asc("client_name")),
            )
            .await
    }

    /// Products whose code or description contains `query`
    ///
    /// A blank query returns nothing without calling the store.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, PedidosError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::all()
            .contains_any(&["codigo", "prd_descripcion"], query)
            .limit(self.product_search_limit);
        Tables::new(self.store.as_ref())
            .select(tables::PRODUCTS, &filter, None)
            .await
    }

    /// Advisor picker over the active advisors
    pub async fn advisor_select(&self) -> Result<SearchableSelect<Advisor, Uuid>, PedidosError> {
        let advisors = self.active_advisors().await?;
        Ok(SearchableSelect::new(advisors, advisor_mapper()))
    }

    /// Client picker scoped to one advisor
    pub async fn client_select(
        &self,
        advisor_id: &Uuid,
    ) -> Result<SearchableSelect<Client, Uuid>, PedidosError> {
        let clients = self.clients_for_advisor(advisor_id).await?;
        Ok(SearchableSelect::new(clients, client_mapper()))
    }
}

pub fn advisor_mapper() -> Mapper<Advisor, Uuid> {
    Mapper::new(|a: &Advisor| a.name.clone(), |a: &Advisor| a.id)
}

/// Shows the business name next to the client name when there is one
pub fn client_mapper() -> Mapper<Client, Uuid> {
    Mapper::new(
        |c: &Client| match &c.business_name {
            Some(business) if !business.is_empty() => format!("{} ({})", c.display_name, business),
            _ => c.display_name.clone(),
        },
        |c: &Client| c.id,
    )
}

/// Products are picked by code
pub fn product_mapper() -> Mapper<Product, String> {
    Mapper::new(
        |p: &Product| format!("{} - {}", p.code, p.description),
        |p: &Product| p.code.clone(),
    )
}
