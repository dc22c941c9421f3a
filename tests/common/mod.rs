//! Shared fixtures for the integration tests

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pedidos::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// Reference Data
// =============================================================================

pub fn advisor(name: &str) -> Advisor {
    Advisor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        active: true,
    }
}

pub fn client_of(advisor: &Advisor, name: &str) -> Client {
    Client {
        id: Uuid::new_v4(),
        advisor_id: advisor.id,
        display_name: name.to_string(),
        business_name: None,
        tax_id: None,
        phone: None,
        address: None,
    }
}

pub fn product(code: &str, description: &str) -> Product {
    Product {
        code: code.to_string(),
        description: description.to_string(),
    }
}

pub fn principal(email: &str) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

pub fn profile(principal: &Principal, role: Role) -> Profile {
    Profile {
        id: principal.id,
        role,
        cedula: None,
        first_name: None,
        last_name: None,
        email: Some(principal.email.clone()),
        created_at: Utc::now(),
    }
}

pub fn linked(advisor: &Advisor) -> AdvisorRef {
    AdvisorRef::Linked {
        id: advisor.id,
        name: advisor.name.clone(),
    }
}

/// An order as it would come back from the store
pub fn order(
    advisor: AdvisorRef,
    customer: &str,
    status: OrderStatus,
    total: i64,
    created_at: &str,
) -> Order {
    let items = vec![LineItem::new("Funda", 1, Decimal::from(total))];
    Order {
        id: Uuid::new_v4(),
        advisor,
        client_id: None,
        customer_name: customer.to_string(),
        total: Decimal::from(total),
        items,
        order_type: OrderType::Accessories,
        channel: Channel::WhatsApp,
        currency: Currency::Usd,
        status: Some(status),
        history: Vec::new(),
        notes: Vec::new(),
        user_id: None,
        created_at: at(created_at),
    }
}

pub fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().expect("valid RFC 3339 timestamp")
}

/// A ready-to-submit draft: advisor, client and one described row
pub fn filled_draft(advisor: &Advisor, client: &Client) -> OrderDraft {
    let mut draft = OrderDraft::new();
    draft.select_advisor(advisor).expect("advisor is active");
    draft.select_client(client).expect("client belongs to advisor");
    let row = draft.items()[0].draft_id;
    draft.update_line_item(row, LineItemField::Description, "A");
    draft.update_line_item(row, LineItemField::Quantity, "2");
    draft.update_line_item(row, LineItemField::UnitCost, "5.00");
    draft
}

// =============================================================================
// Seeded Store
// =============================================================================

pub struct Seeded {
    pub store: InMemoryDataStore,
    pub ana: Advisor,
    pub bea: Advisor,
    pub sol: Client,
    pub luna: Client,
}

/// Two advisors with one client each, plus a few products
pub fn seeded_store() -> Seeded {
    let store = InMemoryDataStore::new();
    let ana = advisor("Ana Duarte");
    let bea = advisor("Beatriz Ortiz");
    let sol = client_of(&ana, "Tienda Sol");
    let luna = client_of(&bea, "Kiosco Luna");

    store
        .seed(tables::ADVISORS, &[ana.clone(), bea.clone()])
        .expect("seed advisors");
    store
        .seed(tables::CLIENTS, &[sol.clone(), luna.clone()])
        .expect("seed clients");
    store
        .seed(
            tables::PRODUCTS,
            &[
                product("FUN-01", "Funda silicona"),
                product("CAB-01", "Cable USB-C"),
                product("PRO-01", "Protector de pantalla"),
            ],
        )
        .expect("seed products");

    Seeded {
        store,
        ana,
        bea,
        sol,
        luna,
    }
}

// =============================================================================
// Instrumented Stores
// =============================================================================

/// Wraps an in-memory store, counts every call and can fail on demand
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryDataStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub calls: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FlakyStore {
    pub fn wrapping(inner: InMemoryDataStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write_attempt(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for FlakyStore {
    async fn select(&self, table: &str, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("service unavailable"));
        }
        self.inner.select(table, filter, sort).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.write_attempt()?;
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, id: &Uuid, patch: Row) -> Result<Vec<Row>> {
        self.write_attempt()?;
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &Uuid) -> Result<()> {
        self.write_attempt()?;
        self.inner.delete(table, id).await
    }
}

/// Delays every select on one table
pub struct SlowStore {
    pub inner: InMemoryDataStore,
    pub table: &'static str,
    pub delay: Duration,
}

#[async_trait]
impl DataStore for SlowStore {
    async fn select(&self, table: &str, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Row>> {
        if table == self.table {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.select(table, filter, sort).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, id: &Uuid, patch: Row) -> Result<Vec<Row>> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &Uuid) -> Result<()> {
        self.inner.delete(table, id).await
    }
}

/// Wait until `check` holds, polling for up to a second
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
