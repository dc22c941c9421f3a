//! One-time batch repairs of legacy data
//!
//! These jobs are run by an operator, never on the read path. Both are
//! idempotent: rows that are already in canonical form are left alone, so a
//! run that stopped on a store failure can simply be repeated.

use serde::Serialize;
use serde_json::{Value, json};
use std::borrow::Cow;
use uuid::Uuid;

use crate::core::error::PedidosError;
use crate::core::mapper::normalize_for_search;
use crate::core::query::Filter;
use crate::core::store::{DataStore, Row, Tables, tables};
use crate::core::{Advisor, AdvisorRef, Client, Order};

/// A legacy order the back-fill could not link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlinkedOrder {
    pub order_id: Uuid,
    pub advisor_name: String,
}

/// Outcome of [`backfill_advisor_refs`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    /// Orders scanned, legacy or not
    pub scanned: usize,
    pub linked: Vec<Uuid>,
    /// No advisor has this name
    pub unmatched: Vec<UnlinkedOrder>,
    /// More than one advisor has this name
    pub ambiguous: Vec<UnlinkedOrder>,
}

/// Rewrite legacy text advisor references as `{id, name}`
///
/// A legacy name is linked only when exactly one advisor matches it
/// ignoring case and accents. Everything else is reported, not guessed.
pub async fn backfill_advisor_refs(store: &dyn DataStore) -> Result<BackfillReport, PedidosError> {
    let db = Tables::new(store);
    let orders: Vec<Order> = db.select_lenient(tables::ORDERS, &Filter::all(), None).await?;
    let advisors: Vec<Advisor> = db.select(tables::ADVISORS, &Filter::all(), None).await?;

    let mut report = BackfillReport {
        scanned: orders.len(),
        ..Default::default()
    };

    for order in &orders {
        let AdvisorRef::Legacy(name) = &order.advisor else {
            continue;
        };
        let wanted = normalize_for_search(name.trim());
        let matches: Vec<&Advisor> = advisors
            .iter()
            .filter(|a| normalize_for_search(a.name.trim()) == wanted)
            .collect();

        match matches.as_slice() {
            [advisor] => {
                let linked = AdvisorRef::Linked {
                    id: advisor.id,
                    name: advisor.name.clone(),
                };
                let mut patch = Row::new();
                patch.insert("asesora".to_string(), json!(linked));
                db.patch(tables::ORDERS, &order.id, patch).await?;
                tracing::debug!(
                    order_id = %order.id,
                    advisor_id = %advisor.id,
                    "Advisor reference linked"
                );
                report.linked.push(order.id);
            }
            [] => report.unmatched.push(UnlinkedOrder {
                order_id: order.id,
                advisor_name: name.clone(),
            }),
            _ => report.ambiguous.push(UnlinkedOrder {
                order_id: order.id,
                advisor_name: name.clone(),
            }),
        }
    }

    tracing::info!(
        scanned = report.scanned,
        linked = report.linked.len(),
        unmatched = report.unmatched.len(),
        ambiguous = report.ambiguous.len(),
        "Advisor reference back-fill finished"
    );
    Ok(report)
}

/// UTF-8 text that was decoded as Latin-1/Windows-1252 somewhere upstream,
/// mapped back to what it should have been
const MOJIBAKE: &[(&str, &str)] = &[
    ("Ã±", "ñ"),
    ("Ã‘", "Ñ"),
    ("Ã¡", "á"),
    ("Ã©", "é"),
    ("Ã\u{AD}", "í"),
    ("Ã³", "ó"),
    ("Ãº", "ú"),
    ("Ã\u{81}", "Á"),
    ("Ã\u{89}", "É"),
    ("Ã\u{8D}", "Í"),
    ("Ã\u{93}", "Ó"),
    ("Ã\u{9A}", "Ú"),
    ("Â¿", "¿"),
    ("Â¡", "¡"),
];

/// Apply the replacement table; borrows when nothing matched
pub fn repair_text(text: &str) -> Cow<'_, str> {
    let mut repaired = Cow::Borrowed(text);
    for (bad, good) in MOJIBAKE {
        if repaired.contains(bad) {
            repaired = Cow::Owned(repaired.replace(bad, good));
        }
    }
    repaired
}

fn repair_option(text: &Option<String>) -> Option<String> {
    text.as_deref().map(|t| repair_text(t).into_owned())
}

/// Text fields of a stored line item; every other key is written back as is
const ITEM_TEXT_FIELDS: &[&str] = &["description", "characteristics"];

fn repair_items(mut items: Value) -> (Value, bool) {
    let mut changed = false;
    if let Value::Array(entries) = &mut items {
        for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
            for field in ITEM_TEXT_FIELDS {
                if let Some(Value::String(text)) = entry.get_mut(*field) {
                    if let Cow::Owned(fixed) = repair_text(text) {
                        *text = fixed;
                        changed = true;
                    }
                }
            }
        }
    }
    (items, changed)
}

/// Outcome of [`repair_mojibake`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairReport {
    pub orders_repaired: usize,
    pub clients_repaired: usize,
}

/// Fix legacy mis-encoded text in orders and clients
///
/// Covers order customer names, line item descriptions and characteristics,
/// and client names, business names and addresses. Order rows are patched as
/// stored, so item keys and values outside those text fields are kept as
/// they are. Only rows that actually change are written.
pub async fn repair_mojibake(store: &dyn DataStore) -> Result<RepairReport, PedidosError> {
    let db = Tables::new(store);
    let mut report = RepairReport::default();

    let rows = db.select_rows(tables::ORDERS, &Filter::all(), None).await?;
    for mut row in rows {
        let id = row.get("id").and_then(Value::as_str).and_then(|s| s.parse::<Uuid>().ok());
        let Some(id) = id else {
            tracing::warn!(table = tables::ORDERS, "Skipping order row without a valid id");
            continue;
        };

        let mut patch = Row::new();
        if let Some(Value::String(customer)) = row.get("customer") {
            if let Cow::Owned(fixed) = repair_text(customer) {
                patch.insert("customer".to_string(), Value::String(fixed));
            }
        }
        if let Some(items) = row.remove("items") {
            let (items, changed) = repair_items(items);
            if changed {
                patch.insert("items".to_string(), items);
            }
        }

        if patch.is_empty() {
            continue;
        }
        db.patch(tables::ORDERS, &id, patch).await?;
        report.orders_repaired += 1;
    }

    let clients: Vec<Client> = db.select_lenient(tables::CLIENTS, &Filter::all(), None).await?;
    for client in &clients {
        let name = repair_text(&client.display_name);
        let business_name = repair_option(&client.business_name);
        let address = repair_option(&client.address);

        if name == client.display_name.as_str()
            && business_name == client.business_name
            && address == client.address
        {
            continue;
        }
        let mut patch = Row::new();
        patch.insert("client_name".to_string(), json!(name));
        patch.insert("business_name".to_string(), json!(business_name));
        patch.insert("address".to_string(), json!(address));
        db.patch(tables::CLIENTS, &client.id, patch).await?;
        report.clients_repaired += 1;
    }

    tracing::info!(
        orders = report.orders_repaired,
        clients = report.clients_repaired,
        "Mojibake repair finished"
    );
    Ok(report)
}
