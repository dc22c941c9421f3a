//! Order composer: builds a draft order and submits it
//!
//! A draft always holds at least one line item row. Totals are recomputed
//! from the rows on every read, so there is no stored total that could
//! drift from the items.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{DraftIssue, PedidosError, ValidationError};
use crate::core::order::{compute_total, parse_amount, parse_quantity};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{
    Advisor, AdvisorRef, Channel, Client, Currency, LineItem, Order, OrderStatus, OrderType,
};

/// Draft-local identifier of a line item row
pub type DraftItemId = u64;

/// A line item row being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLineItem {
    pub draft_id: DraftItemId,
    #[serde(flatten)]
    pub item: LineItem,
}

/// Editable field of a line item row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemField {
    Description,
    Characteristics,
    Quantity,
    UnitCost,
}

/// The selected advisor, as shown in the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAdvisor {
    pub id: Uuid,
    pub name: String,
}

/// The selected client, as shown in the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedClient {
    pub id: Uuid,
    pub advisor_id: Uuid,
    pub name: String,
}

/// An order being composed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    advisor: Option<SelectedAdvisor>,
    client: Option<SelectedClient>,
    items: Vec<DraftLineItem>,
    pub channel: Channel,
    pub currency: Currency,
    pub order_type: OrderType,
    next_item_id: DraftItemId,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderDraft {
    /// Empty draft with one blank row
    pub fn new() -> Self {
        let mut draft = Self {
            advisor: None,
            client: None,
            items: Vec::new(),
            channel: Channel::Other,
            currency: Currency::Usd,
            order_type: OrderType::Accessories,
            next_item_id: 1,
        };
        draft.add_line_item();
        draft
    }

    /// Back to the state of [`OrderDraft::new`]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn advisor(&self) -> Option<&SelectedAdvisor> {
        self.advisor.as_ref()
    }

    pub fn client(&self) -> Option<&SelectedClient> {
        self.client.as_ref()
    }

    pub fn items(&self) -> &[DraftLineItem] {
        &self.items
    }

    /// Choose the advisor; a client of a different advisor is cleared
    ///
    /// Inactive advisors cannot take new orders and leave the draft as it was.
    pub fn select_advisor(&mut self, advisor: &Advisor) -> Result<(), ValidationError> {
        if !advisor.active {
            return Err(ValidationError::Field {
                field: "advisor".to_string(),
                message: format!("advisor '{}' is inactive", advisor.name),
            });
        }
        if self
            .client
            .as_ref()
            .is_some_and(|c| c.advisor_id != advisor.id)
        {
            self.client = None;
        }
        self.advisor = Some(SelectedAdvisor {
            id: advisor.id,
            name: advisor.name.clone(),
        });
        Ok(())
    }

    /// Choose the client; it must belong to the selected advisor
    pub fn select_client(&mut self, client: &Client) -> Result<(), ValidationError> {
        let Some(advisor) = &self.advisor else {
            return Err(ValidationError::Draft(vec![DraftIssue::MissingAdvisor]));
        };
        if client.advisor_id != advisor.id {
            return Err(ValidationError::Field {
                field: "client".to_string(),
                message: format!(
                    "client '{}' does not belong to advisor '{}'",
                    client.display_name, advisor.name
                ),
            });
        }
        self.client = Some(SelectedClient {
            id: client.id,
            advisor_id: client.advisor_id,
            name: client.display_name.clone(),
        });
        Ok(())
    }

    /// Append a blank row (`quantity = 1`, `unitCost = 0`) and return its id
    pub fn add_line_item(&mut self) -> DraftItemId {
        let draft_id = self.next_item_id;
        self.next_item_id += 1;
        self.items.push(DraftLineItem {
            draft_id,
            item: LineItem::new("", 1, Decimal::ZERO),
        });
        draft_id
    }

    /// Replace every row with `items`; an empty list leaves one blank row
    pub fn replace_line_items(&mut self, items: Vec<LineItem>) {
        self.items.clear();
        for item in items {
            let draft_id = self.next_item_id;
            self.next_item_id += 1;
            self.items.push(DraftLineItem { draft_id, item });
        }
        if self.items.is_empty() {
            self.add_line_item();
        }
    }

    /// Remove a row; returns false when it is the last row or unknown
    pub fn remove_line_item(&mut self, draft_id: DraftItemId) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|row| row.draft_id != draft_id);
        self.items.len() != before
    }

    /// Set one field of a row from raw input
    ///
    /// Quantity and unit cost are parsed leniently: invalid input becomes 0
    /// and negative input is clamped to 0. Returns false for an unknown row.
    pub fn update_line_item(
        &mut self,
        draft_id: DraftItemId,
        field: LineItemField,
        value: &str,
    ) -> bool {
        let Some(row) = self.items.iter_mut().find(|row| row.draft_id == draft_id) else {
            return false;
        };
        match field {
            LineItemField::Description => row.item.description = value.to_string(),
            LineItemField::Characteristics => {
                row.item.characteristics = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            LineItemField::Quantity => row.item.quantity = parse_quantity(value),
            LineItemField::UnitCost => row.item.unit_cost = parse_amount(value),
        }
        true
    }

    /// Sum of the subtotals of every row
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|row| row.item.subtotal()).sum()
    }

    /// Every unmet submission condition, in a fixed order
    pub fn issues(&self) -> Vec<DraftIssue> {
        let mut issues = Vec::new();
        if self.advisor.is_none() {
            issues.push(DraftIssue::MissingAdvisor);
        }
        if self.client.is_none() {
            issues.push(DraftIssue::MissingClient);
        }
        if !self.items.iter().any(|row| row.item.is_described()) {
            issues.push(DraftIssue::MissingItems);
        }
        issues
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Draft(issues))
        }
    }

    /// Build the order to insert: described rows only, total recomputed,
    /// status `Creado` and empty history and notes
    pub fn to_order(&self, user_id: Option<Uuid>) -> Result<Order, ValidationError> {
        self.validate()?;
        let (Some(advisor), Some(client)) = (&self.advisor, &self.client) else {
            return Err(ValidationError::Draft(self.issues()));
        };

        let items: Vec<LineItem> = self
            .items
            .iter()
            .filter(|row| row.item.is_described())
            .map(|row| row.item.clone())
            .collect();

        Ok(Order {
            id: Uuid::new_v4(),
            advisor: AdvisorRef::Linked {
                id: advisor.id,
                name: advisor.name.clone(),
            },
            client_id: Some(client.id),
            customer_name: client.name.clone(),
            total: compute_total(&items),
            items,
            order_type: self.order_type,
            channel: self.channel,
            currency: self.currency,
            status: Some(OrderStatus::Creado),
            history: Vec::new(),
            notes: Vec::new(),
            user_id,
            created_at: Utc::now(),
        })
    }
}

/// Submits drafts to the store
#[derive(Clone)]
pub struct OrderComposer {
    store: Arc<dyn DataStore>,
}

impl OrderComposer {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Validate and create the order
    ///
    /// The draft is only borrowed: on any failure it is exactly as it was,
    /// and on success the caller decides when to reset it.
    pub async fn submit(
        &self,
        draft: &OrderDraft,
        user_id: Option<Uuid>,
    ) -> Result<Order, PedidosError> {
        let order = draft.to_order(user_id)?;

        let created: Order = Tables::new(self.store.as_ref())
            .insert(tables::ORDERS, &order)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Order creation failed"))?;

        tracing::info!(
            order_id = %created.id,
            advisor = created.advisor.name(),
            items = created.items.len(),
            total = %created.total,
            "Order created"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor(name: &str) -> Advisor {
        Advisor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active: true,
        }
    }

    fn client_of(advisor: &Advisor, name: &str) -> Client {
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

    #[test]
    fn test_new_draft_has_one_blank_row() {
        let draft = OrderDraft::new();
        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.items()[0].item.quantity, 1);
        assert_eq!(draft.items()[0].item.unit_cost, Decimal::ZERO);
        assert_eq!(draft.total(), Decimal::ZERO);
    }

    #[test]
    fn test_last_row_cannot_be_removed() {
        let mut draft = OrderDraft::new();
        let only = draft.items()[0].draft_id;
        assert!(!draft.remove_line_item(only));
        assert_eq!(draft.items().len(), 1);

        let second = draft.add_line_item();
        assert!(draft.remove_line_item(only));
        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.items()[0].draft_id, second);
    }

    #[test]
    fn test_draft_ids_are_fresh() {
        let mut draft = OrderDraft::new();
        let a = draft.add_line_item();
        draft.remove_line_item(a);
        let b = draft.add_line_item();
        assert_ne!(a, b);
    }

    #[test]
    fn test_total_follows_edits() {
        let mut draft = OrderDraft::new();
        let first = draft.items()[0].draft_id;
        draft.update_line_item(first, LineItemField::Quantity, "2");
        draft.update_line_item(first, LineItemField::UnitCost, "5.00");
        assert_eq!(draft.total(), Decimal::new(1000, 2));

        let second = draft.add_line_item();
        draft.update_line_item(second, LineItemField::UnitCost, "2.5");
        assert_eq!(draft.total(), Decimal::new(1250, 2));

        draft.update_line_item(second, LineItemField::Quantity, "lots");
        assert_eq!(draft.total(), Decimal::new(1000, 2));

        draft.update_line_item(first, LineItemField::UnitCost, "-3");
        assert_eq!(draft.total(), Decimal::ZERO);
    }

    #[test]
    fn test_issues_list_every_gap() {
        let draft = OrderDraft::new();
        assert_eq!(
            draft.issues(),
            vec![
                DraftIssue::MissingAdvisor,
                DraftIssue::MissingClient,
                DraftIssue::MissingItems
            ]
        );
    }

    #[test]
    fn test_client_requires_matching_advisor() {
        let ana = advisor("Ana");
        let bea = advisor("Bea");
        let mut draft = OrderDraft::new();

        assert!(draft.select_client(&client_of(&ana, "Sol")).is_err());

        draft.select_advisor(&ana).unwrap();
        assert!(draft.select_client(&client_of(&bea, "Luna")).is_err());
        draft.select_client(&client_of(&ana, "Sol")).unwrap();
        assert_eq!(draft.client().map(|c| c.name.as_str()), Some("Sol"));

        draft.select_advisor(&bea).unwrap();
        assert!(draft.client().is_none());
    }

    #[test]
    fn test_to_order_drops_blank_rows() {
        let ana = advisor("Ana");
        let mut draft = OrderDraft::new();
        draft.select_advisor(&ana).unwrap();
        draft.select_client(&client_of(&ana, "Sol")).unwrap();

        let first = draft.items()[0].draft_id;
        draft.update_line_item(first, LineItemField::Description, "Funda");
        draft.update_line_item(first, LineItemField::UnitCost, "4");
        let blank = draft.add_line_item();
        draft.update_line_item(blank, LineItemField::UnitCost, "100");

        let order = draft.to_order(None).unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, Decimal::new(4, 0));
        assert_eq!(order.status, Some(OrderStatus::Creado));
        assert!(order.history.is_empty() && order.notes.is_empty());
        assert_eq!(order.advisor.id(), Some(ana.id));
        assert_eq!(order.customer_name, "Sol");
    }
}
