//! Order model: the `pedidos` row and its nested line items, history and notes
//!
//! Field names follow the column names of the `pedidos` table so an [`Order`]
//! can be read from and written to the data store without a mapping layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Position of an order in the fixed workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Creado")]
    Creado,
    #[serde(rename = "En Revisión")]
    EnRevision,
    #[serde(rename = "Facturado")]
    Facturado,
    #[serde(rename = "Finalizado")]
    Finalizado,
}

impl OrderStatus {
    /// All statuses in board column order
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Creado,
        OrderStatus::EnRevision,
        OrderStatus::Facturado,
        OrderStatus::Finalizado,
    ];

    /// The value stored in the `status` column
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Creado => "Creado",
            OrderStatus::EnRevision => "En Revisión",
            OrderStatus::Facturado => "Facturado",
            OrderStatus::Finalizado => "Finalizado",
        }
    }

    /// Parse a stored label; accepts the unaccented spelling too
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Creado" => Some(OrderStatus::Creado),
            "En Revisión" | "En Revision" => Some(OrderStatus::EnRevision),
            "Facturado" => Some(OrderStatus::Facturado),
            "Finalizado" => Some(OrderStatus::Finalizado),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::from_label(s).ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    #[serde(rename = "Accesorios")]
    Accessories,
    #[serde(rename = "Servicio Técnico")]
    TechnicalService,
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Accessories => "Accesorios",
            OrderType::TechnicalService => "Servicio Técnico",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "WhatsApp")]
    WhatsApp,
    #[serde(rename = "Instagram")]
    Instagram,
    #[serde(rename = "Presencial")]
    InPerson,
    #[default]
    #[serde(rename = "Otro")]
    Other,
}

/// Display label only; amounts are never converted between currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "COP")]
    Cop,
    #[serde(rename = "EUR")]
    Eur,
}

/// How an order points at its advisor
///
/// New orders always carry [`AdvisorRef::Linked`]. Rows written before
/// advisors had ids hold only the display name and decode as
/// [`AdvisorRef::Legacy`] until the back-fill migration links them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdvisorRef {
    Linked { id: Uuid, name: String },
    Legacy(String),
}

impl AdvisorRef {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            AdvisorRef::Linked { id, .. } => Some(*id),
            AdvisorRef::Legacy(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AdvisorRef::Linked { name, .. } => name,
            AdvisorRef::Legacy(name) => name,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, AdvisorRef::Legacy(_))
    }

    /// Key used to group orders by advisor; legacy names and linked ids
    /// never collide because ids are rendered as UUIDs
    pub fn group_key(&self) -> String {
        match self {
            AdvisorRef::Linked { id, .. } => id.to_string(),
            AdvisorRef::Legacy(name) => name.clone(),
        }
    }
}

/// One row of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<String>,

    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u32,

    #[serde(rename = "unitCost", default, deserialize_with = "lenient_amount")]
    pub unit_cost: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_cost: Decimal) -> Self {
        Self {
            description: description.into(),
            characteristics: None,
            quantity,
            unit_cost,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_cost
    }

    /// Only described items count toward submission
    pub fn is_described(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// Sum of `quantity × unitCost` over the items
pub fn compute_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::subtotal).sum()
}

/// Parse a quantity the way the order form does: invalid input is 0 and
/// negative input clamps to 0
pub fn parse_quantity(raw: &str) -> u32 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return n.clamp(0, u32::MAX as i64) as u32;
    }
    match Decimal::from_str(raw) {
        Ok(d) if d.is_sign_positive() => d.trunc().to_u32().unwrap_or(u32::MAX),
        _ => 0,
    }
}

/// Parse a unit cost: invalid input is 0 and negative input clamps to 0
pub fn parse_amount(raw: &str) -> Decimal {
    match Decimal::from_str(raw.trim()) {
        Ok(d) if d.is_sign_negative() => Decimal::ZERO,
        Ok(d) => d,
        Err(_) => Decimal::ZERO,
    }
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.clamp(0, u32::MAX as i64) as u32,
            (None, Some(f)) if f > 0.0 => f.trunc().min(u32::MAX as f64) as u32,
            _ => 0,
        },
        Value::String(s) => parse_quantity(&s),
        _ => 0,
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => parse_amount(&n.to_string()),
        Value::String(s) => parse_amount(&s),
        _ => Decimal::ZERO,
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(OrderStatus::from_label))
}

/// One entry of the status audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    #[serde(rename = "status")]
    pub to_status: OrderStatus,

    #[serde(rename = "previous_status")]
    pub from_status: OrderStatus,

    pub changed_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A free-text note attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "created_by")]
    pub author_label: String,
}

/// An order ("pedido")
///
/// `total` is always derived from `items`; `history` and `notes` are
/// append-only and kept newest first. The fields are public for reading,
/// but status and history only change through the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,

    #[serde(rename = "asesora")]
    pub advisor: AdvisorRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,

    /// Client display name, kept denormalized for older rows
    #[serde(rename = "customer", default)]
    pub customer_name: String,

    #[serde(default)]
    pub items: Vec<LineItem>,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub total: Decimal,

    #[serde(rename = "tipo_pedido", default)]
    pub order_type: OrderType,

    #[serde(rename = "canal", default)]
    pub channel: Channel,

    #[serde(rename = "moneda", default)]
    pub currency: Currency,

    /// `None` when the stored value is missing or not a known status
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<OrderStatus>,

    #[serde(default)]
    pub history: Vec<StatusChange>,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Number of line items, shown on the board cards
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// True when `total` matches the items it was derived from
    pub fn total_is_consistent(&self) -> bool {
        self.total == compute_total(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_labels_round_trip_through_serde() {
        for status in OrderStatus::ALL {
            let value = serde_json::to_value(status).unwrap();
            assert_eq!(value, json!(status.label()));
            assert_eq!(OrderStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(
            OrderStatus::from_label("En Revision"),
            Some(OrderStatus::EnRevision)
        );
        assert!("Cancelado".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_parse_quantity_clamps() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity(" 7 "), 7);
        assert_eq!(parse_quantity("-2"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("2.9"), 2);
    }

    #[test]
    fn test_parse_amount_clamps() {
        assert_eq!(parse_amount("12.50"), Decimal::new(1250, 2));
        assert_eq!(parse_amount("-1"), Decimal::ZERO);
        assert_eq!(parse_amount("twelve"), Decimal::ZERO);
    }

    #[test]
    fn test_line_item_decodes_strings_and_numbers() {
        let item: LineItem = serde_json::from_value(json!({
            "description": "Funda",
            "quantity": "2",
            "unitCost": 5.5
        }))
        .unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_cost, Decimal::new(55, 1));
        assert_eq!(item.subtotal(), Decimal::new(110, 1));

        let broken: LineItem = serde_json::from_value(json!({
            "description": "Cable",
            "quantity": "x",
            "unitCost": "-4"
        }))
        .unwrap();
        assert_eq!(broken.quantity, 0);
        assert_eq!(broken.unit_cost, Decimal::ZERO);
    }

    #[test]
    fn test_compute_total() {
        let items = vec![
            LineItem::new("A", 2, Decimal::new(500, 2)),
            LineItem::new("B", 1, Decimal::new(250, 2)),
        ];
        assert_eq!(compute_total(&items), Decimal::new(1250, 2));
        assert_eq!(compute_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_advisor_ref_shapes() {
        let id = Uuid::new_v4();
        let linked: AdvisorRef =
            serde_json::from_value(json!({"id": id, "name": "Brigith Ortiz"})).unwrap();
        assert_eq!(linked.id(), Some(id));
        assert_eq!(linked.name(), "Brigith Ortiz");

        let legacy: AdvisorRef = serde_json::from_value(json!("Dimayir Perez")).unwrap();
        assert!(legacy.is_legacy());
        assert_eq!(legacy.name(), "Dimayir Perez");
        assert_eq!(legacy.group_key(), "Dimayir Perez");
    }

    #[test]
    fn test_order_row_with_unknown_status_decodes() {
        let row = json!({
            "id": Uuid::new_v4(),
            "asesora": "Alexandra Duarte",
            "customer": "Tienda Sol",
            "items": [{"description": "Funda", "quantity": 1, "unitCost": 3}],
            "total": 3,
            "tipo_pedido": "Accesorios",
            "canal": "WhatsApp",
            "moneda": "USD",
            "status": "Archivado",
            "created_at": "2024-01-02T10:00:00Z"
        });
        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.status, None);
        assert!(order.history.is_empty());
        assert!(order.total_is_consistent());
    }

    #[test]
    fn test_history_entry_uses_stored_keys() {
        let change = StatusChange {
            to_status: OrderStatus::Creado,
            from_status: OrderStatus::Facturado,
            changed_at: Utc::now(),
            reason: Some("wrong price".to_string()),
        };
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["status"], "Creado");
        assert_eq!(value["previous_status"], "Facturado");
        assert_eq!(value["reason"], "wrong price");
    }
}
