//! Weekly sales reporting
//!
//! Everything here is read-only. [`WeeklyReport::build`] is a pure function
//! over the orders and advisors it is handed; [`ReportService`] only adds the
//! two store reads needed to feed it.

pub mod render;
pub mod week;

pub use render::{HtmlReportRenderer, ReportRenderer};
pub use week::{IsoWeek, WeekWindow};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::error::PedidosError;
use crate::core::mapper::normalize_for_search;
use crate::core::query::{Filter, Sort};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{Advisor, AdvisorRef, Currency, Order, OrderStatus};

/// Orders and revenue of one advisor in the window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorRollup {
    pub advisor_id: Option<Uuid>,
    pub name: String,
    pub order_count: usize,
    pub revenue_sum: Decimal,
}

/// Orders and revenue of one client in the window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRollup {
    pub name: String,
    pub order_count: usize,
    pub revenue_sum: Decimal,
    /// Advisor of the client's most recent order in the window
    pub last_advisor: String,
    #[serde(skip)]
    last_order_at: DateTime<Utc>,
}

/// Snapshot of one order for the top-orders list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub customer: String,
    pub advisor: String,
    pub total: Decimal,
    pub currency: Currency,
    pub status: Option<OrderStatus>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer: order.customer_name.clone(),
            advisor: order.advisor.name().to_string(),
            total: order.total,
            currency: order.currency,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// The three rollups of one ISO week
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub week: IsoWeek,
    pub timezone: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub order_count: usize,
    pub revenue_sum: Decimal,
    pub advisors: Vec<AdvisorRollup>,
    pub top_clients: Vec<ClientRollup>,
    pub top_orders: Vec<OrderSummary>,
}

impl WeeklyReport {
    /// Compute the report for `week` in `tz`
    ///
    /// Only orders whose `created_at` falls inside the week are counted.
    /// `advisors` fixes the tie order of the advisor ranking; every listed
    /// advisor appears even with no orders.
    pub fn build(
        week: IsoWeek,
        tz: Tz,
        orders: &[Order],
        advisors: &[Advisor],
        top_n: usize,
    ) -> Self {
        let window = week.window(tz);
        let in_window: Vec<&Order> = orders
            .iter()
            .filter(|o| window.contains(o.created_at))
            .collect();

        Self {
            week,
            timezone: tz.name().to_string(),
            window_start: window.start,
            window_end: window.end(),
            order_count: in_window.len(),
            revenue_sum: in_window.iter().map(|o| o.total).sum(),
            advisors: advisor_rollup(&in_window, advisors),
            top_clients: client_rollup(&in_window, top_n),
            top_orders: top_orders(&in_window, top_n),
        }
    }
}

/// Rank advisors by order count, ties in advisor-list order
///
/// Linked references match by id. Legacy text references match a listed
/// advisor by accent- and case-insensitive name, otherwise they get their
/// own row after the listed advisors.
pub fn advisor_rollup(orders: &[&Order], advisors: &[Advisor]) -> Vec<AdvisorRollup> {
    let mut rows: IndexMap<String, AdvisorRollup> = IndexMap::new();
    let mut by_name: HashMap<String, String> = HashMap::new();

    for advisor in advisors {
        let key = advisor.id.to_string();
        by_name
            .entry(normalize_for_search(&advisor.name))
            .or_insert_with(|| key.clone());
        rows.insert(
            key,
            AdvisorRollup {
                advisor_id: Some(advisor.id),
                name: advisor.name.clone(),
                order_count: 0,
                revenue_sum: Decimal::ZERO,
            },
        );
    }

    for order in orders {
        let key = match &order.advisor {
            AdvisorRef::Linked { id, .. } if rows.contains_key(&id.to_string()) => id.to_string(),
            other => by_name
                .get(&normalize_for_search(other.name()))
                .cloned()
                .unwrap_or_else(|| other.group_key()),
        };
        let row = rows.entry(key).or_insert_with(|| AdvisorRollup {
            advisor_id: order.advisor.id(),
            name: order.advisor.name().to_string(),
            order_count: 0,
            revenue_sum: Decimal::ZERO,
        });
        row.order_count += 1;
        row.revenue_sum += order.total;
    }

    let mut ranked: Vec<AdvisorRollup> = rows.into_values().collect();
    // Stable, so equal counts keep insertion order
    ranked.sort_by(|a, b| b.order_count.cmp(&a.order_count));
    ranked
}

/// The `top_n` clients by revenue, keyed by client display name
pub fn client_rollup(orders: &[&Order], top_n: usize) -> Vec<ClientRollup> {
    let mut rows: IndexMap<String, ClientRollup> = IndexMap::new();

    for order in orders {
        let row = rows
            .entry(order.customer_name.clone())
            .or_insert_with(|| ClientRollup {
                name: order.customer_name.clone(),
                order_count: 0,
                revenue_sum: Decimal::ZERO,
                last_advisor: order.advisor.name().to_string(),
                last_order_at: order.created_at,
            });
        row.order_count += 1;
        row.revenue_sum += order.total;
        if order.created_at > row.last_order_at {
            row.last_order_at = order.created_at;
            row.last_advisor = order.advisor.name().to_string();
        }
    }

    let mut ranked: Vec<ClientRollup> = rows.into_values().collect();
    ranked.sort_by(|a, b| b.revenue_sum.cmp(&a.revenue_sum));
    ranked.truncate(top_n);
    ranked
}

/// The `top_n` orders by total
pub fn top_orders(orders: &[&Order], top_n: usize) -> Vec<OrderSummary> {
    let mut ranked: Vec<&Order> = orders.to_vec();
    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked.into_iter().take(top_n).map(OrderSummary::from).collect()
}

/// Loads the data a weekly report needs and builds it
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn DataStore>,
    timezone: Tz,
    top_n: usize,
}

impl ReportService {
    pub fn new(store: Arc<dyn DataStore>, config: &AppConfig) -> Result<Self, PedidosError> {
        Ok(Self {
            store,
            timezone: config.report_timezone()?,
            top_n: config.reports.top_n,
        })
    }

    pub async fn weekly(&self, week: IsoWeek) -> Result<WeeklyReport, PedidosError> {
        let db = Tables::new(self.store.as_ref());
        let all = Filter::all();
        let by_name = Sort::asc("name");

        let (orders, advisors) = futures::try_join!(
            db.select_lenient::<Order>(tables::ORDERS, &all, None),
            db.select::<Advisor>(tables::ADVISORS, &all, Some(&by_name)),
        )?;

        let report = WeeklyReport::build(week, self.timezone, &orders, &advisors, self.top_n);
        tracing::debug!(
            week = %week,
            orders = report.order_count,
            advisors = report.advisors.len(),
            "Weekly report built"
        );
        Ok(report)
    }
}
