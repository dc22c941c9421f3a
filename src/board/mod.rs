//! Kanban board projection
//!
//! [`project`] and [`project_grouped`] are pure: they only arrange the
//! orders they are given. [`Board`] owns the order list the projections are
//! computed from and is the only place that list changes.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::error::PedidosError;
use crate::core::query::{Filter, Sort};
use crate::core::store::{DataStore, Tables, tables};
use crate::core::{Order, OrderStatus, OrderType};

/// One status column
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn<'a> {
    pub status: OrderStatus,
    pub count: usize,
    pub orders: Vec<&'a Order>,
}

/// Orders of one advisor inside a type group, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorGroup<'a> {
    pub advisor: String,
    pub orders: Vec<&'a Order>,
}

/// Orders of one type inside a status column
#[derive(Debug, Clone, Serialize)]
pub struct TypeGroup<'a> {
    pub order_type: OrderType,
    pub advisors: Vec<AdvisorGroup<'a>>,
}

/// A status column partitioned by order type, then advisor
#[derive(Debug, Clone, Serialize)]
pub struct GroupedColumn<'a> {
    pub status: OrderStatus,
    pub count: usize,
    pub groups: Vec<TypeGroup<'a>>,
}

/// Split orders into the four status columns, keeping input order
///
/// Orders without a recognized status appear in no column.
pub fn project(orders: &[Order]) -> Vec<BoardColumn<'_>> {
    OrderStatus::ALL
        .iter()
        .map(|&status| {
            let orders: Vec<&Order> = orders
                .iter()
                .filter(|o| o.status == Some(status))
                .collect();
            BoardColumn {
                status,
                count: orders.len(),
                orders,
            }
        })
        .collect()
}

/// Like [`project`], with each column split by order type and advisor
///
/// Type groups follow the order type declaration order, advisor groups
/// follow first appearance, and orders inside an advisor group are sorted
/// by ascending `created_at`.
pub fn project_grouped(orders: &[Order]) -> Vec<GroupedColumn<'_>> {
    project(orders)
        .into_iter()
        .map(|column| {
            let mut by_type: IndexMap<OrderType, IndexMap<String, AdvisorGroup<'_>>> =
                IndexMap::new();
            for order in &column.orders {
                by_type
                    .entry(order.order_type)
                    .or_default()
                    .entry(order.advisor.group_key())
                    .or_insert_with(|| AdvisorGroup {
                        advisor: order.advisor.name().to_string(),
                        orders: Vec::new(),
                    })
                    .orders
                    .push(order);
            }

            let mut groups: Vec<TypeGroup<'_>> = by_type
                .into_iter()
                .map(|(order_type, advisors)| TypeGroup {
                    order_type,
                    advisors: advisors
                        .into_values()
                        .map(|mut group| {
                            group.orders.sort_by_key(|o| o.created_at);
                            group
                        })
                        .collect(),
                })
                .collect();
            groups.sort_by_key(|g| type_rank(g.order_type));

            GroupedColumn {
                status: column.status,
                count: column.count,
                groups,
            }
        })
        .collect()
}

fn type_rank(order_type: OrderType) -> u8 {
    match order_type {
        OrderType::Accessories => 0,
        OrderType::TechnicalService => 1,
    }
}

/// Owner of the order list shown on the board
///
/// The list changes in exactly two ways: a full [`refresh`](Board::refresh)
/// from the store, or a [`merge`](Board::merge) of one order returned by the
/// composer or the workflow engine.
#[derive(Debug, Clone, Default)]
pub struct Board {
    orders: Vec<Order>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Reload every order, newest first
    ///
    /// Rows that cannot be decoded are skipped. On failure the current
    /// list is kept.
    pub async fn refresh(&mut self, store: &dyn DataStore) -> Result<usize, PedidosError> {
        let orders: Vec<Order> = Tables::new(store)
            .select_lenient(tables::ORDERS, &Filter::all(), Some(&Sort::desc("created_at")))
            .await?;
        tracing::debug!(count = orders.len(), "Board refreshed");
        self.orders = orders;
        Ok(self.orders.len())
    }

    /// Replace the order with the same id, or put a new one first
    pub fn merge(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.insert(0, order),
        }
    }

    /// Drop an order deleted by an administrator
    pub fn remove(&mut self, id: &uuid::Uuid) -> Option<Order> {
        let index = self.orders.iter().position(|o| &o.id == id)?;
        Some(self.orders.remove(index))
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: &uuid::Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    pub fn columns(&self) -> Vec<BoardColumn<'_>> {
        project(&self.orders)
    }

    pub fn grouped_columns(&self) -> Vec<GroupedColumn<'_>> {
        project_grouped(&self.orders)
    }
}
