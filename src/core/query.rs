//! Filters and sort orders understood by every [`DataStore`](crate::core::DataStore)
//!
//! The vocabulary is deliberately small: equality, case-insensitive
//! substring match across columns, and a row limit. That is everything the
//! board, catalog and reports need from the external store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// `column = value`
    Eq { column: String, value: Value },

    /// Case-insensitive substring match on any of the columns
    ///
    /// Mirrors `col1.ilike.%needle%,col2.ilike.%needle%`.
    ContainsAny { columns: Vec<String>, needle: String },
}

impl Condition {
    /// Check whether a row satisfies this condition
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Condition::Eq { column, value } => row.get(column) == Some(value),
            Condition::ContainsAny { columns, needle } => {
                let needle = needle.to_lowercase();
                columns.iter().any(|column| {
                    row.get(column)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
        }
    }
}

/// Conjunction of conditions plus an optional row limit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub limit: Option<usize>,
}

impl Filter {
    /// Filter matching every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains_any(mut self, columns: &[&str], needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::ContainsAny {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            needle: needle.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a row satisfies every condition
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Order-by clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }

    /// Compare two rows on the sort column
    ///
    /// Strings compare case-insensitively, numbers numerically; missing
    /// values sort first in ascending order.
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> std::cmp::Ordering {
        let ordering = compare_values(a.get(&self.column), b.get(&self.column));
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
