//! Label/value mapping for searchable pickers
//!
//! A [`SearchableSelect`] offers a list of options of any type. What it
//! shows and what it hands back are decided by a [`Mapper`] given at the
//! call site, so the same picker serves advisors, clients and products.

use std::fmt;

/// How a picker shows and identifies `T`
pub struct Mapper<T, K> {
    label: Box<dyn Fn(&T) -> String + Send + Sync>,
    value: Box<dyn Fn(&T) -> K + Send + Sync>,
}

impl<T, K> Mapper<T, K> {
    pub fn new(
        label: impl Fn(&T) -> String + Send + Sync + 'static,
        value: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: Box::new(label),
            value: Box::new(value),
        }
    }

    pub fn label(&self, item: &T) -> String {
        (self.label)(item)
    }

    pub fn value(&self, item: &T) -> K {
        (self.value)(item)
    }
}

impl<T, K> fmt::Debug for Mapper<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper").finish_non_exhaustive()
    }
}

/// A displayed option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption<K> {
    pub label: String,
    pub value: K,
}

/// Options plus the mapper that renders them
#[derive(Debug)]
pub struct SearchableSelect<T, K> {
    items: Vec<T>,
    mapper: Mapper<T, K>,
}

impl<T, K: PartialEq> SearchableSelect<T, K> {
    pub fn new(items: Vec<T>, mapper: Mapper<T, K>) -> Self {
        Self { items, mapper }
    }

    /// Options whose label contains `query`, ignoring case and accents;
    /// an empty query returns everything
    pub fn filter(&self, query: &str) -> Vec<SelectOption<K>> {
        let query = normalize_for_search(query.trim());
        self.items
            .iter()
            .filter(|item| {
                query.is_empty() || normalize_for_search(&self.mapper.label(item)).contains(&query)
            })
            .map(|item| SelectOption {
                label: self.mapper.label(item),
                value: self.mapper.value(item),
            })
            .collect()
    }

    /// Find the item behind a selected value
    pub fn selected(&self, value: &K) -> Option<&T> {
        self.items
            .iter()
            .find(|item| &self.mapper.value(item) == value)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// Lowercase and strip the accents used in Spanish text
pub fn normalize_for_search(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            'ñ' | 'Ñ' => 'n',
            'ç' | 'Ç' => 'c',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}
