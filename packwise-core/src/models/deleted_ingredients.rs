//! Ingredients the user removed from the shopping list.
//!
//! Names are stored normalized (trimmed, lowercased). The set only grows
//! until it is explicitly cleared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalizes an ingredient or item name for comparison.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DeletedIngredients {
    names: BTreeSet<String>,
}

impl DeletedIngredients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an ingredient as deleted. Returns true if it was not already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return false;
        }
        self.names.insert(normalized)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for DeletedIngredients {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<DeletedIngredients> for Vec<String> {
    fn from(deleted: DeletedIngredients) -> Self {
        deleted.names.into_iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DeletedIngredients {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut deleted = Self::new();
        for name in iter {
            deleted.insert(name.as_ref());
        }
        deleted
    }
}
