//! Shopping list entries.
//!
//! Most entries are derived: camping gear comes from packing items marked
//! needs-to-buy (linked by `source_item_id`), food comes from meal
//! ingredients. Camping entries without a source are added by hand and are
//! never removed by materialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::PackingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingCategory {
    Food,
    Camping,
}

impl fmt::Display for ShoppingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShoppingCategory::Food => write!(f, "food"),
            ShoppingCategory::Camping => write!(f, "camping"),
        }
    }
}

/// Where a shopping entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoppingOrigin {
    /// Generated from a packing item.
    Packing(Uuid),
    /// Generated from meal ingredients.
    Meal,
    /// Added by the user.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub category: ShoppingCategory,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub needs_to_buy: bool,
    #[serde(default)]
    pub is_owned: bool,
    /// Packing item that generated this entry. Set by materialization only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_item_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_group: Option<String>,
}

impl ShoppingItem {
    /// Create a shopping entry for a packing item that needs buying.
    pub fn from_packing_item(item: &PackingItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: item.name.clone(),
            quantity: item.quantity.max(1),
            category: ShoppingCategory::Camping,
            checked: false,
            needs_to_buy: true,
            is_owned: false,
            source_item_id: Some(item.id),
            assigned_group: item.assigned_group.clone(),
        }
    }

    /// Create a food entry aggregated from meal ingredients.
    pub fn from_ingredient(
        name: impl Into<String>,
        quantity: u32,
        assigned_group: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity: quantity.max(1),
            category: ShoppingCategory::Food,
            checked: false,
            needs_to_buy: true,
            is_owned: false,
            source_item_id: None,
            assigned_group,
        }
    }

    /// Create a manually added entry.
    pub fn manual(name: impl Into<String>, quantity: u32, category: ShoppingCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity: quantity.max(1),
            category,
            checked: false,
            needs_to_buy: true,
            is_owned: false,
            source_item_id: None,
            assigned_group: None,
        }
    }

    pub fn origin(&self) -> ShoppingOrigin {
        match (self.source_item_id, self.category) {
            (Some(id), _) => ShoppingOrigin::Packing(id),
            (None, ShoppingCategory::Food) => ShoppingOrigin::Meal,
            (None, ShoppingCategory::Camping) => ShoppingOrigin::Manual,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("shopping item {} has an empty name", self.id));
        }
        if self.quantity == 0 {
            return Err(format!("shopping item '{}' has zero quantity", self.name));
        }
        Ok(())
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.checked { "[x]" } else { "[ ]" };
        write!(
            f,
            "{} {:<20} {} ({})",
            check, self.name, self.quantity, self.category
        )
    }
}
