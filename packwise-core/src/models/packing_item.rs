//! Packing list items.
//!
//! A packing item carries three status flags (`is_owned`, `needs_to_buy`,
//! `is_packed`). `needs_to_buy` and `is_owned` are never both true; use
//! [`crate::status`] to change them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed set of packing categories.
///
/// Parsing is case-insensitive. Unknown names fall back to `Other` so that
/// records written by newer clients still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PackingCategory {
    Shelter,
    Sleeping,
    Kitchen,
    Clothing,
    Hygiene,
    Tools,
    Safety,
    Electronics,
    Food,
    Other,
}

impl PackingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackingCategory::Shelter => "shelter",
            PackingCategory::Sleeping => "sleeping",
            PackingCategory::Kitchen => "kitchen",
            PackingCategory::Clothing => "clothing",
            PackingCategory::Hygiene => "hygiene",
            PackingCategory::Tools => "tools",
            PackingCategory::Safety => "safety",
            PackingCategory::Electronics => "electronics",
            PackingCategory::Food => "food",
            PackingCategory::Other => "other",
        }
    }
}

impl fmt::Display for PackingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PackingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shelter" => Ok(PackingCategory::Shelter),
            "sleeping" => Ok(PackingCategory::Sleeping),
            "kitchen" => Ok(PackingCategory::Kitchen),
            "clothing" => Ok(PackingCategory::Clothing),
            "hygiene" => Ok(PackingCategory::Hygiene),
            "tools" => Ok(PackingCategory::Tools),
            "safety" => Ok(PackingCategory::Safety),
            "electronics" => Ok(PackingCategory::Electronics),
            "food" => Ok(PackingCategory::Food),
            "other" => Ok(PackingCategory::Other),
            _ => Err(format!("Unknown packing category '{}'", s)),
        }
    }
}

impl From<String> for PackingCategory {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(PackingCategory::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingItem {
    pub id: Uuid,
    pub name: String,
    pub category: PackingCategory,
    pub quantity: u32,
    #[serde(default)]
    pub is_owned: bool,
    #[serde(default)]
    pub needs_to_buy: bool,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_group: Option<String>,
    #[serde(default)]
    pub is_personal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Activities that suggested this item. Back-references only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_activities: Vec<String>,
}

impl PackingItem {
    pub fn new(name: impl Into<String>, category: PackingCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            quantity: 1,
            is_owned: false,
            needs_to_buy: false,
            is_packed: false,
            weight: None,
            assigned_group: None,
            is_personal: false,
            notes: None,
            source_activities: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.assigned_group = Some(group.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn personal(mut self) -> Self {
        self.is_personal = true;
        self
    }

    pub fn owned(mut self) -> Self {
        self.is_owned = true;
        self.needs_to_buy = false;
        self
    }

    pub fn to_buy(mut self) -> Self {
        self.needs_to_buy = true;
        self.is_owned = false;
        self
    }

    /// True when the item carries a non-empty group assignment.
    pub fn has_group(&self) -> bool {
        self.assigned_group
            .as_deref()
            .is_some_and(|g| !g.trim().is_empty())
    }

    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Whether the item should appear on the shopping list.
    pub fn wants_purchase(&self) -> bool {
        self.needs_to_buy && !self.is_owned
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("packing item {} has an empty name", self.id));
        }
        if self.quantity == 0 {
            return Err(format!("packing item '{}' has zero quantity", self.name));
        }
        if self.needs_to_buy && self.is_owned {
            return Err(format!(
                "packing item '{}' is marked both owned and needs-to-buy",
                self.name
            ));
        }
        Ok(())
    }
}

impl fmt::Display for PackingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let packed = if self.is_packed { "[x]" } else { "[ ]" };
        write!(f, "{} {} x{} ({})", packed, self.name, self.quantity, self.category)
    }
}
