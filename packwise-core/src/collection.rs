//! Persisted collection kinds.
//!
//! Every trip stores one collection per [`EntityKind`]. The [`Collection`]
//! trait ties a Rust type to its kind and carries the per-kind hooks the
//! persistence layer runs around loads and saves.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::dedup::dedup_packing_items;
use crate::models::{DeletedIngredients, Meal, PackingItem, ShoppingItem, TodoItem};

/// Collection kinds that can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    PackingItems,
    Meals,
    ShoppingItems,
    TodoItems,
    DeletedIngredients,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::PackingItems,
        EntityKind::Meals,
        EntityKind::ShoppingItems,
        EntityKind::TodoItems,
        EntityKind::DeletedIngredients,
    ];

    /// Returns the storage key segment for this kind.
    pub fn segment(&self) -> &'static str {
        match self {
            EntityKind::PackingItems => "packing_items",
            EntityKind::Meals => "meals",
            EntityKind::ShoppingItems => "shopping_items",
            EntityKind::TodoItems => "todo_items",
            EntityKind::DeletedIngredients => "deleted_ingredients",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment())
    }
}

/// A persisted per-trip collection.
pub trait Collection:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Rejects malformed records before any I/O.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Normalizes a collection read from, or about to be written to, a store.
    fn reconcile(self) -> Self {
        self
    }

    /// Count compared before and after a remote round trip, if this kind is verified.
    fn integrity_weight(&self) -> Option<usize> {
        None
    }

    fn is_empty_collection(&self) -> bool;
}

fn validate_each<T>(items: &[T], check: impl Fn(&T) -> Result<(), String>) -> Result<(), String> {
    items.iter().try_for_each(check)
}

impl Collection for Vec<PackingItem> {
    const KIND: EntityKind = EntityKind::PackingItems;

    fn validate(&self) -> Result<(), String> {
        validate_each(self, PackingItem::validate)
    }

    fn reconcile(self) -> Self {
        dedup_packing_items(self)
    }

    fn integrity_weight(&self) -> Option<usize> {
        Some(self.iter().filter(|item| item.has_group()).count())
    }

    fn is_empty_collection(&self) -> bool {
        self.is_empty()
    }
}

impl Collection for Vec<Meal> {
    const KIND: EntityKind = EntityKind::Meals;

    fn validate(&self) -> Result<(), String> {
        validate_each(self, Meal::validate)
    }

    fn is_empty_collection(&self) -> bool {
        self.is_empty()
    }
}

impl Collection for Vec<ShoppingItem> {
    const KIND: EntityKind = EntityKind::ShoppingItems;

    fn validate(&self) -> Result<(), String> {
        validate_each(self, ShoppingItem::validate)
    }

    fn is_empty_collection(&self) -> bool {
        self.is_empty()
    }
}

impl Collection for Vec<TodoItem> {
    const KIND: EntityKind = EntityKind::TodoItems;

    fn validate(&self) -> Result<(), String> {
        validate_each(self, TodoItem::validate)
    }

    fn is_empty_collection(&self) -> bool {
        self.is_empty()
    }
}

impl Collection for DeletedIngredients {
    const KIND: EntityKind = EntityKind::DeletedIngredients;

    fn is_empty_collection(&self) -> bool {
        self.is_empty()
    }
}
