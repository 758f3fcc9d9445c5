//! Packwise Core Library
//!
//! Trip models and the pure parts of the persistence engine: duplicate
//! collapsing, shopping list materialization and packing status transitions.

pub mod collection;
pub mod dedup;
pub mod error;
pub mod materialize;
pub mod models;
pub mod status;

pub use collection::{Collection, EntityKind};
pub use dedup::{dedup_packing_items, identity_key, retention_score};
pub use error::PersistError;
pub use materialize::{
    materialize, meal_ingredient_names, reconcile_shopping_list, shopping_list_changed,
};
pub use models::{
    normalize_name, DeletedIngredients, Meal, MealType, PackingCategory, PackingItem,
    ShoppingCategory, ShoppingItem, ShoppingOrigin, TodoItem, TripId,
};
pub use status::{apply_status, toggle_status, InversePatch, StatusField, StatusFlags, StatusPatch};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
