//! Default content for trips that have none yet.

use uuid::Uuid;

use packwise_core::{Meal, PackingItem, TripId};

/// Supplies starting packing items and meals for a new trip.
pub trait TemplateProvider: Send + Sync {
    fn packing_items(&self, trip_id: &TripId) -> Vec<PackingItem>;
    fn meals(&self, trip_id: &TripId) -> Vec<Meal>;
}

/// Provider that seeds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateProvider for NoTemplates {
    fn packing_items(&self, _trip_id: &TripId) -> Vec<PackingItem> {
        Vec::new()
    }

    fn meals(&self, _trip_id: &TripId) -> Vec<Meal> {
        Vec::new()
    }
}

/// Fixed template lists. Every trip gets copies with fresh ids.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    packing_items: Vec<PackingItem>,
    meals: Vec<Meal>,
}

impl StaticTemplates {
    pub fn new(packing_items: Vec<PackingItem>, meals: Vec<Meal>) -> Self {
        Self {
            packing_items,
            meals,
        }
    }
}

impl TemplateProvider for StaticTemplates {
    fn packing_items(&self, _trip_id: &TripId) -> Vec<PackingItem> {
        self.packing_items
            .iter()
            .cloned()
            .map(|mut item| {
                item.id = Uuid::new_v4();
                item
            })
            .collect()
    }

    fn meals(&self, _trip_id: &TripId) -> Vec<Meal> {
        self.meals
            .iter()
            .cloned()
            .map(|mut meal| {
                meal.id = Uuid::new_v4();
                meal
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packwise_core::{MealType, PackingCategory};

    #[test]
    fn test_static_templates_issue_fresh_ids() {
        let tent = PackingItem::new("Tent", PackingCategory::Shelter);
        let templates = StaticTemplates::new(
            vec![tent.clone()],
            vec![Meal::new("Pancakes", 1, MealType::Breakfast)],
        );

        let first = templates.packing_items(&TripId::new("a"));
        let second = templates.packing_items(&TripId::new("b"));
        assert_eq!(first[0].name, "Tent");
        assert_ne!(first[0].id, tent.id);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(templates.meals(&TripId::new("a")).len(), 1);
    }

    #[test]
    fn test_no_templates() {
        assert!(NoTemplates.packing_items(&TripId::new("a")).is_empty());
        assert!(NoTemplates.meals(&TripId::new("a")).is_empty());
    }
}
