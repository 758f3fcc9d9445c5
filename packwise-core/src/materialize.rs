//! Shopping list materialization.
//!
//! The shopping list is recomputed from packing items, meals and the deleted
//! ingredient list every time one of them changes. The previous shopping list
//! is only consulted to carry over ids and checked state and to keep manual
//! entries.
//!
//! Rules:
//! - a packing item with `needs_to_buy` and not `is_owned` yields one camping
//!   entry linked by `source_item_id`; an existing linked entry is reused as is
//! - meal ingredients not on the deleted list are counted by normalized name;
//!   the entry inherits a group only when every occurrence comes from meals of
//!   that same group
//! - camping entries without a source are manual and always kept
//! - everything else that no longer has a source is dropped
//!
//! Food and camping entries never merge, even when names match.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{
    normalize_name, DeletedIngredients, Meal, PackingItem, ShoppingItem, ShoppingOrigin,
};

/// Ingredient occurrences aggregated across meals.
#[derive(Debug, Clone, PartialEq)]
struct IngredientTally {
    name: String,
    count: u32,
    group: GroupVote,
}

/// Running group agreement across occurrences of one ingredient.
#[derive(Debug, Clone, PartialEq)]
enum GroupVote {
    Unanimous(Option<String>),
    Mixed,
}

impl GroupVote {
    fn record(&mut self, group: Option<&str>) {
        if let GroupVote::Unanimous(current) = self {
            if current.as_deref() != group {
                *self = GroupVote::Mixed;
            }
        }
    }

    fn resolved(&self) -> Option<String> {
        match self {
            GroupVote::Unanimous(group) => group.clone(),
            GroupVote::Mixed => None,
        }
    }
}

/// Counts ingredients across meals, skipping deleted ones.
///
/// Returns tallies in first-seen order with a lookup by normalized name.
fn tally_ingredients(
    meals: &[Meal],
    deleted: &DeletedIngredients,
) -> (Vec<IngredientTally>, HashMap<String, usize>) {
    let mut tallies: Vec<IngredientTally> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for meal in meals {
        let group = meal.group();
        for raw in &meal.ingredients {
            let name = raw.trim();
            if name.is_empty() || deleted.contains(name) {
                continue;
            }
            let key = normalize_name(name);
            match index.get(&key) {
                Some(&idx) => {
                    let tally = &mut tallies[idx];
                    tally.count += 1;
                    tally.group.record(group);
                }
                None => {
                    index.insert(key, tallies.len());
                    tallies.push(IngredientTally {
                        name: name.to_string(),
                        count: 1,
                        group: GroupVote::Unanimous(group.map(str::to_string)),
                    });
                }
            }
        }
    }

    (tallies, index)
}

/// Recomputes the shopping list for a trip.
///
/// Existing entries keep their position; new entries are appended, packing
/// derived ones first. Applying the function to its own output with the same
/// sources returns the same list.
pub fn materialize(
    packing_items: &[PackingItem],
    meals: &[Meal],
    deleted: &DeletedIngredients,
    previous: &[ShoppingItem],
) -> Vec<ShoppingItem> {
    let wanted: Vec<&PackingItem> = packing_items
        .iter()
        .filter(|item| item.wants_purchase())
        .collect();
    let wanted_ids: HashSet<Uuid> = wanted.iter().map(|item| item.id).collect();

    let (tallies, tally_index) = tally_ingredients(meals, deleted);

    let mut linked: HashSet<Uuid> = HashSet::new();
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut next: Vec<ShoppingItem> = Vec::with_capacity(previous.len());

    for existing in previous {
        match existing.origin() {
            ShoppingOrigin::Packing(source_id) => {
                // A second entry for the same source is a duplicate.
                if wanted_ids.contains(&source_id) && linked.insert(source_id) {
                    next.push(existing.clone());
                }
            }
            ShoppingOrigin::Meal => {
                let key = normalize_name(&existing.name);
                if let Some(&idx) = tally_index.get(&key) {
                    if claimed.insert(idx) {
                        let tally = &tallies[idx];
                        let mut updated = existing.clone();
                        updated.quantity = tally.count;
                        updated.assigned_group = tally.group.resolved();
                        next.push(updated);
                    }
                }
            }
            ShoppingOrigin::Manual => next.push(existing.clone()),
        }
    }

    for item in wanted {
        if !linked.contains(&item.id) {
            next.push(ShoppingItem::from_packing_item(item));
        }
    }

    for (idx, tally) in tallies.iter().enumerate() {
        if !claimed.contains(&idx) {
            next.push(ShoppingItem::from_ingredient(
                tally.name.clone(),
                tally.count,
                tally.group.resolved(),
            ));
        }
    }

    next
}

/// Whether two shopping lists differ in a way worth persisting.
///
/// Compares length and, position by position, id, quantity and group.
pub fn shopping_list_changed(previous: &[ShoppingItem], next: &[ShoppingItem]) -> bool {
    previous.len() != next.len()
        || previous.iter().zip(next).any(|(a, b)| {
            a.id != b.id || a.quantity != b.quantity || a.assigned_group != b.assigned_group
        })
}

/// Runs [`materialize`] and returns the new list only when it changed.
pub fn reconcile_shopping_list(
    packing_items: &[PackingItem],
    meals: &[Meal],
    deleted: &DeletedIngredients,
    previous: &[ShoppingItem],
) -> Option<Vec<ShoppingItem>> {
    let next = materialize(packing_items, meals, deleted, previous);
    shopping_list_changed(previous, &next).then_some(next)
}

/// Names of food entries that would be recreated from meals.
///
/// Used when the user deletes a food entry, to decide whether its name has
/// to go on the deleted ingredient list.
pub fn meal_ingredient_names(meals: &[Meal]) -> HashSet<String> {
    meals
        .iter()
        .flat_map(|meal| meal.ingredients.iter())
        .map(|name| normalize_name(name))
        .filter(|name| !name.is_empty())
        .collect()
}
