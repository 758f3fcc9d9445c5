//! Packing item deduplication.
//!
//! Concurrent saves, migrations and multi-tab writes can leave several copies
//! of the same logical item. Two records are the same item when they share
//! `(name, category, is_personal)` with name and category trimmed and
//! lowercased. The copy with the higher retention score survives.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{normalize_name, PackingItem};

/// Identity key used to detect duplicates.
pub type IdentityKey = (String, String, bool);

/// Weight of a group assignment in the retention score.
const GROUP_WEIGHT: u32 = 3;

pub fn identity_key(item: &PackingItem) -> IdentityKey {
    (
        normalize_name(&item.name),
        normalize_name(item.category.as_str()),
        item.is_personal,
    )
}

/// Scores how much user intent a record carries.
///
/// One point each for owned, packed, needs-to-buy and notes; a group
/// assignment counts three.
pub fn retention_score(item: &PackingItem) -> u32 {
    let mut score = 0;
    if item.is_owned {
        score += 1;
    }
    if item.is_packed {
        score += 1;
    }
    if item.needs_to_buy {
        score += 1;
    }
    if item.has_notes() {
        score += 1;
    }
    if item.has_group() {
        score += GROUP_WEIGHT;
    }
    score
}

/// Orders two colliding records; `Greater` means `a` is kept.
///
/// Higher score wins, then the one with a group assignment, then the lower
/// id so that the winner does not depend on input order.
fn compare_retention(a: &PackingItem, b: &PackingItem) -> Ordering {
    retention_score(a)
        .cmp(&retention_score(b))
        .then_with(|| a.has_group().cmp(&b.has_group()))
        .then_with(|| b.id.cmp(&a.id))
}

/// Collapses duplicate packing items.
///
/// The result holds at most one record per [`identity_key`], in the order
/// each key first appeared. Running it twice gives the same result as
/// running it once.
pub fn dedup_packing_items(items: Vec<PackingItem>) -> Vec<PackingItem> {
    let mut slots: HashMap<IdentityKey, usize> = HashMap::with_capacity(items.len());
    let mut kept: Vec<PackingItem> = Vec::with_capacity(items.len());

    for item in items {
        let key = identity_key(&item);
        match slots.get(&key) {
            Some(&idx) => {
                if compare_retention(&item, &kept[idx]) == Ordering::Greater {
                    kept[idx] = item;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(item);
            }
        }
    }

    kept
}
