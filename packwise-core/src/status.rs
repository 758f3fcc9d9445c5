//! Packing item status transitions.
//!
//! Setting `is_owned` forces `needs_to_buy` off and setting `needs_to_buy`
//! forces `is_owned` off. `is_packed` is independent and may be set on an
//! item that is not owned.
//!
//! Every transition returns an [`InversePatch`] that restores the previous
//! flags, so a failed write can be undone without re-reading the store.

use std::fmt;
use uuid::Uuid;

use crate::error::PersistError;
use crate::models::PackingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Owned,
    NeedsToBuy,
    Packed,
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusField::Owned => write!(f, "owned"),
            StatusField::NeedsToBuy => write!(f, "needs-to-buy"),
            StatusField::Packed => write!(f, "packed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    pub is_owned: bool,
    pub needs_to_buy: bool,
    pub is_packed: bool,
}

impl StatusFlags {
    pub fn of(item: &PackingItem) -> Self {
        Self {
            is_owned: item.is_owned,
            needs_to_buy: item.needs_to_buy,
            is_packed: item.is_packed,
        }
    }

    pub fn get(&self, field: StatusField) -> bool {
        match field {
            StatusField::Owned => self.is_owned,
            StatusField::NeedsToBuy => self.needs_to_buy,
            StatusField::Packed => self.is_packed,
        }
    }

    /// Applies one field change together with the flags it forces.
    pub fn set(self, field: StatusField, value: bool) -> Self {
        let mut next = self;
        match field {
            StatusField::Owned => {
                next.is_owned = value;
                if value {
                    next.needs_to_buy = false;
                }
            }
            StatusField::NeedsToBuy => {
                next.needs_to_buy = value;
                if value {
                    next.is_owned = false;
                }
            }
            StatusField::Packed => next.is_packed = value,
        }
        next
    }

    fn write_to(&self, item: &mut PackingItem) {
        item.is_owned = self.is_owned;
        item.needs_to_buy = self.needs_to_buy;
        item.is_packed = self.is_packed;
    }
}

/// A requested status change for one packing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPatch {
    pub item_id: Uuid,
    pub field: StatusField,
    pub value: bool,
}

/// Restores the flags an item had before a [`StatusPatch`] was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InversePatch {
    pub item_id: Uuid,
    pub previous: StatusFlags,
}

impl InversePatch {
    /// Restores the previous flags in place.
    ///
    /// Only the patched item is touched, so edits made to other items since
    /// the patch survive. Returns false if the item is gone.
    pub fn apply(&self, items: &mut [PackingItem]) -> bool {
        match items.iter_mut().find(|item| item.id == self.item_id) {
            Some(item) => {
                self.previous.write_to(item);
                true
            }
            None => false,
        }
    }
}

/// Applies a status patch, returning the new collection and its inverse.
pub fn apply_status(
    items: &[PackingItem],
    patch: StatusPatch,
) -> Result<(Vec<PackingItem>, InversePatch), PersistError> {
    let mut next = items.to_vec();
    let item = next
        .iter_mut()
        .find(|item| item.id == patch.item_id)
        .ok_or_else(|| PersistError::NotFound(format!("packing item {}", patch.item_id)))?;

    let previous = StatusFlags::of(item);
    previous.set(patch.field, patch.value).write_to(item);

    Ok((
        next,
        InversePatch {
            item_id: patch.item_id,
            previous,
        },
    ))
}

/// Flips one status field of an item.
pub fn toggle_status(
    items: &[PackingItem],
    item_id: Uuid,
    field: StatusField,
) -> Result<(Vec<PackingItem>, InversePatch), PersistError> {
    let current = items
        .iter()
        .find(|item| item.id == item_id)
        .map(|item| StatusFlags::of(item).get(field))
        .ok_or_else(|| PersistError::NotFound(format!("packing item {}", item_id)))?;

    apply_status(
        items,
        StatusPatch {
            item_id,
            field,
            value: !current,
        },
    )
}
