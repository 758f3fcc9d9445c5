//! Per-trip editing session.
//!
//! Holds one [`WriteCoalescer`] per collection of a trip and keeps the
//! shopping list in step with packing items, meals and deleted ingredients.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use packwise_core::{
    apply_status, dedup_packing_items, identity_key, meal_ingredient_names, normalize_name,
    reconcile_shopping_list, toggle_status, Collection, DeletedIngredients, InversePatch, Meal,
    PackingItem, PersistError, ShoppingCategory, ShoppingItem, ShoppingOrigin, StatusField,
    StatusPatch, TodoItem, TripId,
};

use crate::coalescer::WriteCoalescer;
use crate::hybrid::HybridStore;
use crate::templates::TemplateProvider;

const ERROR_CHANNEL_CAPACITY: usize = 64;

fn stream<C: Collection>(
    store: &Arc<HybridStore>,
    trip_id: &TripId,
    initial: C,
    quiet: Duration,
    errors: &broadcast::Sender<PersistError>,
) -> WriteCoalescer<C> {
    let store = Arc::clone(store);
    let trip_id = trip_id.clone();

    WriteCoalescer::with_error_channel(
        initial,
        quiet,
        move |value: C| {
            let store = Arc::clone(&store);
            let trip_id = trip_id.clone();
            async move {
                let report = store.save(&trip_id, &value).await?;
                debug!(trip = %trip_id, kind = %C::KIND, "{}", report);
                Ok(())
            }
        },
        errors.clone(),
    )
}

fn not_found(what: &str, id: Uuid) -> PersistError {
    PersistError::NotFound(format!("{} {}", what, id))
}

pub struct TripSession {
    store: Arc<HybridStore>,
    trip_id: TripId,
    packing: WriteCoalescer<Vec<PackingItem>>,
    meals: WriteCoalescer<Vec<Meal>>,
    shopping: WriteCoalescer<Vec<ShoppingItem>>,
    todos: WriteCoalescer<Vec<TodoItem>>,
    deleted: WriteCoalescer<DeletedIngredients>,
    errors: broadcast::Sender<PersistError>,
}

impl TripSession {
    /// Loads every collection of a trip.
    ///
    /// A trip with neither packing items nor meals is seeded from `templates`.
    /// The shopping list is reconciled right away.
    pub async fn open(
        store: Arc<HybridStore>,
        trip_id: TripId,
        quiet: Duration,
        templates: &dyn TemplateProvider,
    ) -> Result<Self, PersistError> {
        let mut packing: Vec<PackingItem> = store.load(&trip_id).await?;
        let mut meals: Vec<Meal> = store.load(&trip_id).await?;
        let shopping: Vec<ShoppingItem> = store.load(&trip_id).await?;
        let todos: Vec<TodoItem> = store.load(&trip_id).await?;
        let deleted: DeletedIngredients = store.load(&trip_id).await?;

        let mut seeded = false;
        if packing.is_empty() && meals.is_empty() {
            packing = dedup_packing_items(templates.packing_items(&trip_id));
            meals = templates.meals(&trip_id);
            seeded = !packing.is_empty() || !meals.is_empty();
        }

        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let session = Self {
            packing: stream(&store, &trip_id, packing, quiet, &errors),
            meals: stream(&store, &trip_id, meals, quiet, &errors),
            shopping: stream(&store, &trip_id, shopping, quiet, &errors),
            todos: stream(&store, &trip_id, todos, quiet, &errors),
            deleted: stream(&store, &trip_id, deleted, quiet, &errors),
            store,
            trip_id,
            errors,
        };

        if seeded {
            info!(trip = %session.trip_id, "Seeded trip from templates");
            session.packing.update(session.packing.snapshot());
            session.meals.update(session.meals.snapshot());
        }
        session.rematerialize();

        Ok(session)
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }

    /// Subscribes to persist failures of every collection.
    pub fn errors(&self) -> broadcast::Receiver<PersistError> {
        self.errors.subscribe()
    }

    pub fn packing_items(&self) -> Vec<PackingItem> {
        self.packing.snapshot()
    }

    pub fn meals(&self) -> Vec<Meal> {
        self.meals.snapshot()
    }

    pub fn shopping_items(&self) -> Vec<ShoppingItem> {
        self.shopping.snapshot()
    }

    pub fn todo_items(&self) -> Vec<TodoItem> {
        self.todos.snapshot()
    }

    pub fn deleted_ingredients(&self) -> DeletedIngredients {
        self.deleted.snapshot()
    }

    // Packing items

    /// Replaces the packing list. Duplicates are collapsed before anything
    /// else sees the list.
    pub fn set_packing_items(&self, items: Vec<PackingItem>) {
        self.packing.update(dedup_packing_items(items));
        self.rematerialize();
    }

    /// Adds a packing item and returns the id of the record kept for its
    /// identity. That is an existing item's id when the new one loses to it
    /// as a duplicate.
    pub fn add_packing_item(&self, item: PackingItem) -> Uuid {
        let key = identity_key(&item);
        let mut id = item.id;
        let mut items = self.packing.snapshot();
        items.push(item);

        let items = dedup_packing_items(items);
        if let Some(kept) = items.iter().find(|existing| identity_key(existing) == key) {
            id = kept.id;
        }
        self.packing.update(items);
        self.rematerialize();
        id
    }

    /// Replaces the packing item with the same id.
    pub fn update_packing_item(&self, item: PackingItem) -> Result<(), PersistError> {
        let mut items = self.packing.snapshot();
        let slot = items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| not_found("packing item", item.id))?;
        *slot = item;
        self.set_packing_items(items);
        Ok(())
    }

    pub fn remove_packing_item(&self, id: Uuid) -> Result<PackingItem, PersistError> {
        let mut items = self.packing.snapshot();
        let index = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| not_found("packing item", id))?;
        let removed = items.remove(index);
        self.set_packing_items(items);
        Ok(removed)
    }

    /// Flips `is_owned`. Returns the new value.
    pub async fn toggle_owned(&self, item_id: Uuid) -> Result<bool, PersistError> {
        self.toggle(item_id, StatusField::Owned).await
    }

    /// Flips `needs_to_buy`. Returns the new value.
    pub async fn toggle_needs_to_buy(&self, item_id: Uuid) -> Result<bool, PersistError> {
        self.toggle(item_id, StatusField::NeedsToBuy).await
    }

    /// Flips `is_packed`. Returns the new value.
    pub async fn toggle_packed(&self, item_id: Uuid) -> Result<bool, PersistError> {
        self.toggle(item_id, StatusField::Packed).await
    }

    async fn toggle(&self, item_id: Uuid, field: StatusField) -> Result<bool, PersistError> {
        let (next, inverse) = toggle_status(&self.packing.snapshot(), item_id, field)?;
        let value = !inverse.previous.get(field);
        self.commit_status(next, inverse, field).await?;
        Ok(value)
    }

    /// Writes a status change before returning and undoes it if the write fails.
    ///
    /// The undone list is also written to the local store, so a reopen does
    /// not bring back the failed change from the local backup.
    async fn commit_status(
        &self,
        next: Vec<PackingItem>,
        inverse: InversePatch,
        field: StatusField,
    ) -> Result<(), PersistError> {
        if let Err(e) = self.packing.update_immediate(next).await {
            let mut restored = self.packing.snapshot();
            inverse.apply(&mut restored);
            self.packing.replace_local(restored.clone());
            warn!(trip = %self.trip_id, item = %inverse.item_id, %field, error = %e, "Status change rolled back");

            if let Err(local) = self.store.save_local(&self.trip_id, &restored).await {
                warn!(trip = %self.trip_id, error = %local, "Rolled back packing list not saved locally");
            }
            return Err(e);
        }

        if let Err(e) = self.rematerialize_now().await {
            warn!(trip = %self.trip_id, error = %e, "Shopping list not saved after status change");
        }
        Ok(())
    }

    // Meals

    pub fn set_meals(&self, meals: Vec<Meal>) {
        self.meals.update(meals);
        self.rematerialize();
    }

    pub fn add_meal(&self, meal: Meal) -> Uuid {
        let id = meal.id;
        let mut meals = self.meals.snapshot();
        meals.push(meal);
        self.set_meals(meals);
        id
    }

    pub fn update_meal(&self, meal: Meal) -> Result<(), PersistError> {
        let mut meals = self.meals.snapshot();
        let slot = meals
            .iter_mut()
            .find(|existing| existing.id == meal.id)
            .ok_or_else(|| not_found("meal", meal.id))?;
        *slot = meal;
        self.set_meals(meals);
        Ok(())
    }

    pub fn remove_meal(&self, id: Uuid) -> Result<Meal, PersistError> {
        let mut meals = self.meals.snapshot();
        let index = meals
            .iter()
            .position(|meal| meal.id == id)
            .ok_or_else(|| not_found("meal", id))?;
        let removed = meals.remove(index);
        self.set_meals(meals);
        Ok(removed)
    }

    // Shopping list

    /// Adds a manual entry. Returns its id.
    pub fn add_shopping_item(
        &self,
        name: &str,
        quantity: u32,
        category: ShoppingCategory,
    ) -> Result<Uuid, PersistError> {
        let item = ShoppingItem::manual(name.trim(), quantity, category);
        item.validate().map_err(PersistError::ValidationRejected)?;

        let id = item.id;
        let mut items = self.shopping.snapshot();
        items.push(item);
        self.shopping.update(items);
        Ok(id)
    }

    pub fn set_shopping_checked(&self, id: Uuid, checked: bool) -> Result<(), PersistError> {
        let mut items = self.shopping.snapshot();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found("shopping item", id))?;
        item.checked = checked;
        self.shopping.update(items);
        Ok(())
    }

    /// Removes a shopping entry so that it stays removed.
    ///
    /// A meal-derived entry puts its name on the deleted ingredient list. A
    /// packing-derived entry clears `needs_to_buy` on its packing item; that
    /// is a status change, written before returning and undone on failure,
    /// in which case the entry stays on the list.
    pub async fn remove_shopping_item(&self, id: Uuid) -> Result<ShoppingItem, PersistError> {
        let mut items = self.shopping.snapshot();
        let index = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| not_found("shopping item", id))?;

        if let ShoppingOrigin::Packing(source_id) = items[index].origin() {
            let patch = StatusPatch {
                item_id: source_id,
                field: StatusField::NeedsToBuy,
                value: false,
            };
            // The source may already be gone; the entry is an orphan then.
            if let Ok((next, inverse)) = apply_status(&self.packing.snapshot(), patch) {
                let removed = items.remove(index);
                self.commit_status(next, inverse, patch.field).await?;
                return Ok(removed);
            }
        }

        let removed = items.remove(index);
        self.shopping.update(items);

        if removed.origin() == ShoppingOrigin::Meal {
            let key = normalize_name(&removed.name);
            if meal_ingredient_names(&self.meals.snapshot()).contains(&key) {
                let mut deleted = self.deleted.snapshot();
                deleted.insert(&removed.name);
                self.deleted.update(deleted);
            }
        }

        self.rematerialize();
        Ok(removed)
    }

    /// Lets meals recreate every previously deleted ingredient.
    pub fn clear_deleted_ingredients(&self) {
        self.deleted.update(DeletedIngredients::new());
        self.rematerialize();
    }

    // To-do items

    pub fn add_todo_item(&self, item: TodoItem) -> Uuid {
        let id = item.id;
        let mut items = self.todos.snapshot();
        items.push(item);
        self.todos.update(items);
        id
    }

    pub fn set_todo_done(&self, id: Uuid, done: bool) -> Result<(), PersistError> {
        let mut items = self.todos.snapshot();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found("todo item", id))?;
        item.done = done;
        self.todos.update(items);
        Ok(())
    }

    pub fn remove_todo_item(&self, id: Uuid) -> Result<TodoItem, PersistError> {
        let mut items = self.todos.snapshot();
        let index = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| not_found("todo item", id))?;
        let removed = items.remove(index);
        self.todos.update(items);
        Ok(removed)
    }

    // Reconciliation

    fn reconciled_shopping_list(&self) -> Option<Vec<ShoppingItem>> {
        let previous = self.shopping.snapshot();
        let next = reconcile_shopping_list(
            &self.packing.snapshot(),
            &self.meals.snapshot(),
            &self.deleted.snapshot(),
            &previous,
        )?;
        debug!(
            trip = %self.trip_id,
            before = previous.len(),
            after = next.len(),
            "Shopping list changed"
        );
        Some(next)
    }

    fn rematerialize(&self) {
        if let Some(next) = self.reconciled_shopping_list() {
            self.shopping.update(next);
        }
    }

    async fn rematerialize_now(&self) -> Result<(), PersistError> {
        match self.reconciled_shopping_list() {
            Some(next) => self.shopping.update_immediate(next).await,
            None => Ok(()),
        }
    }

    /// Persists every collection now. Returns the first failure.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let results = [
            self.packing.flush().await,
            self.meals.flush().await,
            self.shopping.flush().await,
            self.todos.flush().await,
            self.deleted.flush().await,
        ];
        results.into_iter().collect()
    }

    /// Flushes and ends the session.
    pub async fn close(self) -> Result<(), PersistError> {
        self.flush().await
    }
}
