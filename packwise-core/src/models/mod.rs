mod deleted_ingredients;
mod meal;
mod meal_type;
mod packing_item;
mod shopping_item;
mod todo_item;
mod trip;

pub use deleted_ingredients::{normalize_name, DeletedIngredients};
pub use meal::Meal;
pub use meal_type::MealType;
pub use packing_item::{PackingCategory, PackingItem};
pub use shopping_item::{ShoppingCategory, ShoppingItem, ShoppingOrigin};
pub use todo_item::TodoItem;
pub use trip::TripId;
