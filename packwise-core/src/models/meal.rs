use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::meal_type::MealType;

/// A planned meal on a given trip day.
///
/// Ingredients are plain names; the shopping list counts occurrences
/// across all meals rather than tracking amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    /// Zero-based trip day.
    pub day: u32,
    pub meal_type: MealType,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_group: Option<String>,
}

impl Meal {
    pub fn new(name: impl Into<String>, day: u32, meal_type: MealType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            day,
            meal_type,
            ingredients: Vec::new(),
            assigned_group: None,
        }
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.assigned_group = Some(group.into());
        self
    }

    /// Group assignment with blank values treated as unassigned.
    pub fn group(&self) -> Option<&str> {
        self.assigned_group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("meal {} has an empty name", self.id));
        }
        Ok(())
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {} {}: {}", self.day + 1, self.meal_type, self.name)?;
        if !self.ingredients.is_empty() {
            write!(f, " ({})", self.ingredients.join(", "))?;
        }
        Ok(())
    }
}
