use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::types::{Ingredient, IngredientLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A logged meal. Macros are a snapshot taken when the entry was created and
/// are never recomputed from the recipe or ingredients afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FoodEntry {
    pub id: Uuid,
    pub recipe_id: Option<Uuid>,
    pub meal_type: MealType,
    pub servings: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

/// Insert payload for a food entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodEntry {
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub servings: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub notes: Option<String>,
}

/// Entry plus the quick-add breakdown, empty for recipe-sourced entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub entry: NewFoodEntry,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

/// One line of a quick-add entry's breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryIngredient {
    pub ingredient: Ingredient,
    pub quantity: f64,
}

/// Editable fields of a logged entry. `notes: Some("")` clears the notes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    pub meal_type: Option<MealType>,
    pub notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}
