use sqlx::FromRow;
use uuid::Uuid;

use super::types::{Ingredient, IngredientCategory, Recipe};

#[derive(Debug, FromRow)]
pub struct IngredientRow {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub category: IngredientCategory,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl From<IngredientRow> for Ingredient {
    fn from(r: IngredientRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            emoji: r.emoji,
            category: r.category,
            serving_size: r.serving_size,
            serving_unit: r.serving_unit,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub servings: i32,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub is_favorite: bool,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            emoji: r.emoji,
            description: r.description,
            instructions: r.instructions,
            servings: r.servings,
            prep_time: r.prep_time,
            cook_time: r.cook_time,
            total_calories: r.total_calories,
            total_protein: r.total_protein,
            total_carbs: r.total_carbs,
            total_fat: r.total_fat,
            is_favorite: r.is_favorite,
        }
    }
}

/// A recipe line joined with its ingredient.
#[derive(Debug, FromRow)]
pub struct RecipeLineRow {
    pub quantity: f64,
    #[sqlx(flatten)]
    pub ingredient: IngredientRow,
}
