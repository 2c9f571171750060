use serde::{Deserialize, Serialize};

use super::types::{Ingredient, IngredientCategory, IngredientLine, Recipe, RecipeDraft};
use crate::nutrition::MacroTotals;

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub category: Option<IngredientCategory>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    #[serde(default)]
    pub favorites: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    #[serde(flatten)]
    pub recipe: RecipeDraft,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

/// `ingredients: None` keeps the stored list.
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeRequest {
    #[serde(flatten)]
    pub recipe: RecipeDraft,
    pub ingredients: Option<Vec<IngredientLine>>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct RecipeLineView {
    pub ingredient: Ingredient,
    pub quantity: f64,
    pub nutrition: MacroTotals,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub per_serving: MacroTotals,
    pub ingredients: Vec<RecipeLineView>,
}
