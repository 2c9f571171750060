use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Fixed set of pantry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ingredient_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Proteins,
    Grains,
    Vegetables,
    Fruits,
    Dairy,
    Fats,
    Legumes,
    Nuts,
    Condiments,
    Beverages,
}

/// Pantry ingredient with per-serving macros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
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

/// Saved recipe. The `total_*` fields are the sum over all ingredient lines
/// at their stored quantities, for the whole recipe (not per serving).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
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

/// One (ingredient, quantity) line. Quantity multiplies the ingredient's serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient_id: Uuid,
    pub quantity: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum IngredientError {
    #[error("ingredient name must not be empty")]
    EmptyName,
    #[error("serving size must be positive")]
    ServingSize,
    #[error("{0} must not be negative")]
    NegativeMacro(&'static str),
    #[error("ingredient {0} is part of logged meals and cannot be deleted")]
    InUse(Uuid),
}

#[derive(Debug, Error, PartialEq)]
pub enum RecipeError {
    #[error("recipe name must not be empty")]
    EmptyName,
    #[error("servings must be at least 1, got {0}")]
    Servings(i32),
    #[error("quantity for ingredient {0} must be positive")]
    Quantity(Uuid),
    #[error("ingredient {0} listed more than once")]
    DuplicateIngredient(Uuid),
    #[error("unknown ingredient {0}")]
    UnknownIngredient(Uuid),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientDraft {
    pub name: String,
    pub emoji: Option<String>,
    pub category: IngredientCategory,
    #[serde(default = "default_serving_size")]
    pub serving_size: f64,
    #[serde(default = "default_serving_unit")]
    pub serving_unit: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

fn default_serving_size() -> f64 {
    100.0
}

fn default_serving_unit() -> String {
    "g".into()
}

impl IngredientDraft {
    pub fn validate(&mut self) -> Result<(), IngredientError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(IngredientError::EmptyName);
        }
        if !(self.serving_size > 0.0) {
            return Err(IngredientError::ServingSize);
        }
        for (label, value) in [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ] {
            if !(value >= 0.0) {
                return Err(IngredientError::NegativeMacro(label));
            }
        }
        Ok(())
    }
}

/// Recipe fields supplied by the client. Totals are never accepted from the
/// client; they are derived from `ingredients`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    #[serde(default = "default_servings")]
    pub servings: i32,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    #[serde(default)]
    pub is_favorite: bool,
}

fn default_servings() -> i32 {
    1
}

impl RecipeDraft {
    /// Recipes are the only place a serving count enters the system, so a
    /// zero or negative count is rejected here and never reaches `scale_recipe`.
    pub fn validate(&mut self) -> Result<(), RecipeError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(RecipeError::EmptyName);
        }
        if self.servings < 1 {
            return Err(RecipeError::Servings(self.servings));
        }
        Ok(())
    }
}

pub fn validate_lines(lines: &[IngredientLine]) -> Result<(), RecipeError> {
    let mut seen = std::collections::HashSet::with_capacity(lines.len());
    for line in lines {
        if !(line.quantity > 0.0) {
            return Err(RecipeError::Quantity(line.ingredient_id));
        }
        if !seen.insert(line.ingredient_id) {
            return Err(RecipeError::DuplicateIngredient(line.ingredient_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(servings: i32) -> RecipeDraft {
        RecipeDraft {
            name: "  Overnight oats ".into(),
            emoji: None,
            description: None,
            instructions: None,
            servings,
            prep_time: Some(5),
            cook_time: None,
            is_favorite: false,
        }
    }

    #[test]
    fn recipe_draft_rejects_zero_servings() {
        assert_eq!(draft(0).validate(), Err(RecipeError::Servings(0)));
        assert_eq!(draft(-2).validate(), Err(RecipeError::Servings(-2)));
    }

    #[test]
    fn recipe_draft_trims_name() {
        let mut d = draft(2);
        d.validate().expect("valid draft");
        assert_eq!(d.name, "Overnight oats");
    }

    #[test]
    fn lines_reject_duplicates_and_non_positive_quantities() {
        let id = Uuid::new_v4();
        let dup = [
            IngredientLine { ingredient_id: id, quantity: 1.0 },
            IngredientLine { ingredient_id: id, quantity: 2.0 },
        ];
        assert_eq!(validate_lines(&dup), Err(RecipeError::DuplicateIngredient(id)));

        let zero = [IngredientLine { ingredient_id: id, quantity: 0.0 }];
        assert_eq!(validate_lines(&zero), Err(RecipeError::Quantity(id)));
    }

    #[test]
    fn ingredient_draft_rejects_negative_macros() {
        let mut d: IngredientDraft = serde_json::from_value(serde_json::json!({
            "name": "Olive oil",
            "category": "fats",
            "fat": -1.0
        }))
        .unwrap();
        assert_eq!(d.validate(), Err(IngredientError::NegativeMacro("fat")));
    }

    #[test]
    fn category_uses_lowercase_names() {
        let json = serde_json::to_string(&IngredientCategory::Condiments).unwrap();
        assert_eq!(json, "\"condiments\"");
    }
}
