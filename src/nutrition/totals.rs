use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul};

use serde::{Deserialize, Serialize};

use crate::catalog::types::{Ingredient, Recipe};
use crate::entries::types::FoodEntry;

/// Calories plus protein/carbs/fat grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    pub const ZERO: Self = Self {
        calories: 0.0,
        protein: 0.0,
        carbs: 0.0,
        fat: 0.0,
    };

    pub const fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }
}

impl Add for MacroTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl AddAssign for MacroTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for MacroTotals {
    type Output = Self;

    fn mul(self, k: f64) -> Self {
        Self {
            calories: self.calories * k,
            protein: self.protein * k,
            carbs: self.carbs * k,
            fat: self.fat * k,
        }
    }
}

impl Div<f64> for MacroTotals {
    type Output = Self;

    fn div(self, k: f64) -> Self {
        Self {
            calories: self.calories / k,
            protein: self.protein / k,
            carbs: self.carbs / k,
            fat: self.fat / k,
        }
    }
}

impl Sum for MacroTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<&Ingredient> for MacroTotals {
    fn from(i: &Ingredient) -> Self {
        Self::new(i.calories, i.protein, i.carbs, i.fat)
    }
}

impl From<&FoodEntry> for MacroTotals {
    fn from(e: &FoodEntry) -> Self {
        Self::new(e.calories, e.protein, e.carbs, e.fat)
    }
}

impl Recipe {
    /// Stored whole-recipe totals.
    pub fn totals(&self) -> MacroTotals {
        MacroTotals::new(
            self.total_calories,
            self.total_protein,
            self.total_carbs,
            self.total_fat,
        )
    }
}

/// Per-serving macros of `ingredient` multiplied by `quantity`. No validation:
/// callers keep quantities positive.
pub fn scale_ingredient(ingredient: &Ingredient, quantity: f64) -> MacroTotals {
    MacroTotals::from(ingredient) * quantity
}

/// Sum of `scale_ingredient` over the lines; zero for an empty list.
pub fn sum_ingredients<'a, I>(lines: I) -> MacroTotals
where
    I: IntoIterator<Item = (&'a Ingredient, f64)>,
{
    lines
        .into_iter()
        .map(|(ingredient, quantity)| scale_ingredient(ingredient, quantity))
        .sum()
}

/// One serving of `recipe` (stored totals / recipe servings) times `servings`.
///
/// `recipe.servings >= 1` is enforced when recipes are created; a recipe that
/// bypassed that check yields non-finite values here.
pub fn scale_recipe(recipe: &Recipe, servings: f64) -> MacroTotals {
    (recipe.totals() / f64::from(recipe.servings)) * servings
}

/// Plain sum of the entries' snapshotted macros.
pub fn sum_daily_totals<'a, I>(entries: I) -> MacroTotals
where
    I: IntoIterator<Item = &'a FoodEntry>,
{
    entries.into_iter().map(MacroTotals::from).sum()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use uuid::Uuid;

    use crate::catalog::types::{Ingredient, IngredientCategory, Recipe};

    pub fn ingredient(name: &str, calories: f64, protein: f64, carbs: f64, fat: f64) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            name: name.into(),
            emoji: None,
            category: IngredientCategory::Proteins,
            serving_size: 100.0,
            serving_unit: "g".into(),
            calories,
            protein,
            carbs,
            fat,
        }
    }

    pub fn recipe(servings: i32, calories: f64, protein: f64, carbs: f64, fat: f64) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            name: "Chili".into(),
            emoji: Some("🍲".into()),
            description: None,
            instructions: None,
            servings,
            prep_time: None,
            cook_time: None,
            total_calories: calories,
            total_protein: protein,
            total_carbs: carbs,
            total_fat: fat,
            is_favorite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::fixtures::{ingredient, recipe};
    use super::*;
    use crate::entries::types::MealType;

    fn close(a: MacroTotals, b: MacroTotals) -> bool {
        let eps = 1e-9;
        (a.calories - b.calories).abs() < eps
            && (a.protein - b.protein).abs() < eps
            && (a.carbs - b.carbs).abs() < eps
            && (a.fat - b.fat).abs() < eps
    }

    #[test]
    fn empty_ingredient_list_sums_to_zero() {
        assert_eq!(sum_ingredients(std::iter::empty()), MacroTotals::ZERO);
    }

    #[test]
    fn scale_ingredient_multiplies_every_macro() {
        let egg = ingredient("Egg", 72.0, 6.3, 0.4, 4.8);
        let half = scale_ingredient(&egg, 0.5);
        assert_eq!(half, MacroTotals::new(36.0, 3.15, 0.2, 2.4));
        assert_eq!(scale_ingredient(&egg, 3.0).calories, 72.0 * 3.0);
    }

    #[test]
    fn sum_ingredients_ignores_order() {
        let a = ingredient("Rice", 130.0, 2.7, 28.0, 0.3);
        let b = ingredient("Chicken", 165.0, 31.0, 0.0, 3.6);
        let c = ingredient("Oil", 119.0, 0.0, 0.0, 13.5);

        let forward = sum_ingredients([(&a, 1.5), (&b, 2.0), (&c, 0.5)]);
        let backward = sum_ingredients([(&c, 0.5), (&b, 2.0), (&a, 1.5)]);
        assert!(close(forward, backward));
        assert!((forward.calories - (195.0 + 330.0 + 59.5)).abs() < 1e-9);
    }

    #[test]
    fn scale_recipe_divides_by_recipe_servings() {
        let chili = recipe(4, 2000.0, 120.0, 200.0, 80.0);
        let one = scale_recipe(&chili, 1.0);
        assert_eq!(one, MacroTotals::new(500.0, 30.0, 50.0, 20.0));

        let two_and_half = scale_recipe(&chili, 2.5);
        assert!((two_and_half.calories - (2000.0 / 4.0) * 2.5).abs() < 1e-9);
    }

    #[test]
    fn daily_totals_sum_snapshots_only() {
        let entry = |calories: f64, protein: f64| FoodEntry {
            id: Uuid::new_v4(),
            recipe_id: None,
            meal_type: MealType::Lunch,
            servings: 1.0,
            calories,
            protein,
            carbs: 10.0,
            fat: 1.0,
            notes: None,
            logged_at: OffsetDateTime::UNIX_EPOCH,
        };
        let day = [entry(400.0, 20.0), entry(250.5, 12.5)];
        assert_eq!(
            sum_daily_totals(&day),
            MacroTotals::new(650.5, 32.5, 20.0, 2.0)
        );
        assert_eq!(sum_daily_totals(&Vec::<FoodEntry>::new()), MacroTotals::ZERO);
    }
}
