use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::types::{Ingredient, Recipe};
use crate::entries::types::MealType;
use crate::nutrition::{scale_recipe, sum_ingredients, MacroTotals};

const QUANTITY_FLOOR: f64 = 0.5;
const SERVINGS_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    MealType,
    Source,
    Recipe,
    Ingredients,
    Servings,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Recipe,
    QuickAdd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedIngredient {
    pub ingredient: Ingredient,
    pub quantity: f64,
}

/// Everything a single logging session has collected so far. Lives only for
/// the duration of one session; `Reset` brings it back to `initial()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: Step,
    pub meal_type: Option<MealType>,
    pub source: Option<Source>,
    pub recipe: Option<Recipe>,
    pub ingredients: Vec<SelectedIngredient>,
    pub servings: f64,
    pub notes: String,
    pub totals: MacroTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WizardEvent {
    SelectMealType(MealType),
    SelectSource(Source),
    SelectRecipe(Recipe),
    AddIngredient { ingredient: Ingredient, quantity: f64 },
    AdjustIngredient { ingredient_id: Uuid, delta: f64 },
    RemoveIngredient { ingredient_id: Uuid },
    SetServings(f64),
    StepServings { up: bool },
    SetNotes(String),
    Continue,
    Back,
    Reset,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl WizardState {
    pub fn initial() -> Self {
        Self {
            step: Step::MealType,
            meal_type: None,
            source: None,
            recipe: None,
            ingredients: Vec::new(),
            servings: 1.0,
            notes: String::new(),
            totals: MacroTotals::ZERO,
        }
    }

    /// Whether `Continue` would be accepted. Only the ingredient and servings
    /// steps are advanced explicitly; the others advance on selection.
    pub fn can_proceed(&self) -> bool {
        match self.step {
            Step::Ingredients => !self.ingredients.is_empty(),
            Step::Servings => self.servings > 0.0,
            _ => true,
        }
    }

    /// Pure transition. Events that do not apply to the current step, or
    /// that fail a guard, return the state unchanged.
    pub fn apply(self, event: WizardEvent) -> Self {
        let step = self.step;
        match self.try_apply(event) {
            Ok(next) => next,
            Err((unchanged, reason)) => {
                debug!(?step, reason, "wizard transition refused");
                unchanged
            }
        }
    }

    fn try_apply(mut self, event: WizardEvent) -> Result<Self, (Self, &'static str)> {
        match (self.step, event) {
            (_, WizardEvent::Reset) => Ok(Self::initial()),
            (_, WizardEvent::Back) => Ok(self.back()),
            (_, WizardEvent::SetNotes(notes)) => {
                self.notes = notes;
                Ok(self)
            }

            (Step::MealType, WizardEvent::SelectMealType(meal_type)) => {
                self.meal_type = Some(meal_type);
                self.step = Step::Source;
                Ok(self)
            }

            (Step::Source, WizardEvent::SelectSource(source)) => {
                self.source = Some(source);
                self.step = match source {
                    Source::Recipe => Step::Recipe,
                    Source::QuickAdd => Step::Ingredients,
                };
                self.recompute();
                Ok(self)
            }

            (Step::Recipe, WizardEvent::SelectRecipe(recipe)) => {
                if recipe.servings < 1 {
                    return Err((self, "recipe must have at least one serving"));
                }
                self.servings = 1.0;
                self.recipe = Some(recipe);
                self.step = Step::Servings;
                self.recompute();
                Ok(self)
            }

            (Step::Ingredients, WizardEvent::AddIngredient { ingredient, quantity }) => {
                if !(quantity > 0.0) {
                    return Err((self, "quantity must be positive"));
                }
                self.add_ingredient(ingredient, quantity);
                self.recompute();
                Ok(self)
            }
            (Step::Ingredients, WizardEvent::AdjustIngredient { ingredient_id, delta }) => {
                let found = self
                    .ingredients
                    .iter()
                    .position(|si| si.ingredient.id == ingredient_id);
                let Some(idx) = found else {
                    return Err((self, "ingredient not selected"));
                };
                let line = &mut self.ingredients[idx];
                line.quantity = (line.quantity + delta).max(QUANTITY_FLOOR);
                self.recompute();
                Ok(self)
            }
            (Step::Ingredients, WizardEvent::RemoveIngredient { ingredient_id }) => {
                self.ingredients.retain(|si| si.ingredient.id != ingredient_id);
                self.recompute();
                Ok(self)
            }

            (Step::Servings, WizardEvent::SetServings(servings)) => {
                if !(servings > 0.0 && servings.is_finite()) {
                    return Err((self, "servings must be positive"));
                }
                self.servings = servings;
                self.recompute();
                Ok(self)
            }
            (Step::Servings, WizardEvent::StepServings { up }) => {
                self.servings = if up {
                    self.servings + SERVINGS_STEP
                } else {
                    (self.servings - SERVINGS_STEP).max(SERVINGS_STEP)
                };
                self.recompute();
                Ok(self)
            }

            (Step::Ingredients | Step::Servings, WizardEvent::Continue) => {
                if !self.can_proceed() {
                    return Err((self, "guard not satisfied"));
                }
                self.step = match self.step {
                    Step::Ingredients => Step::Servings,
                    _ => Step::Preview,
                };
                Ok(self)
            }

            (_, _) => Err((self, "event not valid in this step")),
        }
    }

    /// `servings` has two possible predecessors, so the target depends on the
    /// stored source rather than on history.
    fn back(mut self) -> Self {
        self.step = match self.step {
            Step::MealType => Step::MealType,
            Step::Source => Step::MealType,
            Step::Recipe | Step::Ingredients => Step::Source,
            Step::Servings => match self.source {
                Some(Source::Recipe) => Step::Recipe,
                _ => Step::Ingredients,
            },
            Step::Preview => Step::Servings,
        };
        self
    }

    fn add_ingredient(&mut self, ingredient: Ingredient, quantity: f64) {
        match self
            .ingredients
            .iter_mut()
            .find(|si| si.ingredient.id == ingredient.id)
        {
            Some(existing) => existing.quantity += quantity,
            None => self.ingredients.push(SelectedIngredient { ingredient, quantity }),
        }
    }

    /// Running totals for the active source. Quick-add totals ignore
    /// `servings`; only recipe-sourced meals are scaled by it.
    pub(crate) fn recompute(&mut self) {
        self.totals = match self.source {
            Some(Source::Recipe) => self
                .recipe
                .as_ref()
                .map(|r| scale_recipe(r, self.servings))
                .unwrap_or_default(),
            Some(Source::QuickAdd) => {
                sum_ingredients(self.ingredients.iter().map(|si| (&si.ingredient, si.quantity)))
            }
            None => MacroTotals::ZERO,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::totals::fixtures::{ingredient, recipe};

    fn at_ingredients() -> WizardState {
        WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Breakfast))
            .apply(WizardEvent::SelectSource(Source::QuickAdd))
    }

    fn add(state: WizardState, ingredient: &Ingredient, quantity: f64) -> WizardState {
        state.apply(WizardEvent::AddIngredient {
            ingredient: ingredient.clone(),
            quantity,
        })
    }

    #[test]
    fn forward_path_through_quick_add() {
        let state = WizardState::initial().apply(WizardEvent::SelectMealType(MealType::Breakfast));
        assert_eq!(state.step, Step::Source);
        assert_eq!(state.meal_type, Some(MealType::Breakfast));

        let state = state.apply(WizardEvent::SelectSource(Source::QuickAdd));
        assert_eq!(state.step, Step::Ingredients);

        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let b = ingredient("B", 50.0, 1.0, 10.0, 0.5);
        let state = add(add(state, &a, 2.0), &b, 1.0);
        assert_eq!(state.totals.calories, 250.0);

        let state = state.apply(WizardEvent::RemoveIngredient { ingredient_id: a.id });
        assert_eq!(state.totals.calories, 50.0);
        assert_eq!(state.ingredients.len(), 1);

        let state = state.apply(WizardEvent::Continue);
        assert_eq!(state.step, Step::Servings);
        let state = state.apply(WizardEvent::Continue);
        assert_eq!(state.step, Step::Preview);
    }

    #[test]
    fn recipe_selection_seeds_single_serving_totals() {
        let chili = recipe(4, 2000.0, 120.0, 200.0, 80.0);
        let state = WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Dinner))
            .apply(WizardEvent::SelectSource(Source::Recipe));
        assert_eq!(state.step, Step::Recipe);

        let state = state.apply(WizardEvent::SelectRecipe(chili));
        assert_eq!(state.step, Step::Servings);
        assert_eq!(state.totals, MacroTotals::new(500.0, 30.0, 50.0, 20.0));

        let state = state.apply(WizardEvent::SetServings(2.0));
        assert_eq!(state.totals.calories, 1000.0);
        let state = state.apply(WizardEvent::StepServings { up: true });
        assert_eq!(state.servings, 2.5);
        assert_eq!(state.totals.calories, 1250.0);
    }

    #[test]
    fn servings_do_not_scale_quick_add_totals() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(at_ingredients(), &a, 1.0)
            .apply(WizardEvent::Continue)
            .apply(WizardEvent::SetServings(3.0));
        assert_eq!(state.servings, 3.0);
        assert_eq!(state.totals.calories, 100.0);
    }

    #[test]
    fn cannot_leave_ingredients_with_empty_selection() {
        let state = at_ingredients();
        assert!(!state.can_proceed());
        let state = state.apply(WizardEvent::Continue);
        assert_eq!(state.step, Step::Ingredients);
    }

    #[test]
    fn cannot_leave_servings_with_non_positive_count() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let mut state = add(at_ingredients(), &a, 1.0).apply(WizardEvent::Continue);
        state.servings = 0.0;
        assert!(!state.can_proceed());
        assert_eq!(state.apply(WizardEvent::Continue).step, Step::Servings);
    }

    #[test]
    fn non_positive_servings_are_refused() {
        let chili = recipe(4, 2000.0, 120.0, 200.0, 80.0);
        let state = WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Dinner))
            .apply(WizardEvent::SelectSource(Source::Recipe))
            .apply(WizardEvent::SelectRecipe(chili));
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let next = state.clone().apply(WizardEvent::SetServings(bad));
            assert_eq!(next.servings, 1.0);
            assert_eq!(next.totals.calories, 500.0);
        }
    }

    #[test]
    fn recipe_without_servings_cannot_be_selected() {
        let broken = recipe(0, 100.0, 1.0, 1.0, 1.0);
        let state = WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Dinner))
            .apply(WizardEvent::SelectSource(Source::Recipe));
        let next = state.clone().apply(WizardEvent::SelectRecipe(broken));
        assert_eq!(next, state);
        assert!(next.totals.calories.is_finite());
    }

    #[test]
    fn adding_same_ingredient_merges_quantities() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(add(at_ingredients(), &a, 1.0), &a, 1.0);
        assert_eq!(state.ingredients.len(), 1);
        assert_eq!(state.ingredients[0].quantity, 2.0);
        assert_eq!(state.totals.calories, 200.0);
    }

    #[test]
    fn adjusting_quantity_stops_at_half_serving() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(at_ingredients(), &a, 1.0)
            .apply(WizardEvent::AdjustIngredient { ingredient_id: a.id, delta: -0.5 })
            .apply(WizardEvent::AdjustIngredient { ingredient_id: a.id, delta: -0.5 });
        assert_eq!(state.ingredients[0].quantity, 0.5);
        assert_eq!(state.totals.calories, 50.0);

        let state = state.apply(WizardEvent::AdjustIngredient { ingredient_id: a.id, delta: 1.0 });
        assert_eq!(state.ingredients[0].quantity, 1.5);
        assert_eq!(state.totals.calories, 150.0);
    }

    #[test]
    fn non_positive_add_is_refused() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(at_ingredients(), &a, 0.0);
        assert!(state.ingredients.is_empty());
    }

    #[test]
    fn back_from_servings_follows_source() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let quick = add(at_ingredients(), &a, 1.0).apply(WizardEvent::Continue);
        assert_eq!(quick.step, Step::Servings);
        assert_eq!(quick.apply(WizardEvent::Back).step, Step::Ingredients);

        let via_recipe = WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Lunch))
            .apply(WizardEvent::SelectSource(Source::Recipe))
            .apply(WizardEvent::SelectRecipe(recipe(2, 800.0, 40.0, 90.0, 20.0)));
        assert_eq!(via_recipe.step, Step::Servings);
        assert_eq!(via_recipe.apply(WizardEvent::Back).step, Step::Recipe);
    }

    #[test]
    fn back_chain_returns_to_meal_type() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let mut state = add(at_ingredients(), &a, 1.0)
            .apply(WizardEvent::Continue)
            .apply(WizardEvent::Continue);
        let mut seen = vec![state.step];
        for _ in 0..5 {
            state = state.apply(WizardEvent::Back);
            seen.push(state.step);
        }
        assert_eq!(
            seen,
            vec![
                Step::Preview,
                Step::Servings,
                Step::Ingredients,
                Step::Source,
                Step::MealType,
                Step::MealType,
            ]
        );
        assert_eq!(state.ingredients.len(), 1);
    }

    #[test]
    fn switching_source_recomputes_totals() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(at_ingredients(), &a, 2.0)
            .apply(WizardEvent::Back)
            .apply(WizardEvent::SelectSource(Source::Recipe));
        assert_eq!(state.step, Step::Recipe);
        assert_eq!(state.totals, MacroTotals::ZERO);
    }

    #[test]
    fn events_outside_their_step_are_ignored() {
        let state = WizardState::initial();
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        assert_eq!(add(state.clone(), &a, 1.0), state);
        assert_eq!(state.clone().apply(WizardEvent::SelectSource(Source::Recipe)), state);
        assert_eq!(state.clone().apply(WizardEvent::Continue), state);
    }

    #[test]
    fn reset_discards_selections() {
        let a = ingredient("A", 100.0, 10.0, 5.0, 2.0);
        let state = add(at_ingredients(), &a, 1.0)
            .apply(WizardEvent::SetNotes("post-run".into()))
            .apply(WizardEvent::Reset);
        assert_eq!(state, WizardState::initial());
    }

    #[test]
    fn events_round_trip_as_tagged_json() {
        let json = serde_json::to_value(WizardEvent::SelectSource(Source::QuickAdd)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "select_source", "value": "quick-add"}));
        let back: WizardEvent = serde_json::from_value(serde_json::json!({"type": "continue"})).unwrap();
        assert_eq!(back, WizardEvent::Continue);
    }
}
