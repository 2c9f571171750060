use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::machine::{Source, Step, WizardEvent, WizardState};
use crate::catalog::types::{Ingredient, IngredientLine, Recipe};
use crate::entries::types::{FoodEntry, NewFoodEntry, Submission};
use crate::nutrition::format_nutrition_value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("meal can only be logged from the preview step (currently {0:?})")]
    NotAtPreview(Step),
    #[error("no meal type selected")]
    MissingMealType,
    #[error("no source selected")]
    MissingSource,
    #[error("recipe source selected but no recipe chosen")]
    MissingRecipe,
    #[error("quick-add meal has no ingredients")]
    NoIngredients,
    #[error("servings must be a positive number")]
    InvalidServings,
    #[error("recipe {0} has no servings")]
    RecipeServings(Uuid),
    #[error("ingredient {0} selected more than once")]
    DuplicateIngredient(Uuid),
    #[error("unknown recipe {0}")]
    UnknownRecipe(Uuid),
    #[error("unknown ingredient {0}")]
    UnknownIngredient(Uuid),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Incomplete(#[from] WizardError),
    #[error("food entry was not saved: {0}")]
    Rejected(anyhow::Error),
    #[error("food entry store did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Assembles the payload handed to the entry store. Totals are derived again
/// from the selections rather than copied from `state.totals`; this is the
/// snapshot the entry keeps forever.
pub fn build_submission(state: &WizardState) -> Result<Submission, WizardError> {
    if state.step != Step::Preview {
        return Err(WizardError::NotAtPreview(state.step));
    }
    let meal_type = state.meal_type.ok_or(WizardError::MissingMealType)?;
    let source = state.source.ok_or(WizardError::MissingSource)?;
    if !(state.servings > 0.0 && state.servings.is_finite()) {
        return Err(WizardError::InvalidServings);
    }

    let (recipe_id, ingredients) = match source {
        Source::Recipe => {
            let recipe = state.recipe.as_ref().ok_or(WizardError::MissingRecipe)?;
            if recipe.servings < 1 {
                return Err(WizardError::RecipeServings(recipe.id));
            }
            (Some(recipe.id), Vec::new())
        }
        Source::QuickAdd => {
            if state.ingredients.is_empty() {
                return Err(WizardError::NoIngredients);
            }
            let mut seen = HashSet::with_capacity(state.ingredients.len());
            let mut lines = Vec::with_capacity(state.ingredients.len());
            for si in &state.ingredients {
                if !seen.insert(si.ingredient.id) {
                    return Err(WizardError::DuplicateIngredient(si.ingredient.id));
                }
                lines.push(IngredientLine {
                    ingredient_id: si.ingredient.id,
                    quantity: si.quantity,
                });
            }
            (None, lines)
        }
    };

    let mut fresh = state.clone();
    fresh.recompute();
    let totals = fresh.totals;

    let notes = state.notes.trim();
    Ok(Submission {
        entry: NewFoodEntry {
            meal_type,
            recipe_id,
            servings: state.servings,
            calories: totals.calories,
            protein: totals.protein,
            carbs: totals.carbs,
            fat: totals.fat,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        },
        ingredients,
    })
}

/// Swaps the recipe and ingredients a client sent for the stored rows and
/// recomputes the running totals from them. `recipe` is the stored recipe
/// matching `state.recipe`, if the caller may see it; `stored` holds the
/// visible ingredients among `state.ingredients`.
pub fn resolve_selections(
    mut state: WizardState,
    recipe: Option<Recipe>,
    stored: &[Ingredient],
) -> Result<WizardState, WizardError> {
    match state.source {
        Some(Source::Recipe) => {
            let wanted = state.recipe.as_ref().ok_or(WizardError::MissingRecipe)?.id;
            let recipe = recipe
                .filter(|r| r.id == wanted)
                .ok_or(WizardError::UnknownRecipe(wanted))?;
            state.recipe = Some(recipe);
        }
        Some(Source::QuickAdd) => {
            for si in &mut state.ingredients {
                let found = stored
                    .iter()
                    .find(|i| i.id == si.ingredient.id)
                    .ok_or(WizardError::UnknownIngredient(si.ingredient.id))?;
                si.ingredient = found.clone();
            }
        }
        None => return Err(WizardError::MissingSource),
    }
    state.recompute();
    Ok(state)
}

/// Where submitted meals go. The wizard knows nothing beyond this call.
#[async_trait]
pub trait EntrySink: Send + Sync {
    async fn create_food_entry(&self, submission: &Submission) -> anyhow::Result<FoodEntry>;
}

/// Owns one logging session: the wizard state plus the store it submits to.
pub struct LogMealSession {
    state: WizardState,
    sink: Arc<dyn EntrySink>,
    timeout: Duration,
}

impl LogMealSession {
    pub fn new(sink: Arc<dyn EntrySink>, timeout: Duration) -> Self {
        Self::resume(WizardState::initial(), sink, timeout)
    }

    pub fn resume(state: WizardState, sink: Arc<dyn EntrySink>, timeout: Duration) -> Self {
        Self {
            state,
            sink,
            timeout,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn apply(&mut self, event: WizardEvent) -> &WizardState {
        let current = std::mem::take(&mut self.state);
        self.state = current.apply(event);
        &self.state
    }

    pub fn close(&mut self) {
        self.state = WizardState::initial();
    }

    /// Persists the meal. `&mut self` keeps a second submission of the same
    /// session from starting while one is in flight. The state is reset only
    /// after the store confirms; on any error it is left as it was so the
    /// user can retry.
    pub async fn submit(&mut self) -> Result<FoodEntry, SubmitError> {
        let submission = build_submission(&self.state)?;

        let entry = match tokio::time::timeout(self.timeout, self.sink.create_food_entry(&submission)).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => {
                warn!(error = %e, meal_type = ?submission.entry.meal_type, "food entry rejected");
                return Err(SubmitError::Rejected(e));
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "food entry store timed out");
                return Err(SubmitError::TimedOut(self.timeout));
            }
        };

        info!(
            entry_id = %entry.id,
            meal_type = ?entry.meal_type,
            calories = %format_nutrition_value(entry.calories, "kcal"),
            protein = %format_nutrition_value(entry.protein, "g"),
            ingredients = submission.ingredients.len(),
            "meal logged"
        );
        self.state = WizardState::initial();
        Ok(entry)
    }
}
