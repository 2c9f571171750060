use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::machine::{Source, Step, WizardEvent, WizardState};
use super::submit::{build_submission, resolve_selections, LogMealSession, SubmitError};
use crate::{
    auth::AuthUser,
    catalog,
    entries::{repo::PgEntrySink, types::FoodEntry},
    nutrition::{macro_percentages_of_calories, GoalShare, Goals, MacroSplit, MacroTotals},
    settings,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/log/transition", post(transition))
        .route("/log/submit", post(submit))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Absent for a fresh session.
    pub state: Option<WizardState>,
    pub event: WizardEvent,
}

#[derive(Debug, Serialize)]
pub struct Preview {
    pub totals: MacroTotals,
    pub split: MacroSplit,
    pub goal_share: GoalShare,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub state: WizardState,
    pub can_proceed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub state: WizardState,
}

#[instrument(skip(state, user, body))]
pub async fn transition(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, (StatusCode, String)> {
    let next = body.state.unwrap_or_default().apply(body.event);

    let preview = if next.step == Step::Preview {
        let goals = match user {
            Some(AuthUser(user_id)) => settings::repo::get_goals(&state.db, user_id)
                .await
                .map_err(internal)?,
            None => Goals::DEFAULT,
        };
        Some(Preview {
            totals: next.totals,
            split: macro_percentages_of_calories(&next.totals),
            goal_share: GoalShare::new(&next.totals, &goals),
        })
    } else {
        None
    };

    Ok(Json(TransitionResponse {
        can_proceed: next.can_proceed(),
        state: next,
        preview,
    }))
}

#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<FoodEntry>), (StatusCode, String)> {
    // reject malformed states before touching the store
    build_submission(&body.state).map_err(|e| submit_error(e.into()))?;

    let wizard = resolve_from_store(&state, user_id, body.state).await?;
    let sink = Arc::new(PgEntrySink::new(state.db.clone(), user_id));
    let mut session = LogMealSession::resume(wizard, sink, state.config.submit_timeout);

    match session.submit().await {
        Ok(entry) => Ok((StatusCode::CREATED, Json(entry))),
        Err(e) => Err(submit_error(e)),
    }
}

/// Replaces the client's copy of the recipe or ingredients with the rows the
/// user can actually see, so the stored snapshot is computed server-side.
async fn resolve_from_store(
    state: &AppState,
    user_id: Uuid,
    wizard: WizardState,
) -> Result<WizardState, (StatusCode, String)> {
    let (recipe, ingredients) = match wizard.source {
        Some(Source::Recipe) => {
            let recipe = match &wizard.recipe {
                Some(r) => catalog::repo::find_recipe(&state.db, user_id, r.id)
                    .await
                    .map_err(internal)?,
                None => None,
            };
            (recipe, Vec::new())
        }
        _ => {
            let ids: Vec<Uuid> = wizard.ingredients.iter().map(|si| si.ingredient.id).collect();
            let found = catalog::repo::visible_ingredients(&state.db, user_id, &ids)
                .await
                .map_err(internal)?;
            (None, found)
        }
    };
    resolve_selections(wizard, recipe, &ingredients).map_err(|e| submit_error(e.into()))
}

fn submit_error(e: SubmitError) -> (StatusCode, String) {
    match e {
        SubmitError::Incomplete(inner) => {
            warn!(error = %inner, "incomplete wizard state submitted");
            (StatusCode::BAD_REQUEST, inner.to_string())
        }
        SubmitError::Rejected(_) => (StatusCode::BAD_GATEWAY, e.to_string()),
        SubmitError::TimedOut(_) => (StatusCode::GATEWAY_TIMEOUT, e.to_string()),
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "wizard request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::Request,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::JwtKeys;
    use crate::entries::types::MealType;
    use crate::nutrition::totals::fixtures::ingredient;

    async fn post_json(path: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let app = routes().with_state(AppState::fake());
        let mut req = Request::post(path).header("Content-Type", "application/json");
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }
        let res = app
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn preview_state() -> WizardState {
        WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Lunch))
            .apply(WizardEvent::SelectSource(Source::QuickAdd))
            .apply(WizardEvent::AddIngredient {
                ingredient: ingredient("Chicken", 200.0, 30.0, 0.0, 8.0),
                quantity: 1.0,
            })
            .apply(WizardEvent::Continue)
    }

    #[tokio::test]
    async fn fresh_session_starts_at_meal_type() {
        let (status, body) = post_json(
            "/log/transition",
            json!({"event": {"type": "select_meal_type", "value": "breakfast"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["step"], "source");
        assert_eq!(body["state"]["meal_type"], "breakfast");
        assert_eq!(body["can_proceed"], true);
        assert!(body.get("preview").is_none());
    }

    #[tokio::test]
    async fn reaching_preview_reports_default_goal_share() {
        let (status, body) = post_json(
            "/log/transition",
            json!({"state": preview_state(), "event": {"type": "continue"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["step"], "preview");
        assert_eq!(body["preview"]["totals"]["calories"], 200.0);
        assert_eq!(body["preview"]["goal_share"]["calories"], 10);
        assert_eq!(body["preview"]["goal_share"]["protein"], 20);
    }

    #[tokio::test]
    async fn refused_event_echoes_state() {
        let state = WizardState::initial()
            .apply(WizardEvent::SelectMealType(MealType::Snack))
            .apply(WizardEvent::SelectSource(Source::QuickAdd));
        let (status, body) = post_json(
            "/log/transition",
            json!({"state": state, "event": {"type": "continue"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["step"], "ingredients");
        assert_eq!(body["can_proceed"], false);
    }

    #[tokio::test]
    async fn submit_requires_authentication() {
        let (status, _) = post_json("/log/submit", json!({"state": preview_state()}), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn incomplete_submit_is_bad_request() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let (status, _) =
            post_json("/log/submit", json!({"state": preview_state()}), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forged_preview_is_rejected_before_storage() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let preview = preview_state().apply(WizardEvent::Continue);
        let mut forged = serde_json::to_value(&preview).unwrap();
        forged["servings"] = json!(-3.0);
        forged["totals"]["calories"] = json!(-5000.0);

        let (status, _) = post_json("/log/submit", json!({"state": forged}), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_map_to_gateway_errors() {
        let (status, _) = submit_error(SubmitError::Rejected(anyhow::anyhow!("down")));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (status, _) = submit_error(SubmitError::TimedOut(std::time::Duration::from_secs(1)));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
