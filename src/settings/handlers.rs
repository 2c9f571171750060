use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, info, instrument};

use super::repo;
use crate::{auth::AuthUser, nutrition::Goals, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/settings/goals", get(get_goals).put(put_goals))
}

#[instrument(skip(state))]
pub async fn get_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Goals>, (StatusCode, String)> {
    let goals = repo::get_goals(&state.db, user_id).await.map_err(internal)?;
    Ok(Json(goals))
}

#[instrument(skip(state))]
pub async fn put_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(goals): Json<Goals>,
) -> Result<Json<Goals>, (StatusCode, String)> {
    validate_goals(&goals).map_err(|msg| (StatusCode::BAD_REQUEST, msg.to_string()))?;
    let saved = repo::upsert_goals(&state.db, user_id, &goals)
        .await
        .map_err(internal)?;
    info!(%user_id, calories = saved.calories, "goals updated");
    Ok(Json(saved))
}

fn validate_goals(goals: &Goals) -> Result<(), &'static str> {
    let all = [goals.calories, goals.protein, goals.carbs, goals.fat];
    if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("goals must be finite and not negative");
    }
    Ok(())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "settings request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_goals_are_rejected() {
        assert!(validate_goals(&Goals::DEFAULT).is_ok());
        assert!(validate_goals(&Goals { fat: -1.0, ..Goals::DEFAULT }).is_err());
        assert!(validate_goals(&Goals { calories: f64::NAN, ..Goals::DEFAULT }).is_err());
    }

    #[test]
    fn zero_goal_is_allowed() {
        assert!(validate_goals(&Goals { carbs: 0.0, ..Goals::DEFAULT }).is_ok());
    }
}
