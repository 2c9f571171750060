use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateRecipeRequest, FavoriteRequest, IngredientQuery, RecipeDetails, RecipeLineView,
    RecipeQuery, UpdateRecipeRequest,
};
use super::repo;
use super::types::{
    validate_lines, Ingredient, IngredientDraft, IngredientError, Recipe, RecipeError,
};
use crate::{
    auth::AuthUser,
    nutrition::{scale_ingredient, scale_recipe},
    state::AppState,
};

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            put(update_ingredient).delete(delete_ingredient),
        )
}

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/favorite", put(set_favorite))
}

// --- ingredients ---

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, (StatusCode, String)> {
    let items = repo::list_ingredients(&state.db, user_id, q.category, q.search.as_deref())
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

#[instrument(skip(state, draft))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut draft): Json<IngredientDraft>,
) -> Result<(StatusCode, Json<Ingredient>), (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    let ingredient = repo::create_ingredient(&state.db, user_id, &draft)
        .await
        .map_err(internal)?;
    info!(%user_id, ingredient_id = %ingredient.id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state, draft))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut draft): Json<IngredientDraft>,
) -> Result<Json<Ingredient>, (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    repo::update_ingredient(&state.db, user_id, id, &draft)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Ingredient not found"))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::delete_ingredient(&state.db, user_id, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Ingredient not found")),
        Err(e) => Err(ingredient_delete_error(e)),
    }
}

// --- recipes ---

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, (StatusCode, String)> {
    let items = repo::list_recipes(&state.db, user_id, q.favorites)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetails>, (StatusCode, String)> {
    let Some((recipe, lines)) = repo::get_recipe(&state.db, user_id, id)
        .await
        .map_err(internal)?
    else {
        return Err(not_found("Recipe not found"));
    };

    Ok(Json(RecipeDetails {
        per_serving: scale_recipe(&recipe, 1.0),
        recipe,
        ingredients: lines
            .into_iter()
            .map(|(ingredient, quantity)| RecipeLineView {
                nutrition: scale_ingredient(&ingredient, quantity),
                ingredient,
                quantity,
            })
            .collect(),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut body): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), (StatusCode, String)> {
    body.recipe.validate().map_err(bad_request)?;
    validate_lines(&body.ingredients).map_err(bad_request)?;

    let recipe = repo::create_recipe(&state.db, user_id, &body.recipe, &body.ingredients)
        .await
        .map_err(recipe_write_error)?;
    info!(%user_id, recipe_id = %recipe.id, calories = recipe.total_calories, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, body))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut body): Json<UpdateRecipeRequest>,
) -> Result<Json<Recipe>, (StatusCode, String)> {
    body.recipe.validate().map_err(bad_request)?;
    if let Some(lines) = &body.ingredients {
        validate_lines(lines).map_err(bad_request)?;
    }

    repo::update_recipe(&state.db, user_id, id, &body.recipe, body.ingredients.as_deref())
        .await
        .map_err(recipe_write_error)?
        .map(Json)
        .ok_or_else(|| not_found("Recipe not found"))
}

#[instrument(skip(state))]
pub async fn set_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<FavoriteRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::set_favorite(&state.db, user_id, id, body.is_favorite).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Recipe not found")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::delete_recipe(&state.db, user_id, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Recipe not found")),
        Err(e) => Err(internal(e)),
    }
}

fn recipe_write_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast_ref::<RecipeError>() {
        Some(re) => {
            warn!(error = %re, "recipe rejected");
            (StatusCode::BAD_REQUEST, re.to_string())
        }
        None => internal(e),
    }
}

fn ingredient_delete_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast_ref::<IngredientError>() {
        Some(ie @ IngredientError::InUse(_)) => {
            warn!(error = %ie, "ingredient delete refused");
            (StatusCode::CONFLICT, ie.to_string())
        }
        _ => internal(e),
    }
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn not_found(msg: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, msg.to_string())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "catalog request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::JwtKeys;
    use axum::extract::FromRef;

    fn app() -> (Router, String) {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        (recipe_routes().with_state(state), token)
    }

    #[tokio::test]
    async fn zero_serving_recipe_is_rejected_before_storage() {
        let (app, token) = app();
        let res = app
            .oneshot(
                Request::post("/recipes")
                    .header("Authorization", format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"name": "Soup", "servings": 0, "ingredients": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("servings must be at least 1"));
    }

    #[tokio::test]
    async fn recipes_require_authentication() {
        let (app, _) = app();
        let res = app
            .oneshot(Request::get("/recipes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_errors_map_recipe_rejections_to_bad_request() {
        let id = Uuid::new_v4();
        let (status, msg) = recipe_write_error(anyhow::Error::new(RecipeError::UnknownIngredient(id)));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains(&id.to_string()));

        let (status, _) = recipe_write_error(anyhow::anyhow!("pool timed out"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn ingredient_still_in_logged_meals_is_a_conflict() {
        let id = Uuid::new_v4();
        let (status, msg) = ingredient_delete_error(IngredientError::InUse(id).into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(msg.contains(&id.to_string()));

        let (status, _) = ingredient_delete_error(anyhow::anyhow!("connection reset"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
