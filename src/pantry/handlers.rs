use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{ClearedResponse, PurchaseRange, PurchasedRequest, SpendingResponse};
use super::repo;
use super::spending::SpendingSummary;
use super::types::{
    InventoryDraft, InventoryItem, InventoryPatch, PantryError, Purchase, PurchaseDraft,
    ShoppingDraft, ShoppingItem, Store, StoreDraft,
};
use crate::{auth::AuthUser, dates::day_range, state::AppState};

pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/:id", put(update_store).delete(delete_store))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory).post(add_inventory))
        .route(
            "/inventory/:id",
            axum::routing::patch(update_inventory).delete(delete_inventory),
        )
}

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route("/purchases/:id", axum::routing::delete(delete_purchase))
        .route("/spending", get(spending))
}

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shopping-list",
            get(list_shopping).post(add_shopping).delete(clear_purchased),
        )
        .route("/shopping-list/:id", axum::routing::delete(remove_shopping))
        .route("/shopping-list/:id/purchased", put(set_purchased))
}

// --- stores ---

#[instrument(skip(state))]
pub async fn list_stores(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Store>>, (StatusCode, String)> {
    let stores = repo::list_stores(&state.db, user_id).await.map_err(internal)?;
    Ok(Json(stores))
}

#[instrument(skip(state, draft))]
pub async fn create_store(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut draft): Json<StoreDraft>,
) -> Result<(StatusCode, Json<Store>), (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    let store = repo::create_store(&state.db, user_id, &draft)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(store)))
}

#[instrument(skip(state, draft))]
pub async fn update_store(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut draft): Json<StoreDraft>,
) -> Result<Json<Store>, (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    repo::update_store(&state.db, user_id, id, &draft)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Store not found"))
}

#[instrument(skip(state))]
pub async fn delete_store(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    touched(repo::delete_store(&state.db, user_id, id).await, "Store not found")
}

// --- inventory ---

#[instrument(skip(state))]
pub async fn list_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<InventoryItem>>, (StatusCode, String)> {
    let items = repo::list_inventory(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

#[instrument(skip(state, draft))]
pub async fn add_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(draft): Json<InventoryDraft>,
) -> Result<(StatusCode, Json<InventoryItem>), (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    let item = repo::add_inventory(&state.db, user_id, &draft)
        .await
        .map_err(pantry_error)?;
    info!(%user_id, ingredient_id = %item.ingredient_id, low = item.is_low(), "inventory item added");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, patch))]
pub async fn update_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<InventoryPatch>,
) -> Result<Json<InventoryItem>, (StatusCode, String)> {
    patch.validate().map_err(bad_request)?;
    repo::update_inventory(&state.db, user_id, id, &patch)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Inventory item not found"))
}

#[instrument(skip(state))]
pub async fn delete_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    touched(
        repo::delete_inventory(&state.db, user_id, id).await,
        "Inventory item not found",
    )
}

// --- purchases ---

fn purchase_bounds(
    range: &PurchaseRange,
) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), (StatusCode, String)> {
    if let (Some(s), Some(e)) = (range.start, range.end) {
        if s > e {
            return Err(bad_request("start must not be after end"));
        }
    }
    let from = range
        .start
        .map(|d| day_range(d).map(|(from, _)| from))
        .transpose()
        .map_err(bad_request)?;
    let until = range
        .end
        .map(|d| day_range(d).map(|(_, until)| until))
        .transpose()
        .map_err(bad_request)?;
    Ok((from, until))
}

#[instrument(skip(state))]
pub async fn list_purchases(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<PurchaseRange>,
) -> Result<Json<Vec<Purchase>>, (StatusCode, String)> {
    let (from, until) = purchase_bounds(&range)?;
    let rows = repo::list_purchases(&state.db, user_id, from, until)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state, draft))]
pub async fn create_purchase(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut draft): Json<PurchaseDraft>,
) -> Result<(StatusCode, Json<Purchase>), (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    let purchase = repo::create_purchase(&state.db, user_id, &draft)
        .await
        .map_err(pantry_error)?;
    info!(%user_id, purchase_id = %purchase.id, price = purchase.price, "purchase recorded");
    Ok((StatusCode::CREATED, Json(purchase)))
}

#[instrument(skip(state))]
pub async fn delete_purchase(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    touched(
        repo::delete_purchase(&state.db, user_id, id).await,
        "Purchase not found",
    )
}

#[instrument(skip(state))]
pub async fn spending(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<PurchaseRange>,
) -> Result<Json<SpendingResponse>, (StatusCode, String)> {
    let (from, until) = purchase_bounds(&range)?;
    let rows = repo::list_purchases(&state.db, user_id, from, until)
        .await
        .map_err(internal)?;
    Ok(Json(SpendingResponse {
        start: range.start,
        end: range.end,
        summary: SpendingSummary::new(&rows),
    }))
}

// --- shopping list ---

#[instrument(skip(state))]
pub async fn list_shopping(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ShoppingItem>>, (StatusCode, String)> {
    let items = repo::list_shopping(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

#[instrument(skip(state, draft))]
pub async fn add_shopping(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(draft): Json<ShoppingDraft>,
) -> Result<(StatusCode, Json<ShoppingItem>), (StatusCode, String)> {
    draft.validate().map_err(bad_request)?;
    let item = repo::add_shopping(&state.db, user_id, &draft)
        .await
        .map_err(pantry_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn set_purchased(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PurchasedRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    touched(
        repo::set_purchased(&state.db, user_id, id, body.is_purchased).await,
        "Shopping item not found",
    )
}

#[instrument(skip(state))]
pub async fn remove_shopping(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    touched(
        repo::remove_shopping(&state.db, user_id, id).await,
        "Shopping item not found",
    )
}

#[instrument(skip(state))]
pub async fn clear_purchased(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ClearedResponse>, (StatusCode, String)> {
    let removed = repo::clear_purchased(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(ClearedResponse { removed }))
}

/// `true` from the store means a row was touched.
fn touched(res: anyhow::Result<bool>, missing: &str) -> Result<StatusCode, (StatusCode, String)> {
    match res {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found(missing)),
        Err(e) => Err(internal(e)),
    }
}

fn pantry_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast_ref::<PantryError>() {
        Some(pe @ PantryError::AlreadyTracked(_)) => (StatusCode::CONFLICT, pe.to_string()),
        Some(pe) => {
            warn!(error = %pe, "pantry request rejected");
            (StatusCode::BAD_REQUEST, pe.to_string())
        }
        None => internal(e),
    }
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn not_found(msg: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, msg.to_string())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "pantry request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::FromRef, http::Request};
    use time::macros::{date, datetime};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::JwtKeys;

    async fn send(req: axum::http::request::Builder, body: Body) -> StatusCode {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        store_routes()
            .merge(inventory_routes())
            .merge(purchase_routes())
            .merge(shopping_routes())
            .with_state(state)
            .oneshot(
                req.header("Authorization", format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_storage() {
        let ingredient = Uuid::new_v4();
        let cases = [
            ("/stores", r#"{"name": "  "}"#.to_string()),
            ("/purchases", r#"{"price": -2.0}"#.to_string()),
            (
                "/inventory",
                format!(r#"{{"ingredient_id": "{ingredient}", "quantity_on_hand": -1}}"#),
            ),
            (
                "/shopping-list",
                format!(r#"{{"ingredient_id": "{ingredient}", "quantity_needed": 0}}"#),
            ),
        ];
        for (path, body) in cases {
            let status = send(Request::post(path), Body::from(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn spending_range_is_validated() {
        let status = send(
            Request::get("/spending?start=2025-03-09&end=2025-03-01"),
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn purchase_bounds_cover_whole_days() {
        let range = PurchaseRange {
            start: Some(date!(2025 - 03 - 01)),
            end: Some(date!(2025 - 03 - 07)),
        };
        let (from, until) = purchase_bounds(&range).unwrap();
        assert_eq!(from, Some(datetime!(2025-03-01 0:00 UTC)));
        assert_eq!(until, Some(datetime!(2025-03-08 0:00 UTC)));

        let open = PurchaseRange { start: None, end: None };
        assert_eq!(purchase_bounds(&open).unwrap(), (None, None));
    }

    #[test]
    fn pantry_errors_map_to_client_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(pantry_error(PantryError::AlreadyTracked(id).into()).0, StatusCode::CONFLICT);
        assert_eq!(pantry_error(PantryError::UnknownStore(id).into()).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            pantry_error(anyhow::anyhow!("pool closed")).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
