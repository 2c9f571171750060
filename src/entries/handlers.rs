use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use time::{Date, Duration, OffsetDateTime};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::dto::{DayLog, DayQuery, EntryView, RangeQuery, WeeklyProgress};
use super::repo;
use super::types::{EntryPatch, FoodEntry};
use crate::{
    auth::AuthUser,
    dates::day_range,
    nutrition::{
        compute_streak, daily_breakdown, macro_percentages_of_calories, progress::Streak,
        sum_daily_totals, GoalReport, GoalShare,
    },
    settings,
    state::AppState,
};

const MAX_RANGE_DAYS: i64 = 31;

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(day_log))
        .route("/entries/:id", patch(update_entry).delete(delete_entry))
}

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/progress/weekly", get(weekly))
        .route("/progress/streak", get(streak))
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[instrument(skip(state))]
pub async fn day_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<Json<DayLog>, (StatusCode, String)> {
    let date = q.date.unwrap_or_else(today);
    let (from, until) = day_range(date).map_err(bad_request)?;
    let entries = repo::list_logged_between(&state.db, user_id, from, until)
        .await
        .map_err(internal)?;
    let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
    let lines = repo::breakdowns(&state.db, &ids).await.map_err(internal)?;
    let goals = settings::repo::get_goals(&state.db, user_id)
        .await
        .map_err(internal)?;

    let totals = sum_daily_totals(&entries);
    let mut by_entry: HashMap<Uuid, Vec<_>> = HashMap::new();
    for (entry_id, line) in lines {
        by_entry.entry(entry_id).or_default().push(line);
    }

    Ok(Json(DayLog {
        date,
        entries: entries
            .into_iter()
            .map(|entry| EntryView {
                ingredients: by_entry.remove(&entry.id).unwrap_or_default(),
                entry,
            })
            .collect(),
        status: GoalReport::new(&totals, &goals),
        percent: GoalShare::new(&totals, &goals),
        split: macro_percentages_of_calories(&totals),
        totals,
        goals,
    }))
}

#[instrument(skip(state, patch))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<FoodEntry>, (StatusCode, String)> {
    let entry = repo::update_entry(&state.db, user_id, id, &patch)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Entry not found".to_string()))?;
    info!(%user_id, entry_id = %id, "entry updated");
    Ok(Json(entry))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::delete_entry(&state.db, user_id, id).await {
        Ok(true) => {
            info!(%user_id, entry_id = %id, "entry deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err((StatusCode::NOT_FOUND, "Entry not found".to_string())),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn weekly(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Json<WeeklyProgress>, (StatusCode, String)> {
    let (start, end) = resolve_range(q.start, q.end, today()).map_err(bad_request)?;
    let (from, _) = day_range(start).map_err(bad_request)?;
    let (_, until) = day_range(end).map_err(bad_request)?;
    let entries = repo::list_logged_between(&state.db, user_id, from, until)
        .await
        .map_err(internal)?;
    let goals = settings::repo::get_goals(&state.db, user_id)
        .await
        .map_err(internal)?;

    Ok(Json(WeeklyProgress {
        start,
        end,
        goals,
        days: daily_breakdown(&entries, start, end),
    }))
}

#[instrument(skip(state))]
pub async fn streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Streak>, (StatusCode, String)> {
    let days = repo::logged_days(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(compute_streak(days, today())))
}

/// Defaults to the seven days ending `today`; a lone bound fills the other
/// side of a seven-day window.
fn resolve_range(
    start: Option<Date>,
    end: Option<Date>,
    today: Date,
) -> Result<(Date, Date), &'static str> {
    let week = Duration::days(6);
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (Some(s), None) => (s, s.saturating_add(week)),
        (None, Some(e)) => (e.saturating_sub(week), e),
        (None, None) => (today.saturating_sub(week), today),
    };
    if start > end {
        return Err("start must not be after end");
    }
    if (end - start).whole_days() >= MAX_RANGE_DAYS {
        return Err("range must not exceed 31 days");
    }
    Ok((start, end))
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "entries request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
