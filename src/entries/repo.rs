use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::types::{EntryIngredient, EntryPatch, FoodEntry, Submission};
use crate::catalog::repo_types::IngredientRow;
use crate::wizard::EntrySink;

const ENTRY_COLUMNS: &str =
    "id, recipe_id, meal_type, servings, calories, protein, carbs, fat, notes, logged_at";

#[derive(Debug, FromRow)]
struct BreakdownRow {
    food_entry_id: Uuid,
    quantity: f64,
    #[sqlx(flatten)]
    ingredient: IngredientRow,
}

/// Stores the entry and its quick-add lines in one transaction.
pub async fn insert_submission(
    db: &PgPool,
    user_id: Uuid,
    submission: &Submission,
) -> anyhow::Result<FoodEntry> {
    let e = &submission.entry;
    let mut tx = db.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO food_entries (user_id, recipe_id, meal_type, servings, calories, protein, carbs, fat, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ENTRY_COLUMNS}
        "#
    );
    let entry = sqlx::query_as::<_, FoodEntry>(&sql)
        .bind(user_id)
        .bind(e.recipe_id)
        .bind(e.meal_type)
        .bind(e.servings)
        .bind(e.calories)
        .bind(e.protein)
        .bind(e.carbs)
        .bind(e.fat)
        .bind(e.notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .context("insert food entry")?;

    for line in &submission.ingredients {
        sqlx::query(
            r#"
            INSERT INTO food_entry_ingredients (food_entry_id, ingredient_id, quantity)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(entry.id)
        .bind(line.ingredient_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert breakdown line for ingredient {}", line.ingredient_id))?;
    }

    tx.commit().await?;
    debug!(entry_id = %entry.id, lines = submission.ingredients.len(), "food entry stored");
    Ok(entry)
}

/// Entries with `from <= logged_at < until`, oldest first.
pub async fn list_logged_between(
    db: &PgPool,
    user_id: Uuid,
    from: OffsetDateTime,
    until: OffsetDateTime,
) -> anyhow::Result<Vec<FoodEntry>> {
    let sql = format!(
        r#"
        SELECT {ENTRY_COLUMNS}
          FROM food_entries
         WHERE user_id = $1 AND logged_at >= $2 AND logged_at < $3
         ORDER BY logged_at ASC
        "#
    );
    let rows = sqlx::query_as::<_, FoodEntry>(&sql)
        .bind(user_id)
        .bind(from)
        .bind(until)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Breakdown lines for the given entries, keyed by entry id.
pub async fn breakdowns(
    db: &PgPool,
    entry_ids: &[Uuid],
) -> anyhow::Result<Vec<(Uuid, EntryIngredient)>> {
    if entry_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, BreakdownRow>(
        r#"
        SELECT fei.food_entry_id, fei.quantity,
               i.id, i.name, i.emoji, i.category, i.serving_size, i.serving_unit,
               i.calories, i.protein, i.carbs, i.fat
          FROM food_entry_ingredients fei
          JOIN ingredients i ON i.id = fei.ingredient_id
         WHERE fei.food_entry_id = ANY($1)
         ORDER BY i.name ASC
        "#,
    )
    .bind(entry_ids)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.food_entry_id,
                EntryIngredient {
                    ingredient: r.ingredient.into(),
                    quantity: r.quantity,
                },
            )
        })
        .collect())
}

/// Distinct UTC days with at least one entry.
pub async fn logged_days(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Date>> {
    let days = sqlx::query_scalar::<_, Date>(
        r#"
        SELECT DISTINCT (logged_at AT TIME ZONE 'UTC')::date
          FROM food_entries
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(days)
}

/// Applies the patch; macros are left untouched.
pub async fn update_entry(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    patch: &EntryPatch,
) -> anyhow::Result<Option<FoodEntry>> {
    let sql = format!(
        r#"
        UPDATE food_entries
           SET meal_type = COALESCE($3, meal_type),
               notes     = CASE WHEN $4::text IS NULL THEN notes ELSE NULLIF(btrim($4), '') END,
               logged_at = COALESCE($5, logged_at)
         WHERE id = $1 AND user_id = $2
        RETURNING {ENTRY_COLUMNS}
        "#
    );
    let entry = sqlx::query_as::<_, FoodEntry>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(patch.meal_type)
        .bind(patch.notes.as_deref())
        .bind(patch.logged_at)
        .fetch_optional(db)
        .await?;
    Ok(entry)
}

pub async fn delete_entry(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM food_entries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Entry store for one authenticated user.
pub struct PgEntrySink {
    db: PgPool,
    user_id: Uuid,
}

impl PgEntrySink {
    pub fn new(db: PgPool, user_id: Uuid) -> Self {
        Self { db, user_id }
    }
}

#[async_trait]
impl EntrySink for PgEntrySink {
    async fn create_food_entry(&self, submission: &Submission) -> anyhow::Result<FoodEntry> {
        insert_submission(&self.db, self.user_id, submission).await
    }
}
