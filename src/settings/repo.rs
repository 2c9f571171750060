use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::nutrition::Goals;

#[derive(Debug, FromRow)]
struct GoalsRow {
    daily_calorie_goal: f64,
    daily_protein_goal: f64,
    daily_carbs_goal: f64,
    daily_fat_goal: f64,
}

impl From<GoalsRow> for Goals {
    fn from(r: GoalsRow) -> Self {
        Self {
            calories: r.daily_calorie_goal,
            protein: r.daily_protein_goal,
            carbs: r.daily_carbs_goal,
            fat: r.daily_fat_goal,
        }
    }
}

/// Stored goals, or the defaults for users who never saved any.
pub async fn get_goals(db: &PgPool, user_id: Uuid) -> anyhow::Result<Goals> {
    let row = sqlx::query_as::<_, GoalsRow>(
        r#"
        SELECT daily_calorie_goal, daily_protein_goal, daily_carbs_goal, daily_fat_goal
          FROM user_settings
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Goals::from).unwrap_or_default())
}

pub async fn upsert_goals(db: &PgPool, user_id: Uuid, goals: &Goals) -> anyhow::Result<Goals> {
    let row = sqlx::query_as::<_, GoalsRow>(
        r#"
        INSERT INTO user_settings
            (user_id, daily_calorie_goal, daily_protein_goal, daily_carbs_goal, daily_fat_goal)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE
           SET daily_calorie_goal = EXCLUDED.daily_calorie_goal,
               daily_protein_goal = EXCLUDED.daily_protein_goal,
               daily_carbs_goal   = EXCLUDED.daily_carbs_goal,
               daily_fat_goal     = EXCLUDED.daily_fat_goal,
               updated_at         = now()
        RETURNING daily_calorie_goal, daily_protein_goal, daily_carbs_goal, daily_fat_goal
        "#,
    )
    .bind(user_id)
    .bind(goals.calories)
    .bind(goals.protein)
    .bind(goals.carbs)
    .bind(goals.fat)
    .fetch_one(db)
    .await?;
    Ok(row.into())
}
