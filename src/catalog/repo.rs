use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::repo_types::{IngredientRow, RecipeLineRow, RecipeRow};
use super::types::{
    Ingredient, IngredientCategory, IngredientDraft, IngredientError, IngredientLine, Recipe,
    RecipeDraft, RecipeError,
};
use crate::nutrition::{sum_ingredients, MacroTotals};

/// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const INGREDIENT_COLUMNS: &str =
    "id, name, emoji, category, serving_size, serving_unit, calories, protein, carbs, fat";

const RECIPE_COLUMNS: &str = "id, name, emoji, description, instructions, servings, prep_time, \
     cook_time, total_calories, total_protein, total_carbs, total_fat, is_favorite";

// ---- Ingredients ----

/// The user's own ingredients plus the shared defaults, name ordered.
pub async fn list_ingredients(
    db: &PgPool,
    user_id: Uuid,
    category: Option<IngredientCategory>,
    search: Option<&str>,
) -> anyhow::Result<Vec<Ingredient>> {
    let sql = format!(
        r#"
        SELECT {INGREDIENT_COLUMNS}
          FROM ingredients
         WHERE (user_id = $1 OR is_default)
           AND ($2::ingredient_category IS NULL OR category = $2)
           AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')
         ORDER BY name ASC
        "#
    );
    let rows = sqlx::query_as::<_, IngredientRow>(&sql)
        .bind(user_id)
        .bind(category)
        .bind(search.map(str::trim).filter(|s| !s.is_empty()))
        .fetch_all(db)
        .await
        .context("list ingredients")?;
    Ok(rows.into_iter().map(Ingredient::from).collect())
}

pub async fn create_ingredient(
    db: &PgPool,
    user_id: Uuid,
    draft: &IngredientDraft,
) -> anyhow::Result<Ingredient> {
    let sql = format!(
        r#"
        INSERT INTO ingredients
            (user_id, name, emoji, category, serving_size, serving_unit, calories, protein, carbs, fat)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {INGREDIENT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, IngredientRow>(&sql)
        .bind(user_id)
        .bind(&draft.name)
        .bind(&draft.emoji)
        .bind(draft.category)
        .bind(draft.serving_size)
        .bind(&draft.serving_unit)
        .bind(draft.calories)
        .bind(draft.protein)
        .bind(draft.carbs)
        .bind(draft.fat)
        .fetch_one(db)
        .await
        .context("insert ingredient")?;
    Ok(row.into())
}

/// Updates one of the user's ingredients in place and refreshes the stored
/// totals of every recipe that uses it. Logged entries keep their snapshot.
pub async fn update_ingredient(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    draft: &IngredientDraft,
) -> anyhow::Result<Option<Ingredient>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let sql = format!(
        r#"
        UPDATE ingredients
           SET name = $3, emoji = $4, category = $5, serving_size = $6, serving_unit = $7,
               calories = $8, protein = $9, carbs = $10, fat = $11, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {INGREDIENT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, IngredientRow>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(&draft.name)
        .bind(&draft.emoji)
        .bind(draft.category)
        .bind(draft.serving_size)
        .bind(&draft.serving_unit)
        .bind(draft.calories)
        .bind(draft.protein)
        .bind(draft.carbs)
        .bind(draft.fat)
        .fetch_optional(&mut *tx)
        .await
        .context("update ingredient")?;

    let Some(row) = row else {
        return Ok(None);
    };

    for recipe_id in recipes_using(&mut tx, id).await? {
        recompute_recipe_totals(&mut tx, recipe_id).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(Some(row.into()))
}

pub async fn delete_ingredient(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin tx")?;
    let affected = recipes_using(&mut tx, id).await?;

    let res = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await;
    let deleted = match res {
        Ok(done) => done.rows_affected() > 0,
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            return Err(IngredientError::InUse(id).into());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("delete ingredient")),
    };

    if deleted {
        for recipe_id in affected {
            recompute_recipe_totals(&mut tx, recipe_id).await?;
        }
    }
    tx.commit().await.context("commit tx")?;
    Ok(deleted)
}

/// Ingredients among `ids` the user may use: their own and the defaults.
pub async fn visible_ingredients(
    db: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<Vec<Ingredient>> {
    let mut conn = db.acquire().await.context("acquire connection")?;
    find_visible_ingredients(&mut conn, user_id, ids).await
}

async fn find_visible_ingredients(
    conn: &mut PgConnection,
    user_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<Vec<Ingredient>> {
    let sql = format!(
        r#"
        SELECT {INGREDIENT_COLUMNS}
          FROM ingredients
         WHERE id = ANY($1) AND (user_id = $2 OR is_default)
        "#
    );
    let rows = sqlx::query_as::<_, IngredientRow>(&sql)
        .bind(ids)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .context("find ingredients")?;
    Ok(rows.into_iter().map(Ingredient::from).collect())
}

// ---- Recipes ----

pub async fn list_recipes(
    db: &PgPool,
    user_id: Uuid,
    favorites_only: bool,
) -> anyhow::Result<Vec<Recipe>> {
    let sql = format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes
         WHERE user_id = $1 AND (NOT $2 OR is_favorite)
         ORDER BY created_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(user_id)
        .bind(favorites_only)
        .fetch_all(db)
        .await
        .context("list recipes")?;
    Ok(rows.into_iter().map(Recipe::from).collect())
}

/// The recipe row alone, without its ingredient lines.
pub async fn find_recipe(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");
    let row = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find recipe")?;
    Ok(row.map(Recipe::from))
}

pub async fn get_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<(Recipe, Vec<(Ingredient, f64)>)>> {
    let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");
    let Some(recipe) = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("get recipe")?
    else {
        return Ok(None);
    };

    let mut conn = db.acquire().await.context("acquire connection")?;
    let lines = recipe_lines(&mut conn, id).await?;
    Ok(Some((recipe.into(), lines)))
}

/// Inserts the recipe and its ingredient lines in one transaction. Totals
/// come from the lines, never from the client.
pub async fn create_recipe(
    db: &PgPool,
    user_id: Uuid,
    draft: &RecipeDraft,
    lines: &[IngredientLine],
) -> anyhow::Result<Recipe> {
    let mut tx = db.begin().await.context("begin tx")?;
    let totals = totals_for_lines(&mut tx, user_id, lines).await?;

    let sql = format!(
        r#"
        INSERT INTO recipes
            (user_id, name, emoji, description, instructions, servings, prep_time, cook_time,
             total_calories, total_protein, total_carbs, total_fat, is_favorite)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {RECIPE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(user_id)
        .bind(&draft.name)
        .bind(&draft.emoji)
        .bind(&draft.description)
        .bind(&draft.instructions)
        .bind(draft.servings)
        .bind(draft.prep_time)
        .bind(draft.cook_time)
        .bind(totals.calories)
        .bind(totals.protein)
        .bind(totals.carbs)
        .bind(totals.fat)
        .bind(draft.is_favorite)
        .fetch_one(&mut *tx)
        .await
        .context("insert recipe")?;

    insert_lines(&mut tx, row.id, lines).await?;
    tx.commit().await.context("commit tx")?;
    debug!(recipe_id = %row.id, lines = lines.len(), "recipe created");
    Ok(row.into())
}

/// Updates recipe fields; when `lines` is given the ingredient list is
/// replaced. Totals are recomputed from whatever list is stored afterwards.
pub async fn update_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    draft: &RecipeDraft,
    lines: Option<&[IngredientLine]>,
) -> anyhow::Result<Option<Recipe>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let updated = sqlx::query(
        r#"
        UPDATE recipes
           SET name = $3, emoji = $4, description = $5, instructions = $6, servings = $7,
               prep_time = $8, cook_time = $9, is_favorite = $10, updated_at = now()
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&draft.name)
    .bind(&draft.emoji)
    .bind(&draft.description)
    .bind(&draft.instructions)
    .bind(draft.servings)
    .bind(draft.prep_time)
    .bind(draft.cook_time)
    .bind(draft.is_favorite)
    .execute(&mut *tx)
    .await
    .context("update recipe")?
    .rows_affected();

    if updated == 0 {
        return Ok(None);
    }

    if let Some(lines) = lines {
        // resolves visibility and fails on unknown ingredients before touching the list
        totals_for_lines(&mut tx, user_id, lines).await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("clear recipe ingredients")?;
        insert_lines(&mut tx, id, lines).await?;
    }
    let recipe = recompute_recipe_totals(&mut tx, id).await?;
    tx.commit().await.context("commit tx")?;
    Ok(recipe)
}

pub async fn set_favorite(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    is_favorite: bool,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE recipes SET is_favorite = $3, updated_at = now() WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .bind(is_favorite)
    .execute(db)
    .await
    .context("toggle favorite")?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete_recipe(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(res.rows_affected() > 0)
}

async fn recipe_lines(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> anyhow::Result<Vec<(Ingredient, f64)>> {
    let rows = sqlx::query_as::<_, RecipeLineRow>(
        r#"
        SELECT ri.quantity, i.id, i.name, i.emoji, i.category, i.serving_size, i.serving_unit,
               i.calories, i.protein, i.carbs, i.fat
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = $1
         ORDER BY i.name ASC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
    .context("load recipe lines")?;
    Ok(rows
        .into_iter()
        .map(|r| (Ingredient::from(r.ingredient), r.quantity))
        .collect())
}

async fn recipes_using(conn: &mut PgConnection, ingredient_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT recipe_id FROM recipe_ingredients WHERE ingredient_id = $1",
    )
    .bind(ingredient_id)
    .fetch_all(&mut *conn)
    .await
    .context("recipes using ingredient")?;
    Ok(ids)
}

async fn totals_for_lines(
    conn: &mut PgConnection,
    user_id: Uuid,
    lines: &[IngredientLine],
) -> anyhow::Result<MacroTotals> {
    let ids: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
    let visible = find_visible_ingredients(conn, user_id, &ids).await?;
    Ok(line_totals(&visible, lines)?)
}

/// Sums `lines` against the ingredients the user can see. A line naming any
/// other ingredient fails the whole recipe.
pub(crate) fn line_totals(
    visible: &[Ingredient],
    lines: &[IngredientLine],
) -> Result<MacroTotals, RecipeError> {
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let ingredient = visible
            .iter()
            .find(|i| i.id == line.ingredient_id)
            .ok_or(RecipeError::UnknownIngredient(line.ingredient_id))?;
        resolved.push((ingredient, line.quantity));
    }
    Ok(sum_ingredients(resolved))
}

async fn insert_lines(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    lines: &[IngredientLine],
) -> anyhow::Result<()> {
    for line in lines {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(line.ingredient_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await
        .context("insert recipe ingredient")?;
    }
    Ok(())
}

/// Re-derives a recipe's stored totals from its current ingredient list.
async fn recompute_recipe_totals(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> anyhow::Result<Option<Recipe>> {
    let lines = recipe_lines(conn, recipe_id).await?;
    let totals = sum_ingredients(lines.iter().map(|(i, q)| (i, *q)));
    let sql = format!(
        r#"
        UPDATE recipes
           SET total_calories = $2, total_protein = $3, total_carbs = $4, total_fat = $5,
               updated_at = now()
         WHERE id = $1
        RETURNING {RECIPE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(recipe_id)
        .bind(totals.calories)
        .bind(totals.protein)
        .bind(totals.carbs)
        .bind(totals.fat)
        .fetch_optional(&mut *conn)
        .await
        .context("update recipe totals")?;
    debug!(%recipe_id, calories = totals.calories, "recipe totals recomputed");
    Ok(row.map(Recipe::from))
}
