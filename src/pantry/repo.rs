use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::types::{
    InventoryDraft, InventoryItem, InventoryPatch, PantryError, Purchase, PurchaseDraft,
    ShoppingDraft, ShoppingItem, Store, StoreDraft,
};
use crate::catalog;

/// Postgres SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

const INVENTORY_SELECT: &str = r#"
    SELECT gi.id, gi.ingredient_id, i.name AS ingredient_name, i.emoji AS ingredient_emoji,
           i.category, gi.quantity_on_hand, gi.unit, gi.threshold_quantity
      FROM gi
      JOIN ingredients i ON i.id = gi.ingredient_id
"#;

const PURCHASE_SELECT: &str = r#"
    SELECT gp.id, gp.ingredient_id, i.name AS ingredient_name, i.category,
           gp.store_id, s.name AS store_name, s.emoji AS store_emoji,
           gp.quantity, gp.unit, gp.price, gp.purchased_at, gp.notes
      FROM gp
      LEFT JOIN ingredients i ON i.id = gp.ingredient_id
      LEFT JOIN stores s ON s.id = gp.store_id
"#;

const SHOPPING_SELECT: &str = r#"
    SELECT sl.id, sl.ingredient_id, i.name AS ingredient_name, i.emoji AS ingredient_emoji,
           sl.quantity_needed, sl.is_purchased, sl.auto_added
      FROM sl
      JOIN ingredients i ON i.id = sl.ingredient_id
"#;

async fn ensure_visible_ingredient(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<()> {
    let found = catalog::repo::visible_ingredients(db, user_id, &[id]).await?;
    if found.is_empty() {
        return Err(PantryError::UnknownIngredient(id).into());
    }
    Ok(())
}

// ---- Stores ----

pub async fn list_stores(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Store>> {
    let rows = sqlx::query_as::<_, Store>(
        "SELECT id, name, emoji FROM stores WHERE user_id = $1 ORDER BY name ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list stores")?;
    Ok(rows)
}

pub async fn create_store(db: &PgPool, user_id: Uuid, draft: &StoreDraft) -> anyhow::Result<Store> {
    let row = sqlx::query_as::<_, Store>(
        "INSERT INTO stores (user_id, name, emoji) VALUES ($1, $2, $3) RETURNING id, name, emoji",
    )
    .bind(user_id)
    .bind(&draft.name)
    .bind(&draft.emoji)
    .fetch_one(db)
    .await
    .context("insert store")?;
    Ok(row)
}

pub async fn update_store(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    draft: &StoreDraft,
) -> anyhow::Result<Option<Store>> {
    let row = sqlx::query_as::<_, Store>(
        r#"
        UPDATE stores SET name = $3, emoji = $4, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING id, name, emoji
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&draft.name)
    .bind(&draft.emoji)
    .fetch_optional(db)
    .await
    .context("update store")?;
    Ok(row)
}

pub async fn delete_store(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM stores WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete store")?;
    Ok(res.rows_affected() > 0)
}

// ---- Inventory ----

pub async fn list_inventory(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<InventoryItem>> {
    let sql = format!(
        "WITH gi AS (SELECT * FROM grocery_inventory WHERE user_id = $1) {INVENTORY_SELECT} ORDER BY i.name ASC"
    );
    let rows = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list inventory")?;
    Ok(rows)
}

/// Starts tracking an ingredient. Low stock lands on the shopping list in
/// the same transaction.
pub async fn add_inventory(
    db: &PgPool,
    user_id: Uuid,
    draft: &InventoryDraft,
) -> anyhow::Result<InventoryItem> {
    ensure_visible_ingredient(db, user_id, draft.ingredient_id).await?;

    let mut tx = db.begin().await.context("begin tx")?;
    let sql = format!(
        r#"
        WITH gi AS (
            INSERT INTO grocery_inventory (user_id, ingredient_id, quantity_on_hand, threshold_quantity, unit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        )
        {INVENTORY_SELECT}
        "#
    );
    let res = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(user_id)
        .bind(draft.ingredient_id)
        .bind(draft.quantity_on_hand)
        .bind(draft.threshold_quantity)
        .bind(&draft.unit)
        .fetch_one(&mut *tx)
        .await;
    let item = match res {
        Ok(item) => item,
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            return Err(PantryError::AlreadyTracked(draft.ingredient_id).into());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("insert inventory")),
    };

    queue_restock(&mut tx, user_id, &item).await?;
    tx.commit().await.context("commit tx")?;
    Ok(item)
}

pub async fn update_inventory(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    patch: &InventoryPatch,
) -> anyhow::Result<Option<InventoryItem>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let sql = format!(
        r#"
        WITH gi AS (
            UPDATE grocery_inventory
               SET quantity_on_hand   = COALESCE($3, quantity_on_hand),
                   threshold_quantity = COALESCE($4, threshold_quantity),
                   unit               = COALESCE($5, unit),
                   updated_at         = now()
             WHERE id = $1 AND user_id = $2
            RETURNING *
        )
        {INVENTORY_SELECT}
        "#
    );
    let Some(item) = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(patch.quantity_on_hand)
        .bind(patch.threshold_quantity)
        .bind(patch.unit.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .context("update inventory")?
    else {
        return Ok(None);
    };

    queue_restock(&mut tx, user_id, &item).await?;
    tx.commit().await.context("commit tx")?;
    Ok(Some(item))
}

pub async fn delete_inventory(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM grocery_inventory WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete inventory")?;
    Ok(res.rows_affected() > 0)
}

/// Adds an auto item for low stock unless the ingredient is already on the
/// open shopping list.
async fn queue_restock(
    conn: &mut PgConnection,
    user_id: Uuid,
    item: &InventoryItem,
) -> anyhow::Result<()> {
    let Some(quantity) = item.restock_quantity() else {
        return Ok(());
    };
    let res = sqlx::query(
        r#"
        INSERT INTO shopping_list (user_id, ingredient_id, quantity_needed, auto_added)
        SELECT $1, $2, $3, TRUE
         WHERE NOT EXISTS (
               SELECT 1 FROM shopping_list
                WHERE user_id = $1 AND ingredient_id = $2 AND NOT is_purchased)
        "#,
    )
    .bind(user_id)
    .bind(item.ingredient_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await
    .context("queue restock")?;
    if res.rows_affected() > 0 {
        debug!(ingredient_id = %item.ingredient_id, quantity, "low stock added to shopping list");
    }
    Ok(())
}

// ---- Purchases ----

/// Purchases with `from <= purchased_at < until`, newest first. Open bounds
/// are unrestricted.
pub async fn list_purchases(
    db: &PgPool,
    user_id: Uuid,
    from: Option<OffsetDateTime>,
    until: Option<OffsetDateTime>,
) -> anyhow::Result<Vec<Purchase>> {
    let sql = format!(
        r#"
        WITH gp AS (
            SELECT * FROM grocery_purchases
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR purchased_at >= $2)
               AND ($3::timestamptz IS NULL OR purchased_at < $3)
        )
        {PURCHASE_SELECT}
        ORDER BY gp.purchased_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, Purchase>(&sql)
        .bind(user_id)
        .bind(from)
        .bind(until)
        .fetch_all(db)
        .await
        .context("list purchases")?;
    Ok(rows)
}

pub async fn create_purchase(
    db: &PgPool,
    user_id: Uuid,
    draft: &PurchaseDraft,
) -> anyhow::Result<Purchase> {
    if let Some(ingredient_id) = draft.ingredient_id {
        ensure_visible_ingredient(db, user_id, ingredient_id).await?;
    }
    if let Some(store_id) = draft.store_id {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM stores WHERE id = $1 AND user_id = $2)",
        )
        .bind(store_id)
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("check store")?;
        if !owned {
            return Err(PantryError::UnknownStore(store_id).into());
        }
    }

    let sql = format!(
        r#"
        WITH gp AS (
            INSERT INTO grocery_purchases
                (user_id, ingredient_id, store_id, quantity, unit, price, purchased_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()), $8)
            RETURNING *
        )
        {PURCHASE_SELECT}
        "#
    );
    let row = sqlx::query_as::<_, Purchase>(&sql)
        .bind(user_id)
        .bind(draft.ingredient_id)
        .bind(draft.store_id)
        .bind(draft.quantity)
        .bind(&draft.unit)
        .bind(draft.price)
        .bind(draft.purchased_at)
        .bind(draft.notes.as_deref())
        .fetch_one(db)
        .await
        .context("insert purchase")?;
    Ok(row)
}

pub async fn delete_purchase(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM grocery_purchases WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete purchase")?;
    Ok(res.rows_affected() > 0)
}

// ---- Shopping list ----

/// Open items first, then newest first.
pub async fn list_shopping(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ShoppingItem>> {
    let sql = format!(
        r#"
        WITH sl AS (SELECT * FROM shopping_list WHERE user_id = $1)
        {SHOPPING_SELECT}
        ORDER BY sl.is_purchased ASC, sl.created_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, ShoppingItem>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list shopping list")?;
    Ok(rows)
}

pub async fn add_shopping(
    db: &PgPool,
    user_id: Uuid,
    draft: &ShoppingDraft,
) -> anyhow::Result<ShoppingItem> {
    ensure_visible_ingredient(db, user_id, draft.ingredient_id).await?;
    let sql = format!(
        r#"
        WITH sl AS (
            INSERT INTO shopping_list (user_id, ingredient_id, quantity_needed)
            VALUES ($1, $2, $3)
            RETURNING *
        )
        {SHOPPING_SELECT}
        "#
    );
    let row = sqlx::query_as::<_, ShoppingItem>(&sql)
        .bind(user_id)
        .bind(draft.ingredient_id)
        .bind(draft.quantity_needed)
        .fetch_one(db)
        .await
        .context("insert shopping item")?;
    Ok(row)
}

pub async fn set_purchased(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    is_purchased: bool,
) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE shopping_list SET is_purchased = $3 WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .bind(is_purchased)
        .execute(db)
        .await
        .context("toggle shopping item")?;
    Ok(res.rows_affected() > 0)
}

pub async fn remove_shopping(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM shopping_list WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete shopping item")?;
    Ok(res.rows_affected() > 0)
}

pub async fn clear_purchased(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM shopping_list WHERE user_id = $1 AND is_purchased")
        .bind(user_id)
        .execute(db)
        .await
        .context("clear purchased items")?;
    Ok(res.rows_affected())
}
