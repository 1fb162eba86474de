//! Menu item repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cafe_calories_core::{CafeId, ItemId};

use super::{RepositoryError, like_pattern};
use crate::models::{Item, NewItem};

const ITEM_COLUMNS: &str = "id, cafe_id, name, description, ingredients, calories, price, \
                            quantity, servings, veg_flag, kind, active";

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    cafe_id: CafeId,
    name: String,
    description: Option<String>,
    ingredients: Option<String>,
    calories: i32,
    price: Decimal,
    quantity: Option<String>,
    servings: Option<f64>,
    veg_flag: bool,
    kind: Option<String>,
    active: bool,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            cafe_id: row.cafe_id,
            name: row.name,
            description: row.description,
            ingredients: row.ingredients,
            calories: row.calories,
            price: row.price,
            quantity: row.quantity,
            servings: row.servings,
            veg_flag: row.veg_flag,
            kind: row.kind,
            active: row.active,
        }
    }
}

/// Repository for menu items.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, cafe_id: CafeId, item: &NewItem) -> Result<Item, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, cafe_id, item).await
    }

    /// Insert many items in one transaction; either all are created or none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create_many(
        &self,
        cafe_id: CafeId,
        items: &[NewItem],
    ) -> Result<Vec<Item>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            created.push(insert(&mut tx, cafe_id, item).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Get an item by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Active items of a cafe, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        cafe_id: CafeId,
        query: Option<&str>,
    ) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS} FROM items
            WHERE cafe_id = $1 AND active AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY name, id
            "
        ))
        .bind(cafe_id)
        .bind(query.map(like_pattern))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Soft-deactivate an item of the given cafe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item is not on that cafe's menu.
    pub async fn deactivate(&self, cafe_id: CafeId, id: ItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE items SET active = FALSE WHERE id = $1 AND cafe_id = $2")
            .bind(id)
            .bind(cafe_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert(
    conn: &mut PgConnection,
    cafe_id: CafeId,
    item: &NewItem,
) -> Result<Item, RepositoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        r"
        INSERT INTO items
            (cafe_id, name, description, ingredients, calories, price, quantity, servings, veg_flag, kind)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {ITEM_COLUMNS}
        "
    ))
    .bind(cafe_id)
    .bind(item.name.trim())
    .bind(&item.description)
    .bind(&item.ingredients)
    .bind(item.calories)
    .bind(item.price)
    .bind(&item.quantity)
    .bind(item.servings)
    .bind(item.veg_flag)
    .bind(&item.kind)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}
