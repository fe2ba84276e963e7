use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use minimart_core::domain::cart::{
    Cart, CartId, CartItem, CartItemDetail, CartItemId, ItemUpdate,
};
use minimart_core::domain::product::{Product, ProductId};
use minimart_core::domain::user::UserId;

use super::{parse_decimal, parse_timestamp, CartRepository, StoreError};
use crate::DbPool;

pub struct SqlCartRepository {
    pool: DbPool,
}

impl SqlCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at, updated_at
             FROM carts
             WHERE user_id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(cart_from_row).transpose()
    }

    /// Scoped lookup: the item must live in the given cart. A miss here is
    /// indistinguishable from true absence, which is what keeps one user from
    /// probing another user's item ids.
    async fn find_item_in_cart(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query(
            "SELECT id, cart_id, product_id, quantity, added_at
             FROM cart_items
             WHERE id = ? AND cart_id = ?",
        )
        .bind(item_id.0)
        .bind(cart_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(item_from_row).transpose()
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(cart_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CartRepository for SqlCartRepository {
    async fn get_or_create(&self, user_id: UserId) -> Result<Cart, StoreError> {
        // Conditional insert instead of read-check-create: two concurrent
        // first-time requests race on the carts.user_id unique index, and
        // DO NOTHING turns the loser into a no-op rather than an error. The
        // follow-up select observes whichever row won.
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO carts (user_id, created_at, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id.0)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_cart_by_user(user_id).await?.ok_or(StoreError::NotFound("cart"))
    }

    async fn get_with_items(
        &self,
        user_id: UserId,
    ) -> Result<(Cart, Vec<CartItemDetail>), StoreError> {
        let cart = self.get_or_create(user_id).await?;

        let rows = sqlx::query(
            "SELECT
                ci.id AS item_id,
                ci.cart_id,
                ci.product_id,
                ci.quantity,
                ci.added_at,
                p.title,
                p.description,
                p.price,
                p.is_published,
                p.seller_id,
                p.created_at AS product_created_at
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.cart_id = ?
             ORDER BY ci.added_at ASC, ci.id ASC",
        )
        .bind(cart.id.0)
        .fetch_all(&self.pool)
        .await?;

        let items =
            rows.into_iter().map(detail_from_row).collect::<Result<Vec<_>, StoreError>>()?;
        Ok((cart, items))
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError> {
        if quantity < 1 {
            return Err(StoreError::Invalid("quantity must be at least 1".to_string()));
        }

        let product_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?)")
                .bind(product_id.0)
                .fetch_one(&self.pool)
                .await?;
        if product_exists == 0 {
            return Err(StoreError::NotFound("product"));
        }

        let cart = self.get_or_create(user_id).await?;

        // Merge-on-add: the UNIQUE(cart_id, product_id) index keeps one row
        // per product, and a repeated add accumulates into it. No upper bound
        // on the resulting quantity.
        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity, added_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(cart_id, product_id)
             DO UPDATE SET quantity = quantity + excluded.quantity",
        )
        .bind(cart.id.0)
        .bind(product_id.0)
        .bind(quantity)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.touch(cart.id).await?;

        let row = sqlx::query(
            "SELECT id, cart_id, product_id, quantity, added_at
             FROM cart_items
             WHERE cart_id = ? AND product_id = ?",
        )
        .bind(cart.id.0)
        .bind(product_id.0)
        .fetch_one(&self.pool)
        .await?;

        item_from_row(row)
    }

    async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: Option<i64>,
    ) -> Result<ItemUpdate, StoreError> {
        let cart =
            self.find_cart_by_user(user_id).await?.ok_or(StoreError::NotFound("cart"))?;
        let item = self
            .find_item_in_cart(cart.id, item_id)
            .await?
            .ok_or(StoreError::NotFound("cart item"))?;

        let Some(new_quantity) = quantity else {
            // No quantity supplied: deliberate no-op.
            return Ok(ItemUpdate::Updated(item));
        };

        if new_quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE id = ?")
                .bind(item_id.0)
                .execute(&self.pool)
                .await?;
            self.touch(cart.id).await?;
            return Ok(ItemUpdate::Removed);
        }

        sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ?")
            .bind(new_quantity)
            .bind(item_id.0)
            .execute(&self.pool)
            .await?;
        self.touch(cart.id).await?;

        Ok(ItemUpdate::Updated(CartItem { quantity: new_quantity, ..item }))
    }

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), StoreError> {
        let cart =
            self.find_cart_by_user(user_id).await?.ok_or(StoreError::NotFound("cart"))?;

        let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
            .bind(item_id.0)
            .bind(cart.id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("cart item"));
        }

        self.touch(cart.id).await?;
        Ok(())
    }

    async fn clear(&self, user_id: UserId) -> Result<(), StoreError> {
        let cart =
            self.find_cart_by_user(user_id).await?.ok_or(StoreError::NotFound("cart"))?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart.id.0)
            .execute(&self.pool)
            .await?;

        self.touch(cart.id).await?;
        Ok(())
    }
}

fn cart_from_row(row: SqliteRow) -> Result<Cart, StoreError> {
    Ok(Cart {
        id: CartId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn item_from_row(row: SqliteRow) -> Result<CartItem, StoreError> {
    Ok(CartItem {
        id: CartItemId(row.try_get("id")?),
        cart_id: CartId(row.try_get("cart_id")?),
        product_id: ProductId(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        added_at: parse_timestamp("added_at", row.try_get("added_at")?)?,
    })
}

fn detail_from_row(row: SqliteRow) -> Result<CartItemDetail, StoreError> {
    let product_id = ProductId(row.try_get("product_id")?);
    Ok(CartItemDetail {
        item: CartItem {
            id: CartItemId(row.try_get("item_id")?),
            cart_id: CartId(row.try_get("cart_id")?),
            product_id,
            quantity: row.try_get("quantity")?,
            added_at: parse_timestamp("added_at", row.try_get("added_at")?)?,
        },
        product: Product {
            id: product_id,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: parse_decimal("price", row.try_get("price")?)?,
            is_published: row.try_get("is_published")?,
            seller_id: UserId(row.try_get("seller_id")?),
            created_at: parse_timestamp(
                "product_created_at",
                row.try_get("product_created_at")?,
            )?,
        },
    })
}
