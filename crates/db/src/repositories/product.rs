use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use minimart_core::domain::product::{NewProduct, Product, ProductId, ProductPatch};
use minimart_core::domain::user::UserId;

use super::{parse_decimal, parse_timestamp, CatalogRepository, StoreError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, title, description, price, is_published, seller_id, created_at";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Loads a product and enforces the seller ownership check shared by
    /// update and delete: absent rows are NotFound before any ownership
    /// consideration, then a non-owner caller is Forbidden.
    async fn find_owned(&self, id: ProductId, caller_id: UserId) -> Result<Product, StoreError> {
        let product = self.find_by_id(id).await?.ok_or(StoreError::NotFound("product"))?;
        if product.seller_id != caller_id {
            return Err(StoreError::Forbidden);
        }
        Ok(product)
    }
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::Invalid("title must not be empty".to_string()));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), StoreError> {
    if price < Decimal::ZERO {
        return Err(StoreError::Invalid("price must not be negative".to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Product>, StoreError> {
        // Visibility is not filtered here: unpublished products are listed
        // alongside published ones. SQLite LIKE is case-insensitive for
        // ASCII, which is the substring-match contract of the search.
        let rows = if let Some(term) = search {
            sqlx::query(&format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products
                 WHERE title LIKE '%' || ? || '%'
                 ORDER BY id ASC"
            ))
            .bind(term)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products
                 ORDER BY id ASC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(product_from_row).collect()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products
             WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(product_from_row).transpose()
    }

    async fn create(&self, seller_id: UserId, product: NewProduct) -> Result<Product, StoreError> {
        validate_title(&product.title)?;
        validate_price(product.price)?;

        let result = sqlx::query(
            "INSERT INTO products (title, description, price, is_published, seller_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(product.title.trim())
        .bind(product.description.as_deref())
        .bind(product.price.to_string())
        .bind(product.is_published)
        .bind(seller_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = ProductId(result.last_insert_rowid());
        self.find_by_id(id).await?.ok_or(StoreError::NotFound("product"))
    }

    async fn update(
        &self,
        id: ProductId,
        caller_id: UserId,
        patch: ProductPatch,
    ) -> Result<Product, StoreError> {
        let mut product = self.find_owned(id, caller_id).await?;

        if patch.is_empty() {
            return Ok(product);
        }

        patch.apply_to(&mut product);
        validate_title(&product.title)?;
        validate_price(product.price)?;

        // seller_id is immutable after creation and deliberately not part of
        // the update statement.
        sqlx::query(
            "UPDATE products
             SET title = ?, description = ?, price = ?, is_published = ?
             WHERE id = ?",
        )
        .bind(product.title.trim())
        .bind(product.description.as_deref())
        .bind(product.price.to_string())
        .bind(product.is_published)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or(StoreError::NotFound("product"))
    }

    async fn delete(&self, id: ProductId, caller_id: UserId) -> Result<(), StoreError> {
        self.find_owned(id, caller_id).await?;

        sqlx::query("DELETE FROM products WHERE id = ?").bind(id.0).execute(&self.pool).await?;

        Ok(())
    }
}

fn product_from_row(row: SqliteRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: parse_decimal("price", row.try_get("price")?)?,
        is_published: row.try_get("is_published")?,
        seller_id: UserId(row.try_get("seller_id")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use minimart_core::domain::product::{NewProduct, ProductId, ProductPatch};
    use minimart_core::domain::user::UserId;

    use super::SqlCatalogRepository;
    use crate::migrations;
    use crate::repositories::{CatalogRepository, StoreError};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn insert_user(pool: &DbPool, email: &str) -> UserId {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_active, created_at)
             VALUES ('Seller', ?, 'hash', 1, '2026-01-01T00:00:00Z')",
        )
        .bind(email)
        .execute(pool)
        .await
        .expect("insert user");
        UserId(result.last_insert_rowid())
    }

    fn widget(title: &str) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: Some("demo item".to_string()),
            price: Decimal::new(999, 2),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn created_product_belongs_to_the_caller() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        let product = repo.create(seller, widget("Widget")).await.expect("create");

        assert_eq!(product.title, "Widget");
        assert_eq!(product.seller_id, seller);
        assert_eq!(product.price, Decimal::new(999, 2));
        assert!(product.is_published);

        pool.close().await;
    }

    #[tokio::test]
    async fn negative_price_and_blank_title_are_rejected() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        let negative = NewProduct { price: Decimal::new(-1, 2), ..widget("Widget") };
        assert!(matches!(
            repo.create(seller, negative).await.expect_err("negative price"),
            StoreError::Invalid(_)
        ));

        let blank = widget("   ");
        assert!(matches!(
            repo.create(seller, blank).await.expect_err("blank title"),
            StoreError::Invalid(_)
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn search_matches_title_substring_case_insensitively() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        repo.create(seller, widget("Blue Widget")).await.expect("create");
        repo.create(seller, widget("Red Gadget")).await.expect("create");
        repo.create(
            seller,
            NewProduct { is_published: false, ..widget("Hidden Widget") },
        )
        .await
        .expect("create");

        let widgets = repo.list(Some("wIdGeT")).await.expect("search");
        let titles: Vec<&str> = widgets.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Blue Widget", "Hidden Widget"]);

        let none = repo.list(Some("sprocket")).await.expect("search");
        assert!(none.is_empty());

        let all = repo.list(None).await.expect("list");
        assert_eq!(all.len(), 3, "unpublished products are listed too");

        pool.close().await;
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        let product = repo.create(seller, widget("Widget")).await.expect("create");

        let updated = repo
            .update(
                product.id,
                seller,
                ProductPatch { price: Some(Decimal::new(1250, 2)), ..ProductPatch::default() },
            )
            .await
            .expect("update");

        assert_eq!(updated.price, Decimal::new(1250, 2));
        assert_eq!(updated.title, "Widget");
        assert_eq!(updated.description.as_deref(), Some("demo item"));

        let cleared = repo
            .update(
                product.id,
                seller,
                ProductPatch { description: Some(None), ..ProductPatch::default() },
            )
            .await
            .expect("update");
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.price, Decimal::new(1250, 2));

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        let product = repo.create(seller, widget("Widget")).await.expect("create");
        let unchanged =
            repo.update(product.id, seller, ProductPatch::default()).await.expect("update");

        assert_eq!(unchanged, product);

        pool.close().await;
    }

    #[tokio::test]
    async fn non_seller_update_and_delete_are_forbidden() {
        let pool = setup_pool().await;
        let seller = insert_user(&pool, "seller@example.com").await;
        let other = insert_user(&pool, "other@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        let product = repo.create(seller, widget("Widget")).await.expect("create");

        let patch = ProductPatch { title: Some("Stolen".to_string()), ..ProductPatch::default() };
        assert!(matches!(
            repo.update(product.id, other, patch).await.expect_err("update"),
            StoreError::Forbidden
        ));
        assert!(matches!(
            repo.delete(product.id, other).await.expect_err("delete"),
            StoreError::Forbidden
        ));

        // The seller still can.
        repo.delete(product.id, seller).await.expect("seller delete");
        assert!(repo.find_by_id(product.id).await.expect("find").is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_product_is_not_found_before_ownership() {
        let pool = setup_pool().await;
        let caller = insert_user(&pool, "caller@example.com").await;
        let repo = SqlCatalogRepository::new(pool.clone());

        assert!(matches!(
            repo.update(ProductId(404), caller, ProductPatch::default())
                .await
                .expect_err("update"),
            StoreError::NotFound("product")
        ));
        assert!(matches!(
            repo.delete(ProductId(404), caller).await.expect_err("delete"),
            StoreError::NotFound("product")
        ));

        pool.close().await;
    }
}
