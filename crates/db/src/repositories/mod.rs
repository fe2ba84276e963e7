use async_trait::async_trait;
use thiserror::Error;

use minimart_core::domain::cart::{Cart, CartItem, CartItemDetail, CartItemId, ItemUpdate};
use minimart_core::domain::product::{NewProduct, Product, ProductId, ProductPatch};
use minimart_core::domain::user::{NewUser, User, UserId};

pub mod cart;
pub mod product;
pub mod user;

pub use cart::SqlCartRepository;
pub use product::SqlCatalogRepository;
pub use user::SqlUserRepository;

/// Error taxonomy for the store layer. Every service operation surfaces these
/// directly to the HTTP layer with no local recovery or retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist, or a cart-item lookup was scoped to
    /// a cart the caller does not own. The two cases are deliberately
    /// indistinguishable so one user cannot probe for another user's items.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Authenticated caller is not the owner of the resource.
    #[error("not authorized to perform requested action")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Maps a unique-index violation to `Conflict`, passing everything else
/// through as a database error.
pub(crate) fn conflict_on_unique(error: sqlx::Error, detail: &str) -> StoreError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            StoreError::Conflict(detail.to_string())
        }
        _ => StoreError::Database(error),
    }
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    chrono::DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&chrono::Utc))
        .map_err(|error| {
            StoreError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        })
}

pub(crate) fn parse_decimal(
    column: &str,
    value: String,
) -> Result<rust_decimal::Decimal, StoreError> {
    use std::str::FromStr;

    rust_decimal::Decimal::from_str(&value).map_err(|error| {
        StoreError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn delete(&self, id: UserId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Product>, StoreError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn create(&self, seller_id: UserId, product: NewProduct) -> Result<Product, StoreError>;
    async fn update(
        &self,
        id: ProductId,
        caller_id: UserId,
        patch: ProductPatch,
    ) -> Result<Product, StoreError>;
    async fn delete(&self, id: ProductId, caller_id: UserId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn get_or_create(&self, user_id: UserId) -> Result<Cart, StoreError>;
    async fn get_with_items(
        &self,
        user_id: UserId,
    ) -> Result<(Cart, Vec<CartItemDetail>), StoreError>;
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError>;
    async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: Option<i64>,
    ) -> Result<ItemUpdate, StoreError>;
    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), StoreError>;
    async fn clear(&self, user_id: UserId) -> Result<(), StoreError>;
}
