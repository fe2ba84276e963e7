use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use minimart_core::domain::product::{NewProduct, Product, ProductId, ProductPatch};
use minimart_db::repositories::{CatalogRepository, SqlCatalogRepository};

use super::auth::AuthUser;
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

/// Partial update. `description` distinguishes "absent" (leave unchanged) from
/// an explicit `null` (clear the stored value).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nested_option")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub is_published: Option<bool>,
}

fn nested_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let repository = SqlCatalogRepository::new(state.pool.clone());
    let products = repository.list(query.search.as_deref()).await?;
    Ok(Json(products))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let repository = SqlCatalogRepository::new(state.pool.clone());
    let product = repository
        .find_by_id(ProductId(id))
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "product not found"))?;
    Ok(Json(product))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let repository = SqlCatalogRepository::new(state.pool.clone());
    let product = repository
        .create(
            user.id,
            NewProduct {
                title: request.title,
                description: request.description,
                price: request.price,
                is_published: request.is_published,
            },
        )
        .await?;

    tracing::info!(
        event_name = "store.product.created",
        product_id = product.id.0,
        seller_id = user.id.0,
        "product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let repository = SqlCatalogRepository::new(state.pool.clone());
    let patch = ProductPatch {
        title: request.title,
        description: request.description,
        price: request.price,
        is_published: request.is_published,
    };
    let product = repository.update(ProductId(id), user.id, patch).await?;
    Ok(Json(product))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repository = SqlCatalogRepository::new(state.pool.clone());
    repository.delete(ProductId(id), user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
