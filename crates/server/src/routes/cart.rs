use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minimart_core::domain::cart::{CartItem, CartItemId, ItemUpdate};
use minimart_core::domain::product::{Product, ProductId};
use minimart_core::domain::user::UserId;
use minimart_db::repositories::{CartRepository, SqlCartRepository};

use super::auth::AuthUser;
use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: i64,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<i64>,
}

pub async fn view(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let repository = SqlCartRepository::new(state.pool.clone());
    let (cart, items) = repository.get_with_items(user.id).await?;

    Ok(Json(CartResponse {
        id: cart.id.0,
        user_id: cart.user_id,
        created_at: cart.created_at,
        updated_at: cart.updated_at,
        items: items
            .into_iter()
            .map(|detail| CartItemResponse { item: detail.item, product: detail.product })
            .collect(),
    }))
}

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let repository = SqlCartRepository::new(state.pool.clone());
    let item =
        repository.add_item(user.id, ProductId(request.product_id), request.quantity).await?;

    tracing::info!(
        event_name = "store.cart.item_added",
        user_id = user.id.0,
        product_id = request.product_id,
        quantity = item.quantity,
        "cart item added"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

/// Sets the line quantity. A quantity of zero or below removes the line and
/// answers 204; a positive quantity answers 200 with the updated line.
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Response, ApiError> {
    let repository = SqlCartRepository::new(state.pool.clone());
    let outcome =
        repository.update_item_quantity(user.id, CartItemId(id), request.quantity).await?;

    match outcome {
        ItemUpdate::Updated(item) => Ok(Json(item).into_response()),
        ItemUpdate::Removed => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repository = SqlCartRepository::new(state.pool.clone());
    repository.remove_item(user.id, CartItemId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, ApiError> {
    let repository = SqlCartRepository::new(state.pool.clone());
    repository.clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
