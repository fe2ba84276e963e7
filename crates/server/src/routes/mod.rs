//! HTTP surface of the store.
//!
//! Public endpoints:
//! - `GET  /products`            — list/search the catalog
//! - `GET  /products/{id}`       — fetch one product
//! - `POST /users`               — register
//! - `POST /login`               — exchange credentials for a bearer token
//!
//! Bearer-authenticated endpoints:
//! - `POST   /products`          — create a product owned by the caller
//! - `PUT    /products/{id}`     — partial update, seller only
//! - `DELETE /products/{id}`     — delete, seller only
//! - `GET    /cart`              — caller's cart with items (created on first access)
//! - `POST   /cart/items`        — add an item, merging quantity per product
//! - `PUT    /cart/items/{id}`   — set quantity; zero or below removes the line
//! - `DELETE /cart/items/{id}`   — remove one line
//! - `DELETE /cart/clear`        — remove every line
//! - `GET    /users/me`          — current user

pub mod auth;
pub mod cart;
pub mod products;
pub mod users;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use minimart_core::auth::{AuthError, TokenSigner};
use minimart_core::config::{AppConfig, CorsConfig};
use minimart_db::{DbPool, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub signer: TokenSigner,
}

pub fn router(config: &AppConfig, pool: DbPool) -> Router {
    let state = AppState {
        pool,
        signer: TokenSigner::new(&config.auth.jwt_secret, config.auth.token_ttl_minutes),
    };

    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::fetch).put(products::update).delete(products::remove),
        )
        .route("/cart", get(cart::view))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/{id}", put(cart::update_item).delete(cart::remove_item))
        .route("/cart/clear", delete(cart::clear))
        .route("/users", post(users::register))
        .route("/users/me", get(users::me))
        .route("/login", post(users::login))
        .layer(cors_layer(&config.cors))
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Response-side error: a status code plus a JSON `detail` body, the shape
/// every failing endpoint returns.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "could not validate credentials")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match &error {
            StoreError::NotFound(resource) => {
                Self::new(StatusCode::NOT_FOUND, format!("{resource} not found"))
            }
            StoreError::Forbidden => {
                Self::new(StatusCode::FORBIDDEN, "not authorized to perform requested action")
            }
            StoreError::Conflict(detail) => Self::new(StatusCode::CONFLICT, detail.clone()),
            StoreError::Invalid(detail) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail.clone())
            }
            StoreError::Database(_) | StoreError::Decode(_) => {
                error!(event_name = "system.http.store_error", error = %error, "store operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials | AuthError::InvalidToken => Self::unauthorized(),
            AuthError::Hash(_) => {
                error!(event_name = "system.http.auth_error", error = %error, "auth primitive failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}
