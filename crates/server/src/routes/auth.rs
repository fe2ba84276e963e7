use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use minimart_core::domain::user::User;
use minimart_db::repositories::{SqlUserRepository, UserRepository};

use super::{ApiError, AppState};

/// Authenticated caller, resolved from the `Authorization: Bearer` header.
///
/// Verification order: header present and well-formed, token signature and
/// expiry valid, user row still present, user still active. Any failure is a
/// uniform 401 so callers cannot distinguish a revoked account from a bad
/// token.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;
        let token = header_value.strip_prefix("Bearer ").ok_or_else(ApiError::unauthorized)?;

        let claims = state.signer.verify(token)?;

        let repository = SqlUserRepository::new(state.pool.clone());
        let user = repository
            .find_by_id(claims.user_id())
            .await
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::unauthorized)?;

        if !user.is_active {
            return Err(ApiError::unauthorized());
        }

        Ok(AuthUser(user))
    }
}
