use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_core::auth::AuthError;
use minimart_core::domain::user::{NewUser, User};
use minimart_core::{hash_password, verify_password};
use minimart_db::repositories::{SqlUserRepository, UserRepository};

use super::auth::AuthUser;
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let password_hash = hash_password(&request.password)
        .map_err(|_| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "password must not be empty"))?;

    let repository = SqlUserRepository::new(state.pool.clone());
    let user = repository
        .create(NewUser {
            name: request.name,
            email: request.email,
            password_hash,
            is_active: true,
        })
        .await?;

    tracing::info!(event_name = "store.user.registered", user_id = user.id.0, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Exchanges credentials for a bearer token. Unknown email, wrong password,
/// and deactivated account all answer the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let repository = SqlUserRepository::new(state.pool.clone());
    let user = repository
        .find_by_email(&request.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !verify_password(&user.password_hash, &request.password)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let access_token = state.signer.issue(user.id)?;

    tracing::info!(event_name = "store.user.logged_in", user_id = user.id.0, "login succeeded");

    Ok(Json(TokenResponse { access_token, token_type: "bearer" }))
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;

    use minimart_core::auth::TokenSigner;
    use minimart_db::{connect_with_settings, migrations};

    use crate::routes::auth::AuthUser;
    use crate::routes::AppState;

    use super::{login, me, register, LoginRequest, RegisterRequest};

    async fn setup() -> AppState {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        AppState { pool, signer: TokenSigner::new(&"test-secret".to_string().into(), 30) }
    }

    fn ada() -> RegisterRequest {
        RegisterRequest {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2!".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_and_fetch_self() {
        let state = setup().await;

        let (status, Json(user)) =
            register(State(state.clone()), Json(ada())).await.expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.email, "ada@example.com");

        let Json(token) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter2!".to_string(),
            }),
        )
        .await
        .expect("login");
        assert_eq!(token.token_type, "bearer");

        let claims = state.signer.verify(&token.access_token).expect("verify");
        assert_eq!(claims.user_id(), user.id);

        let Json(current) = me(AuthUser(user.clone())).await;
        assert_eq!(current, user);

        state.pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let state = setup().await;

        register(State(state.clone()), Json(ada())).await.expect("first register");
        let error =
            register(State(state.clone()), Json(ada())).await.err().expect("second register");
        assert_eq!(error.status(), StatusCode::CONFLICT);

        state.pool.close().await;
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_401() {
        let state = setup().await;
        register(State(state.clone()), Json(ada())).await.expect("register");

        let error = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await
        .err()
        .expect("wrong password");
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);

        let error = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "hunter2!".to_string(),
            }),
        )
        .await
        .err()
        .expect("unknown email");
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);

        state.pool.close().await;
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let state = setup().await;
        register(State(state.clone()), Json(ada())).await.expect("register");

        sqlx::query("UPDATE users SET is_active = 0 WHERE email = 'ada@example.com'")
            .execute(&state.pool)
            .await
            .expect("deactivate");

        let error = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter2!".to_string(),
            }),
        )
        .await
        .err()
        .expect("inactive");
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);

        state.pool.close().await;
    }
}
