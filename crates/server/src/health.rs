use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use minimart_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

const STORE_TABLES: &[&str] = &["users", "products", "carts", "cart_items"];

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Serves `/health` on its own listener so readiness probes stay reachable
/// independently of the API port.
pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "minimart-server runtime initialized".to_string(),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Checks connectivity and that the migrated store tables are present, so a
/// pool pointed at an empty or stale database reports degraded rather than
/// failing on the first real request.
async fn database_check(pool: &DbPool) -> HealthCheck {
    let placeholders = vec!["?"; STORE_TABLES.len()].join(", ");
    let query = format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
    );
    let mut table_count = sqlx::query_scalar::<_, i64>(&query);
    for table in STORE_TABLES {
        table_count = table_count.bind(table);
    }

    match table_count.fetch_one(pool).await {
        Ok(count) if count == STORE_TABLES.len() as i64 => HealthCheck {
            status: "ready",
            detail: "database reachable, schema present".to_string(),
        },
        Ok(count) => HealthCheck {
            status: "degraded",
            detail: format!(
                "database reachable but schema incomplete ({count}/{} store tables)",
                STORE_TABLES.len()
            ),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
