// Thin observability surface: this crate produces pool statistics, it does
// not own an admin dashboard. `GET /pools/stats` exposes
// `PoolManager::get_data_pools_stats` as JSON; `GET /health` is a liveness
// probe. No other routing, auth, or admin CRUD lives here.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::pool::manager::PoolManager;
use crate::pool::stats::{ConsumableGroupStatus, PoolKind, PoolStatus};

/// OpenAPI document for this crate's observability surface, in the
/// teacher's `rest_api.rs` style of annotating every route it serves,
/// reduced here to the two read-only routes the Non-goals leave in scope.
#[derive(OpenApi)]
#[openapi(
    paths(pools_stats, health),
    components(schemas(
        PoolStatus,
        PoolKind,
        ConsumableGroupStatus,
        crate::pool::object_pool::ObjectPoolStats
    ))
)]
pub struct ApiDoc;

pub fn router(pool: Arc<PoolManager>) -> Router {
    Router::new()
        .route("/pools/stats", get(pools_stats))
        .route("/health", get(health))
        .with_state(pool)
        .layer(TraceLayer::new_for_http())
}

#[utoipa::path(get, path = "/pools/stats", responses((status = 200, body = Vec<PoolStatus>)))]
async fn pools_stats(State(pool): State<Arc<PoolManager>>) -> Json<Vec<PoolStatus>> {
    Json(pool.get_data_pools_stats())
}

#[utoipa::path(get, path = "/health", responses((status = 200, body = String)))]
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiStore;
    use crate::pool::config::PoolConfig;
    use crate::storage::InMemoryStorage;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let config = PoolConfig::default();
        let storage = InMemoryStorage::new(config.clone());
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into()]));
        let pool = Arc::new(PoolManager::new(config, storage, emojis).unwrap());

        let app = router(pool);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
