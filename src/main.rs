// Entry point: wires a storage backend and emoji file into a `PoolManager`,
// starts its background workers, and serves the stats/health router.
//
// The storage and site-resolution backends are external collaborators by
// design (spec'd as out-of-scope); this binary wires the in-memory doubles
// so the crate is runnable end to end. A real deployment supplies its own
// `Storage` and `SiteResolver` implementations.

use seo_render_pools::emoji::EmojiStore;
use seo_render_pools::pool::{PoolConfig, PoolManager};
use seo_render_pools::storage::InMemoryStorage;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_thread_ids(true).with_target(false).init();

    let emoji_path = std::env::var("EMOJI_FILE").unwrap_or_default();
    let emojis = if emoji_path.is_empty() {
        Arc::new(EmojiStore::from_items(vec!["🔥".into(), "✨".into(), "🚀".into()]))
    } else {
        Arc::new(EmojiStore::load(&emoji_path)?)
    };

    let config = PoolConfig::default();
    let storage = InMemoryStorage::new(config.clone());

    let pool = Arc::new(PoolManager::new(config, storage, emojis)?);
    pool.start().await?;
    info!("pool manager started");

    let app = seo_render_pools::api::router(pool.clone());
    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    pool.stop().await;
    info!("pool manager stopped");
    Ok(())
}
