//! Memo Board Service — HTTP API over a pluggable memo store.

pub mod config;
pub mod db;
pub mod file_store;
pub mod routes;

use axum::routing::{delete, get};
use config::{Backend, Config};
use memo_board_types::{MemoError, MemoStore, MemoryStore};
use routes::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Opens the store selected by `config.backend`.
pub async fn open_store(config: &Config) -> Result<Arc<dyn MemoStore>, MemoError> {
    let store: Arc<dyn MemoStore> = match config.backend {
        Backend::Sqlite => {
            log::info!("Opening database at: {}", config.db_path);
            Arc::new(db::SqliteStore::open(&config.db_path, config.locale)?)
        }
        Backend::Json => {
            log::info!("Using memo document at: {}", config.data_path.display());
            Arc::new(file_store::JsonFileStore::open(&config.data_path, config.locale).await?)
        }
        Backend::Memory => {
            log::warn!("Using in-memory store; memos are lost on shutdown");
            Arc::new(MemoryStore::new(config.locale))
        }
    };
    Ok(store)
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> axum::Router {
    let cors = tower_http::cors::CorsLayer::permissive();

    axum::Router::new()
        .route(
            "/memos",
            get(routes::list_memos)
                .post(routes::create_memo)
                .put(routes::add_comment)
                .delete(routes::delete_by_query),
        )
        .route("/memos/:id", delete(routes::delete_by_path))
        .route("/status", get(routes::status))
        .with_state(state)
        .layer(tower_http::timeout::TimeoutLayer::new(request_timeout))
        .layer(cors)
}
