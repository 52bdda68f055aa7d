//! Memo Board Service — standalone binary serving the memo board API.
//!
//! Default: http://127.0.0.1:9103/memos

use memo_board_service::config::Config;
use memo_board_service::routes::AppState;
use memo_board_types::MemoStore;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let store = memo_board_service::open_store(&config)
        .await
        .expect("Failed to open memo store");
    log::info!(
        "Memo store ready (backend: {}, locale: {})",
        store.backend(),
        config.locale
    );

    let state = Arc::new(AppState::new(store));
    let app = memo_board_service::router(state, config.request_timeout);

    let addr = config.listen_addr();
    log::info!("Memo Board Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
