pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod rate_limit;
pub mod registry;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .fallback_service(ServeDir::new(&web_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}
