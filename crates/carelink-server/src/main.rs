mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use carelink_api::AppStateInner;
use carelink_db::Database;
use carelink_gateway::{Dispatcher, connection};
use carelink_linking::LinkingService;

use crate::config::ServerConfig;

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    jwt_secret: Arc<str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carelink=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        db = %config.db_path.display(),
        code_length = config.code_length,
        code_ttl_hours = ?config.code_ttl_hours,
        "Starting carelink v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let jwt_secret: Arc<str> = Arc::from(config.jwt_secret.as_str());
    let app_state = Arc::new(AppStateInner {
        linking: LinkingService::new(db.clone(), config.linking()),
        db,
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
        token_ttl: config.token_ttl(),
    });

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(GatewayState { dispatcher, jwt_secret });

    let app = carelink_api::router(app_state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("carelink listening on {}", config.http_addr);

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.dispatcher, state.jwt_secret))
}
