use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use witwager::{
    api, broadcast,
    config::{GameConfig, ServerConfig},
    questions::QuestionBank,
    state::AppState,
    store::{DocumentStore, MirroredStore, RestStore},
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "witwager=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wit & Wager...");

    let server_config = ServerConfig::from_env();
    let game_config = GameConfig::from_env();

    let questions = match &server_config.questions_path {
        Some(path) => match QuestionBank::from_path(path) {
            Ok(bank) => bank,
            Err(e) => {
                tracing::warn!("Failed to load {}: {}. Using built-in questions.", path.display(), e);
                QuestionBank::builtin().expect("built-in question bank is valid")
            }
        },
        None => QuestionBank::builtin().expect("built-in question bank is valid"),
    };

    let store = match &server_config.remote_store {
        Some(remote) => match RestStore::new(remote) {
            Ok(rest) => {
                tracing::info!(
                    "Using {} store at {}/{}",
                    rest.name(),
                    remote.base_url,
                    remote.collection
                );
                MirroredStore::with_remote(Arc::new(rest))
            }
            Err(e) => {
                tracing::warn!("Failed to set up shared store: {}. Rooms will be local.", e);
                MirroredStore::local_only()
            }
        },
        None => MirroredStore::local_only(),
    };

    // Settle the mode before the first room is created
    if store.has_remote() {
        if let Err(e) = store.health_check().await {
            tracing::warn!("Shared store unreachable at startup: {}. Rooms will be local.", e);
        }
    }

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(questions),
        game_config,
    ));

    // Bots play local rooms, the host heckles idle ones
    broadcast::spawn_bot_driver(state.clone());
    broadcast::spawn_idle_commentator(state.clone());

    // Fall back to local mode and reconcile when the shared store flaps
    broadcast::spawn_store_supervisor(state.clone());

    let api_routes = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/rooms/{code}", get(api::get_room))
        .route("/api/rooms/{code}/export", get(api::export_room))
        .route("/api/rooms/{code}/import", post(api::import_room));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api_routes)
        .fallback_service(ServeDir::new(&server_config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", server_config.bind_addr);

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
        .await
        .unwrap();
    axum::serve(listener, app).await.unwrap();
}
