use std::{path::Path, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get},
    Json, Router,
};
use configs::{AppConfig, CorruptPolicy};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::storage::CollectionStore;

pub mod guard;
pub mod storage;

/// Knobs of the storage endpoints taken from configuration.
#[derive(Clone, Debug)]
pub struct FacadeSettings {
    pub on_corrupt: CorruptPolicy,
    pub api_key: Option<String>,
    pub max_body_bytes: usize,
}

impl FacadeSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            on_corrupt: cfg.storage.on_corrupt,
            api_key: cfg.auth.api_key.clone(),
            max_body_bytes: cfg.server.max_body_bytes,
        }
    }
}

impl Default for FacadeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CollectionStore>,
    pub settings: FacadeSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn CollectionStore>, settings: FacadeSettings) -> Self {
        Self { store, settings }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Storage paths that do not name exactly one key. They answer with the
/// invalid-key error instead of reaching the static fallback.
const MALFORMED_STORAGE_PATHS: [&str; 4] = [
    "/api/storage",
    "/api/storage/",
    "/api/storage/:key/",
    "/api/storage/:key/*rest",
];

/// Build the application router: storage API, health, and static assets when
/// a frontend bundle is available.
pub fn build_router(state: AppState, cors: CorsLayer, frontend_dir: Option<&Path>) -> Router {
    let mut api = Router::new().route(
        "/api/storage/:key",
        get(storage::load_collection)
            .post(storage::save_collection)
            .put(storage::save_collection),
    );
    for path in MALFORMED_STORAGE_PATHS {
        api = api.route(path, any(storage::reject_malformed_path));
    }
    let api = api
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_api_key,
        ))
        .layer(DefaultBodyLimit::max(state.settings.max_body_bytes));

    let mut app = Router::new().route("/health", get(health)).merge(api);

    if let Some(dir) = frontend_dir {
        let static_dir = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(static_dir);
    }

    app.with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 5xx 以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
