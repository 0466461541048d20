use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gamescape_common::{Config, EntityKind, GamescapeError};
use gamescape_domains::{
    DomainRegistry, GameService, LibraryListService, LibraryService, PlayerService,
};
use gamescape_graph::{GraphAssembler, SelectRequest};
use gamescape_identity::{PgStorage, Storage};
use steam_client::{MemoryCache, SteamApi, SteamClient};

// --- App State ---

struct AppState {
    assembler: GraphAssembler,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gamescape=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let storage = PgStorage::new(pool);
    storage.migrate().await?;
    let storage: Arc<dyn Storage> = Arc::new(storage);

    let steam: Arc<dyn SteamApi> = Arc::new(SteamClient::new(
        &config.steam_api_base,
        &config.steam_api_key,
        Arc::new(MemoryCache::new()),
    ));

    let players = Arc::new(PlayerService::new(storage.clone(), steam.clone()));
    let registry = DomainRegistry::new()
        .with(players.clone())
        .with(Arc::new(LibraryService::new(storage.clone(), steam.clone())))
        .with(Arc::new(LibraryListService::new(storage.clone())))
        .with(Arc::new(GameService::new(storage, steam)));

    let state = Arc::new(AppState {
        assembler: GraphAssembler::new(registry, players),
    });

    let app = Router::new()
        .route("/api/{domain}/select", post(select))
        .route("/api/{domain}/selectByInternalId", get(select_by_internal_id))
        .route("/api/player/friends", post(player_friends))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Gamescape web server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

async fn select(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    Json(request): Json<SelectRequest>,
) -> Response {
    let Some(kind) = parse_domain(&domain) else {
        return unknown_domain(&domain);
    };
    match state.assembler.select(kind, request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

async fn player_friends(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Response {
    match state.assembler.expand_friends(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectByInternalId {
    internal_id: Uuid,
}

async fn select_by_internal_id(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    Query(params): Query<SelectByInternalId>,
) -> Response {
    let Some(kind) = parse_domain(&domain) else {
        return unknown_domain(&domain);
    };
    match state
        .assembler
        .select_by_internal_id(kind, params.internal_id)
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

fn parse_domain(domain: &str) -> Option<EntityKind> {
    match domain {
        "player" => Some(EntityKind::Player),
        "library" => Some(EntityKind::Library),
        "library-list" => Some(EntityKind::LibraryList),
        "game" => Some(EntityKind::Game),
        _ => None,
    }
}

fn unknown_domain(domain: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": format!("unknown domain: {domain}")})),
    )
        .into_response()
}

fn error_response(err: GamescapeError) -> Response {
    let status = match &err {
        GamescapeError::Validation(_) => StatusCode::BAD_REQUEST,
        GamescapeError::NotFound { .. } => StatusCode::NOT_FOUND,
        GamescapeError::IdentityConflict { .. } => StatusCode::CONFLICT,
        GamescapeError::Upstream(_) => StatusCode::BAD_GATEWAY,
        GamescapeError::Storage(_) | GamescapeError::Anyhow(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        error!(error = %err, "Request aborted");
    } else {
        warn!(error = %err, "Request rejected");
    }
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}
