//! Menugate REST API Server
//!
//! Run with: cargo run --features server --bin menugate-server
//!
//! Endpoints:
//!   GET  /status                                  - Bootstrap status
//!   POST /bootstrap                               - Seed default catalogue
//!   GET  /menus/tree                              - Full menu tree
//!   POST /roles/menus                             - Replace a role's menus
//!   GET  /roles/:role_id/menus                    - Role grants with masks
//!   GET  /roles/:role_id/menu-ids                 - Role grant menu ids
//!   POST /stores/menus                            - Replace a store role's overrides
//!   GET  /stores/:store_id/roles/:role_id/menus   - Store role overrides
//!   POST /stores/copy                             - Copy overrides between stores
//!   GET  /me/menus                                - Caller's pruned menu tree
//!   GET  /me/permissions                          - Caller's permission codes
//!
//! The caller is identified by `X-Role-Id`, `X-Store-Id` and `X-Role-Code`,
//! set by the authenticating proxy in front of this service.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use menugate::{
    bootstrap, AssignRoleMenus, AssignStoreRoleMenus, Config, CopyStoreMenus, Error, MenuGate, MenuGrantInfo,
    MenuTreeItem, UserContext, UserMenuNode, ValidationIssue,
};

type AppState = Arc<MenuGate>;

// ============================================================================
// Response Envelope
// ============================================================================

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<ValidationIssue>,
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse { success: true, data: Some(data), error: None, issues: Vec::new() }))
}

fn fail<T>(e: Error) -> Reply<T> {
    let status = match &e {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        Error::Integrity(_) | Error::Storage(_) => {
            tracing::error!(error = %e, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let issues = e.issues().to_vec();
    (status, Json(ApiResponse { success: false, data: None, error: Some(e.to_string()), issues }))
}

fn reply<T>(r: menugate::Result<T>) -> Reply<T> {
    match r {
        Ok(v) => ok(v),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Caller
// ============================================================================

struct Caller(UserContext);

fn header<T: std::str::FromStr>(h: &HeaderMap, name: &str) -> Option<T> {
    h.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let h = &parts.headers;
        match (header(h, "x-role-id"), header(h, "x-store-id"), header::<String>(h, "x-role-code")) {
            (Some(role_id), Some(store_id), Some(code)) => Ok(Caller(UserContext::new(role_id, store_id, code))),
            _ => Err((StatusCode::UNAUTHORIZED, "missing caller headers")),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct StatusRes {
    bootstrapped: bool,
}

async fn get_status(State(gate): State<AppState>) -> Reply<StatusRes> {
    reply(gate.storage().read(|v| v.is_bootstrapped()).map(|bootstrapped| StatusRes { bootstrapped }))
}

async fn post_bootstrap(State(gate): State<AppState>) -> Reply<&'static str> {
    reply(bootstrap(gate.storage()).map(|_| "bootstrapped"))
}

async fn get_menu_tree(State(gate): State<AppState>) -> Reply<Vec<MenuTreeItem>> {
    reply(gate.menu_tree())
}

async fn post_role_menus(State(gate): State<AppState>, Json(req): Json<AssignRoleMenus>) -> Reply<&'static str> {
    reply(gate.assign_role_menus(&req).map(|_| "assigned"))
}

async fn get_role_menus(State(gate): State<AppState>, Path(role_id): Path<u64>) -> Reply<Vec<MenuGrantInfo>> {
    reply(gate.role_menus(role_id))
}

async fn get_role_menu_ids(State(gate): State<AppState>, Path(role_id): Path<u64>) -> Reply<Vec<u64>> {
    reply(gate.role_menu_ids(role_id))
}

async fn post_store_menus(State(gate): State<AppState>, Json(req): Json<AssignStoreRoleMenus>) -> Reply<&'static str> {
    reply(gate.assign_store_role_menus(&req).map(|_| "assigned"))
}

async fn get_store_menus(
    State(gate): State<AppState>,
    Path((store_id, role_id)): Path<(u64, u64)>,
) -> Reply<Vec<MenuGrantInfo>> {
    reply(gate.store_role_menus(store_id, role_id))
}

async fn post_copy(State(gate): State<AppState>, Json(req): Json<CopyStoreMenus>) -> Reply<usize> {
    reply(gate.copy_store_menus(&req))
}

async fn get_my_menus(State(gate): State<AppState>, Caller(user): Caller) -> Reply<Vec<UserMenuNode>> {
    reply(gate.user_menu_tree(&user))
}

async fn get_my_permissions(State(gate): State<AppState>, Caller(user): Caller) -> Reply<Vec<String>> {
    reply(gate.user_permission_codes(&user))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(db = %config.db_path, "opening database");
    let gate = Arc::new(MenuGate::open(&config)?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/bootstrap", post(post_bootstrap))
        .route("/menus/tree", get(get_menu_tree))
        .route("/roles/menus", post(post_role_menus))
        .route("/roles/:role_id/menus", get(get_role_menus))
        .route("/roles/:role_id/menu-ids", get(get_role_menu_ids))
        .route("/stores/menus", post(post_store_menus))
        .route("/stores/:store_id/roles/:role_id/menus", get(get_store_menus))
        .route("/stores/copy", post(post_copy))
        .route("/me/menus", get(get_my_menus))
        .route("/me/permissions", get(get_my_permissions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gate);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "menugate server running");
    axum::serve(listener, app).await?;
    Ok(())
}
