pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod imports;
pub mod migrator;
pub mod services;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::clients::ShippingClient;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::imports::CsvImportService;
use crate::services::{
    AuditService, CatalogService, InventoryService, MerchantService, OrderService, UserService,
    WalletService,
};

/// All service handles shared with the HTTP layer.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub inventory: Arc<InventoryService>,
    pub merchants: Arc<MerchantService>,
    pub wallet: Arc<WalletService>,
    pub orders: Arc<OrderService>,
    pub users: Arc<UserService>,
    pub audit: Arc<AuditService>,
    pub imports: Arc<CsvImportService>,
}

#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub auth_service: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires every service against one database pool and event channel.
    pub fn new(
        db: Arc<DbPool>,
        config: Arc<AppConfig>,
        event_sender: EventSender,
    ) -> Result<Self, ServiceError> {
        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            config.jwt_secret.clone(),
            config.auth_issuer.clone(),
            config.auth_audience.clone(),
            Duration::from_secs(config.jwt_expiration),
        )));

        let audit = Arc::new(AuditService::new(db.clone()));
        let catalog = Arc::new(CatalogService::new(db.clone(), event_sender.clone()));
        let inventory = Arc::new(InventoryService::new(db.clone(), event_sender.clone()));
        let wallet = Arc::new(WalletService::new(db.clone(), event_sender.clone()));
        let merchants = Arc::new(MerchantService::new(
            db.clone(),
            wallet.clone(),
            audit.clone(),
            event_sender.clone(),
            config.default_wallet_reserve_cents,
        ));
        let shipping = Arc::new(ShippingClient::new(
            config.shipping_api_url.clone(),
            config.shipping_api_key.clone().unwrap_or_default(),
        )?);
        let orders = Arc::new(OrderService::new(
            db.clone(),
            catalog.clone(),
            inventory.clone(),
            wallet.clone(),
            shipping,
            audit.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(UserService::new(
            db,
            auth_service.clone(),
            audit.clone(),
            event_sender.clone(),
        ));
        let imports = Arc::new(CsvImportService::new(
            catalog.clone(),
            inventory.clone(),
            audit.clone(),
            event_sender,
        ));

        Ok(Self {
            services: AppServices {
                catalog,
                inventory,
                merchants,
                wallet,
                orders,
                users,
                audit,
                imports,
            },
            auth_service,
            config,
        })
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
    }))
}

/// Versioned API router. Everything except `/auth/login` requires a valid
/// token; user management, KYB decisions, and the audit log additionally
/// require the admin role.
pub fn api_v1_routes() -> Router<AppState> {
    let import_panic_guard = CatchPanicLayer::custom(|_: Box<dyn std::any::Any + Send>| {
        handlers::imports::unexpected_failure_response().into_response()
    });

    Router::new()
        .nest("/auth", handlers::users::auth_router())
        .nest("/products", handlers::products::router().with_auth())
        .nest("/inventory", handlers::inventory::router().with_auth())
        .nest("/merchants", handlers::merchants::router().with_auth())
        .nest(
            "/merchants",
            handlers::merchants::review_router().with_role("admin"),
        )
        .nest("/merchants", handlers::wallet::router().with_auth())
        .nest("/orders", handlers::orders::router().with_auth())
        .nest(
            "/imports",
            handlers::imports::router()
                .layer(import_panic_guard)
                .with_auth(),
        )
        .nest("/users", handlers::users::router().with_role("admin"))
        .nest("/audit", handlers::audit::router().with_role("admin"))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.should_allow_permissive_cors() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let auth_service = state.auth_service.clone();

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .nest("/api/v1", api_v1_routes())
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .layer(Extension(auth_service))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(state)
}
