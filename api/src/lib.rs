use authz::PermissionGate;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use impersonation::ImpersonationConfig;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub mod error;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;
pub mod transport;


// Re-export server functions for convenience
pub use server::{start_server_with_config, ApiConfig};
pub use transport::{CookieTicketTransport, PlainTicketCodec, PrivateTicketCodec, TicketCodec};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<PermissionGate>,
    pub config: Arc<ImpersonationConfig>,
    pub codec: Arc<dyn TicketCodec>,
    /// Read identities from `X-Remote-User`/`X-Remote-Auth-Type`
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// State with proxy headers ignored
    pub fn new(
        gate: PermissionGate,
        config: ImpersonationConfig,
        codec: Arc<dyn TicketCodec>,
    ) -> Self {
        Self {
            gate: Arc::new(gate),
            config: Arc::new(config),
            codec,
            trust_proxy_headers: false,
        }
    }

    pub fn with_trusted_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::impersonation::impersonate,
        handlers::impersonation::stop_impersonating,
        handlers::impersonation::whoami,
    ),
    components(
        schemas(
            models::ImpersonateRequest,
            models::EffectiveUserResponse,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "impersonation", description = "Act as another registered user"),
    ),
    info(
        title = "Impersonation API",
        version = "1.0.0",
        description = "Start, stop and inspect user impersonation",
    ),
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/impersonate", post(handlers::impersonation::impersonate))
        .route(
            "/stop-impersonating",
            post(handlers::impersonation::stop_impersonating),
        )
        .route("/whoami", get(handlers::impersonation::whoami))
        .route("/openapi.json", get(openapi_json))
        // Identity must be in place before the slider looks at the request
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::sliding_expiration_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::identity_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
