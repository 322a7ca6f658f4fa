use crate::{create_router, AppState};
use tracing::{info, warn};

/// API server configuration
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3040 }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Start the API server with the given configuration
pub async fn start_server_with_config(
    state: AppState,
    config: ApiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if state.trust_proxy_headers {
        warn!("Trusting X-Remote-User headers; only run behind an authenticating proxy");
    }

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    info!("OpenAPI document at http://localhost:{}/openapi.json", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
