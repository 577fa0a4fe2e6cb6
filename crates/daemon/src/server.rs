//! Server setup and configuration module

use crate::config::Settings;
use crate::{DaemonError, Result};
use axum::Router;
use axum::http::{HeaderValue, header};
use std::future::Future;
use storefront_http::{
    AppState, routes,
    services::{JwtConfig, JwtService},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Assembles the application from settings
pub struct ServerBuilder {
    settings: Settings,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Settings the server is built from
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the JWT service
    pub fn build_jwt_service(&self) -> JwtService {
        let config: JwtConfig = self.settings.auth.jwt.clone().into();
        if config.secret == JwtConfig::default().secret {
            warn!("JWT_SECRET is not set, using the built-in development secret");
        }
        JwtService::new(config)
    }

    /// Build the shared handler state for a server listening on `port`
    pub fn build_app_state(&self, port: u16) -> AppState {
        AppState::new(self.build_jwt_service(), port)
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self, state: AppState) -> Router {
        let mut app = routes::api_router(state.clone())
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ));

        if self.settings.server.cors_enabled {
            app = app.layer(cors_layer());
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// Serve `router` on `listener` until `shutdown` resolves
    pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("HTTP server listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| DaemonError::Http(format!("HTTP server error: {e}")))
    }
}

/// CORS that mirrors the caller's origin and allows credentials
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
