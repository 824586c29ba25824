//! Application startup and lifecycle management.

use crate::config::PersonaConfig;
use crate::handlers::{ask, not_found, status};
use crate::prompt::persona_template;
use crate::services::providers::gemini::GeminiChatModel;
use crate::services::ChatModel;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PersonaConfig>,
    pub template: &'static str,
    pub chat_model: Arc<dyn ChatModel>,
}

impl AppState {
    pub fn new(config: PersonaConfig, chat_model: Arc<dyn ChatModel>) -> Self {
        Self {
            config: Arc::new(config),
            template: persona_template(),
            chat_model,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/ask", post(ask))
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application backed by the Gemini provider.
    pub async fn build(config: PersonaConfig) -> Result<Self, AppError> {
        let chat_model = GeminiChatModel::new(config.gemini.clone())
            .map_err(|e| AppError::ConfigError(e.into()))?;

        tracing::info!(
            default_model = %config.gemini.default_model,
            api_base = %config.gemini.api_base,
            "Initialized Gemini chat model"
        );

        Self::build_with_model(config, Arc::new(chat_model)).await
    }

    /// Build the application around any chat model.
    pub async fn build_with_model(
        config: PersonaConfig,
        chat_model: Arc<dyn ChatModel>,
    ) -> Result<Self, AppError> {
        // Port 0 binds a random port, used by tests.
        let address = config.common.bind_addr();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Persona service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, chat_model),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve requests until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
