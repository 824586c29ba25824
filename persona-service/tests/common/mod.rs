#![allow(dead_code)]

use persona_service::config::{GeminiSettings, PersonaConfig, DEFAULT_MODEL};
use persona_service::services::ChatModel;
use persona_service::startup::{build_router, AppState, Application};
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub fn test_config(api_base: &str) -> PersonaConfig {
    PersonaConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port for testing
        },
        gemini: GeminiSettings {
            api_key: Secret::new("test-api-key".to_string()),
            api_base: api_base.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            request_timeout: None,
        },
    }
}

/// Router wired to `chat_model`, for `oneshot` tests.
pub fn test_router(chat_model: Arc<dyn ChatModel>) -> axum::Router {
    build_router(AppState::new(
        test_config("http://127.0.0.1:1/v1beta"),
        chat_model,
    ))
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Serve the full application on a random port.
    pub async fn spawn(config: PersonaConfig, chat_model: Option<Arc<dyn ChatModel>>) -> Self {
        let app = match chat_model {
            Some(chat_model) => Application::build_with_model(config, chat_model).await,
            None => Application::build(config).await,
        }
        .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(&address).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp { address, port }
    }
}
