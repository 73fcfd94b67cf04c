use anyhow::{Context as _, Result};
use chrono::Local;
use tutorchat_api_client::{ApiClient, RetryConfig};
use tutorchat_controller::{drive, App, Command};
use tutorchat_core::AuthContext;
use tutorchat_runtime_config::{normalize_server_url, ClientConfig};

/// Everything a command needs to talk to the backend.
pub struct CliContext {
    client: ApiClient,
    auth: AuthContext,
}

impl CliContext {
    /// Build the HTTP client from config; `server` overrides the configured URL.
    pub fn from_config(config: &ClientConfig, server: Option<&str>) -> Result<Self> {
        let url = server
            .map(normalize_server_url)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| config.server.url.clone());
        let client = ApiClient::new(&url, config.server.timeout())
            .with_context(|| format!("Failed to create client for {url}"))?
            .with_retry(RetryConfig {
                max_retries: config.retry.max_retries,
                delays: config.retry.delays_secs.clone(),
            });
        tracing::debug!("using server {}", client.base_url());
        Ok(Self {
            client,
            auth: auth_from_config(config),
        })
    }

    /// Fresh controller state for the configured identity.
    pub fn app(&self) -> App {
        App::new(self.auth.clone())
    }

    /// Execute `commands` and their follow-ups against the server.
    pub async fn run(&self, app: &mut App, commands: impl IntoIterator<Item = Command>) {
        drive(app, &self.client, commands, &Local::now()).await;
    }
}

pub fn auth_from_config(config: &ClientConfig) -> AuthContext {
    if config.identity.is_signed_in() {
        AuthContext::signed_in(
            config.identity.username.trim(),
            config.identity.token().map(str::to_string),
        )
    } else {
        AuthContext::Anonymous
    }
}
