use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use super::parse::{parse_command, Command};
use crate::chat::WebhookMessage;
use crate::dispatch::{PollTrigger, Registry, RegistryError};
use crate::store::FeedStore;
use crate::util::validate_url;

/// Form body of a Mattermost slash-command request. Missing fields are
/// empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlashCommand {
    pub token: String,
    pub user_name: String,
    pub channel_name: String,
    pub text: String,
}

/// Shared state of the command endpoint.
pub struct CommandState {
    registry: Registry,
    token: SecretString,
    store: Arc<FeedStore>,
    trigger: Option<PollTrigger>,
    // Serializes snapshot-and-write so saves land in command order
    persist: Mutex<()>,
}

impl CommandState {
    /// `token` of `None` accepts only requests with an empty token.
    pub fn new(registry: Registry, token: Option<String>, store: FeedStore) -> Self {
        Self {
            registry,
            token: SecretString::from(token.unwrap_or_default()),
            store: Arc::new(store),
            trigger: None,
            persist: Mutex::new(()),
        }
    }

    /// Lets the `refresh` command request an immediate poll cycle.
    pub fn with_trigger(mut self, trigger: PollTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs one command and returns the reply text.
    pub async fn execute(&self, request: &SlashCommand) -> String {
        let command = match parse_command(&request.text, &request.channel_name) {
            Ok(command) => command,
            Err(usage) => return usage.to_string(),
        };

        match command {
            Command::Add(feed) => {
                if let Err(e) = validate_url(&feed.url) {
                    tracing::info!(feed = %feed.name, url = %feed.url, error = %e, "Rejected feed URL");
                    return format!("Invalid feed URL: {e}");
                }
                match self.registry.add(feed).await {
                    Ok(()) => {
                        self.persist().await;
                        "Added feed.".to_string()
                    }
                    Err(RegistryError::AlreadyExists(name)) => {
                        tracing::info!(feed = %name, "Feed already exists");
                        "Feed already exists, delete it first.".to_string()
                    }
                }
            }
            Command::Remove(name) => {
                if self.registry.remove(&name).await {
                    self.persist().await;
                    "Removed feed.".to_string()
                } else {
                    format!("No feed named {name}.")
                }
            }
            Command::List => {
                let feeds = self.registry.configs().await;
                if feeds.is_empty() {
                    return "No feeds configured.".to_string();
                }
                feeds
                    .iter()
                    .map(|f| {
                        format!(
                            "* [{}] {} ({})\n",
                            f.channel.as_deref().unwrap_or_default(),
                            f.name,
                            f.url
                        )
                    })
                    .collect()
            }
            Command::Refresh => match &self.trigger {
                Some(trigger) if trigger.trigger() => "Refreshing feeds.".to_string(),
                Some(_) => "Refresh already pending.".to_string(),
                None => "Refresh is not available.".to_string(),
            },
            Command::Unknown(action) => {
                tracing::info!(action = %action, "Unknown command");
                "Unknown command".to_string()
            }
        }
    }

    /// Writes the current feed list to the store. Failures are logged only.
    async fn persist(&self) {
        let _guard = self.persist.lock().await;
        let feeds = self.registry.configs().await;
        let store = Arc::clone(&self.store);

        match tokio::task::spawn_blocking(move || store.save(&feeds)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to save feeds"),
            Err(e) => tracing::error!(error = %e, "Feed save task failed"),
        }
    }
}

/// Builds the command and health routes.
pub fn create_router(state: Arc<CommandState>) -> Router {
    Router::new()
        .route("/feeds", post(feed_command))
        .route("/actuator/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` until `shutdown` is cancelled, then finishes in-flight
/// requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Command server listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn feed_command(
    State(state): State<Arc<CommandState>>,
    Form(request): Form<SlashCommand>,
) -> Response {
    if !token_matches(&request.token, &state.token) {
        tracing::warn!(user = %request.user_name, "Rejected command with invalid token");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let span = tracing::info_span!(
        "command",
        user = %request.user_name,
        channel = %request.channel_name
    );
    let reply = async {
        tracing::info!(text = %request.text, "Handling command");
        state.execute(&request).await
    }
    .instrument(span)
    .await;

    Json(WebhookMessage::text(reply)).into_response()
}

/// Compares in time independent of where the tokens first differ.
fn token_matches(given: &str, expected: &SecretString) -> bool {
    given
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into()
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}
