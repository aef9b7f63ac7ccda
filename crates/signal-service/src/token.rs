//! Room-access credential endpoint.
//!
//! `GET /token?room=<room>&user=<identity>` mints a signed, time-bounded
//! grant authorizing `identity` to join `room` on the media plane. Both
//! query parameters are required; absence yields HTTP 400 with a JSON
//! error body. Issuer construction requires the signing credentials, so a
//! misconfigured deployment fails at startup instead of serving requests
//! insecurely.

use crate::config::Config;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::grant::mint_room_grant;
use common::secret::SecretString;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Mints room grants with the configured signing credentials.
#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: SecretString,
    ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer from the service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.token_api_key.clone(),
            api_secret: config.token_api_secret.clone(),
            ttl: config.token_ttl(),
        }
    }

    /// Mint a grant for `identity` to join `room`.
    ///
    /// # Errors
    ///
    /// Returns [`common::grant::GrantError`] if signing fails.
    pub fn mint(&self, identity: &str, room: &str) -> Result<String, common::grant::GrantError> {
        mint_room_grant(&self.api_key, &self.api_secret, identity, room, self.ttl)
    }
}

/// Create the token router.
pub fn token_router(issuer: Arc<TokenIssuer>) -> Router {
    Router::new()
        .route("/token", get(token_handler))
        .with_state(issuer)
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    room: Option<String>,
    user: Option<String>,
}

async fn token_handler(
    State(issuer): State<Arc<TokenIssuer>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let (room, user) = match (query.room.as_deref(), query.user.as_deref()) {
        (Some(room), Some(user)) if !room.is_empty() && !user.is_empty() => (room, user),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "room and user are required"})),
            )
                .into_response();
        }
    };

    match issuer.mint(user, room) {
        Ok(token) => {
            debug!(
                target: "signal.token",
                user = %user,
                room = %room,
                "Minted room grant"
            );
            Json(json!({"token": token})).into_response()
        }
        Err(e) => {
            error!(target: "signal.token", error = %e, "Failed to mint room grant");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to mint token"})),
            )
                .into_response()
        }
    }
}
