//! Room-access grant tokens.
//!
//! A grant is a signed, time-bounded credential authorizing one identity to
//! join one room on the media plane. Grants are HS256 JWTs signed with the
//! service API secret; the claims carry the identity as `sub` and a `video`
//! claim naming the room.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (resource-exhaustion guard)
//! - Only HS256 is accepted when decoding
//! - The signing secret is handled as a [`SecretString`] and never logged
//!
//! # Usage
//!
//! ```rust
//! use common::grant::{mint_room_grant, decode_room_grant};
//! use common::secret::SecretString;
//! use std::time::Duration;
//!
//! let secret = SecretString::from("a-very-long-signing-secret");
//! let token = mint_room_grant("api-key", &secret, "user42", "room123",
//!     Duration::from_secs(3600)).unwrap();
//!
//! let claims = decode_room_grant(&token, &secret).unwrap();
//! assert_eq!(claims.sub, "user42");
//! assert_eq!(claims.video.room, "room123");
//! assert!(claims.video.room_join);
//! ```

use crate::secret::{ExposeSecret, SecretString};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Maximum allowed grant token size in bytes.
///
/// Typical grants are 200-400 bytes; anything larger is rejected before
/// base64 decode or signature verification.
pub const MAX_GRANT_SIZE_BYTES: usize = 4096;

/// Errors that can occur when minting or validating a room grant.
///
/// Messages are intentionally generic; details are logged server-side.
#[derive(Error, Debug)]
pub enum GrantError {
    /// Token size exceeds [`MAX_GRANT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Signing or verification failed.
    #[error("The access token is invalid or expired")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// The room-scoped capability carried by a grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoGrant {
    /// Room this grant applies to.
    pub room: String,
    /// Whether the bearer may join the room.
    #[serde(rename = "roomJoin")]
    pub room_join: bool,
}

/// Claims of a room-access grant token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomGrantClaims {
    /// Issuer (the service API key).
    pub iss: String,
    /// Subject (the identity the grant was minted for).
    pub sub: String,
    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
    /// Room capability.
    pub video: VideoGrant,
}

/// Mint a signed room grant for `identity` to join `room`.
///
/// The grant is valid from now until now + `ttl`.
///
/// # Errors
///
/// Returns [`GrantError::Jwt`] if signing fails.
pub fn mint_room_grant(
    api_key: &str,
    api_secret: &SecretString,
    identity: &str,
    room: &str,
    ttl: Duration,
) -> Result<String, GrantError> {
    let now = Utc::now().timestamp();
    // Saturating on the off chance ttl exceeds i64 seconds
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

    let claims = RoomGrantClaims {
        iss: api_key.to_string(),
        sub: identity.to_string(),
        nbf: now,
        exp: now.saturating_add(ttl_secs),
        video: VideoGrant {
            room: room.to_string(),
            room_join: true,
        },
    };

    let key = EncodingKey::from_secret(api_secret.expose_secret().as_bytes());
    Ok(jsonwebtoken::encode(&Header::default(), &claims, &key)?)
}

/// Decode and verify a room grant token.
///
/// Checks size, signature, `exp` and `nbf`.
///
/// # Errors
///
/// Returns [`GrantError::TokenTooLarge`] for oversized tokens and
/// [`GrantError::Jwt`] for anything that fails verification.
pub fn decode_room_grant(
    token: &str,
    api_secret: &SecretString,
) -> Result<RoomGrantClaims, GrantError> {
    if token.len() > MAX_GRANT_SIZE_BYTES {
        return Err(GrantError::TokenTooLarge);
    }

    let key = DecodingKey::from_secret(api_secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;

    let data = jsonwebtoken::decode::<RoomGrantClaims>(token, &key, &validation)?;
    Ok(data.claims)
}
