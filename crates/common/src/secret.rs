//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate with
//! Switchboard-specific guidance. Use these types for all sensitive values
//! like signing secrets, API keys, and minted tokens.
//!
//! # Compile-Time Safety
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so
//! any code that derives `Debug` on a struct containing secrets
//! automatically gets safe logging behavior. This makes it impossible to
//! accidentally log secrets via `{:?}` or tracing.
//!
//! # Memory Safety
//!
//! Secrets are automatically zeroized when dropped, preventing sensitive
//! data from lingering in memory after use.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct SigningConfig {
//!     api_key: String,
//!     api_secret: SecretString,  // Safe: Debug shows "[REDACTED]"
//! }
//!
//! let cfg = SigningConfig {
//!     api_key: "key-123".to_string(),
//!     api_secret: SecretString::from("hunter2"),
//! };
//!
//! // This is safe - the secret is redacted
//! println!("{:?}", cfg);
//!
//! // To access the actual value, you must explicitly call expose_secret()
//! let secret: &str = cfg.api_secret.expose_secret();
//! ```
//!
//! # Switchboard Usage Guidelines
//!
//! Use `SecretString` for:
//! - Grant-signing API secrets
//! - Bearer tokens
//! - Any credential loaded from the environment
//!
//! Use `SecretBox<T>` for:
//! - Custom secret types (e.g., `SecretBox<[u8]>` for binary keys)

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
