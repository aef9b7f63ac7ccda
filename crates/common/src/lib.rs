//! Common utilities shared across Switchboard components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for room-access grant tokens (claims, signing, validation)
pub mod grant;
