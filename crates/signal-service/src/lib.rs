//! Switchboard Signal Service library.
//!
//! Coordinates real-time call initiation between two parties and relays the
//! peer-to-peer negotiation messages needed to establish a direct media
//! link. Signaling plane only: no media ever flows through this service.
//!
//! # Components
//!
//! - [`registry`] - presence: `userId` -> live connection
//! - [`rooms`] - broadcast-group membership for peer discovery
//! - [`session`] - call-session records and their state machine
//! - [`relay`] - fire-and-forget delivery to connections
//! - [`actors`] - the coordinator actor that owns all of the above
//! - [`server`] - WebSocket transport (axum)
//! - [`token`] - room-access grant endpoint
//!
//! All shared state is owned by a single coordinator task; the rest of the
//! process communicates with it through [`actors::CoordinatorHandle`].

#![warn(clippy::pedantic)]

pub mod actors;
pub mod config;
pub mod errors;
pub mod observability;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod rooms;
pub mod server;
pub mod session;
pub mod token;
