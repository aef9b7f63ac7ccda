//! Observability for the Signal Service: health probes.
//!
//! Structured logging lives with the code that emits it (`tracing`); this
//! module only carries the HTTP health surface.

pub mod health;

pub use health::{health_router, HealthState};
