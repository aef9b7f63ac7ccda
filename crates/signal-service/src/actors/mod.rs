//! Actor system for the Signal Service.
//!
//! A single coordinator actor owns the presence registry, room directory,
//! session store and relay table; everything else talks to it through
//! [`CoordinatorHandle`]. One actor task means one exclusion domain: a
//! `create`+`create` race can never allocate the same call id, and every
//! check-then-set on a session is atomic.

mod coordinator;
mod messages;

pub use coordinator::CoordinatorHandle;
pub use messages::CoordinatorMessage;
