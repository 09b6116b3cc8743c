//! Realtime connection hub
//!
//! A single coordinator task owns every live WebSocket session, grouped by
//! user. Other components push events to a user's sessions through the
//! [`Hub`] handle; the coordinator is the only writer of the session map.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod handler;
mod hub;
mod message;
mod session;

pub use error::HubError;
pub use handler::hub_router;
pub use hub::{Hub, HubStats, SessionHandle};
pub use message::{ClientMessage, TaskUpdate, TypedMessage};
pub use session::run_session;
