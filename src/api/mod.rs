//! HTTP API for the portal
//!
//! Provides:
//! - Bearer-token sessions
//! - Tickets, procedures, students and accounts
//! - The assistant chat
//! - Server-Sent Events (SSE) for live ticket and notification activity

pub mod admin;
pub mod auth;
pub mod chat;
pub mod directory;
pub mod error;
pub mod events;
pub mod procedures;
pub mod server;
pub mod state;
pub mod tickets;

pub use error::{ApiError, ApiResult};
pub use events::{Event, EventBroadcaster, EventType};
pub use server::{ApiServer, ApiServerConfig};
pub use state::{AppState, SessionRegistry};
