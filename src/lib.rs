//! Client-side session orchestrator for a REST + realtime chat backend
//!
//! A [`SessionClient`] resolves a resumable chat identity, loads history,
//! opens the realtime channel, joins the chat and then keeps an ordered,
//! deduplicated [`Timeline`] of messages up to date.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod session;
pub mod timeline;
pub mod timestamp;
pub mod transport;

pub use error::{Result, ServerError, SessionError};
pub use identity::IdentityStore;
pub use session::{
    ConnectionState, SessionClient, SessionEvent, SessionOptions, SessionState, SubscriptionId,
};
pub use timeline::Timeline;
