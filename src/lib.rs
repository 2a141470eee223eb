//! TradHub client core.
//!
//! SYSTEM CONTEXT
//! ==============
//! TradHub is a marketplace for francophone African markets built on a hosted
//! backend-as-a-service (GoTrue auth, PostgREST data, Realtime push). This
//! crate owns the client side of that boundary: the session coordinator that
//! every consumer reads "who is logged in" from, the backend adapters it
//! talks through, and the catalog/chat/registration/supplier helpers the pages use.

pub mod backend;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod geo;
pub mod realtime;
pub mod registration;
pub mod session;
pub mod suppliers;

pub use backend::{AuthBackend, BackendError};
pub use session::{SessionCoordinator, SessionState};
