//! Client-side state holders
//!
//! Each store owns its state and exposes async operations that call the
//! backend and update that state. Stores share one
//! [`ApiClient`](crate::api::ApiClient).

pub mod commands;
pub mod session;

pub use commands::{CommandState, CommandStore};
pub use session::{SessionPhase, SessionState, SessionStore};
