//! Storage module for per-session file registries
//!
//! One JSON document per session under `users/`, uploaded bytes under
//! `uploads/<session>/`.

mod session_file;
mod session_store;

pub use session_file::SessionState;
pub use session_store::{validate_session_id, SessionHandle, SessionStore};
