//! Conversation context persistence for LexIntake.
//!
//! Contexts are keyed by `(team_id, session_id)` and kept with a rolling
//! TTL: every save pushes the expiry forward, and expiry is the only way a
//! context is removed.

pub mod file;
pub mod key;
pub mod store;

pub use file::FileContextStore;
pub use key::{context_key, split_context_key};
pub use store::{ContextStore, MemoryContextStore, StoredContext};
