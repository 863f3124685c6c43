//! Shared domain types for LexIntake.
//!
//! Everything the intake pipeline passes between crates lives here: the
//! per-session [`context::ConversationContext`], chat messages and
//! attachments, the consolidated [`rules::RuleTable`], configuration, the
//! shared error type, and structured trace events.

pub mod case;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod rules;
pub mod trace;
