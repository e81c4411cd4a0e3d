//! UI-agnostic conversation state types
//!
//! This module contains data structures that are shared between different UIs
//! (TUI, desktop app, etc.) and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// One entry in a conversation log.
///
/// Turns are immutable once created; the log that holds them is
/// append-only, so `id` also gives the append order within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: u64,
    pub role: Role,
    pub text: String,
}

/// The origin of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the local user
    User,
    /// Reply text from the remote endpoint
    Server,
    /// A failed round trip, recorded inline in the conversation
    Error,
}
