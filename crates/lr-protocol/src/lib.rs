//! lr-protocol: Shared types and message definitions for the Letta relay.
//!
//! This crate defines the two message vocabularies the relay translates
//! between: the fragment grammar streamed by the Letta agent service, and
//! the host event grammar consumed by the chat host's event emitter.

pub mod chat;
pub mod event;
pub mod fragment;
pub mod prefs;

pub use chat::{ChatMessage, ChatRole, RelayRequest};
pub use event::{HostEvent, StatusLevel};
pub use fragment::{Fragment, ToolInvocation, UnknownFragment, UsageStats};
pub use prefs::DisplayPreferences;
