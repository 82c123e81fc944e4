//! lr-backend: Letta agent-service adapter for the relay.
//!
//! This crate owns the transport boundary: it speaks SSE to the Letta
//! streaming endpoint and hands the core an ordered stream of raw JSON
//! frames, one per fragment. A mock source produces the same stream
//! shape for tests.

pub mod letta;
pub mod mock;
pub mod sse;

pub use letta::{BackendError, LettaClient};
pub use mock::{MockConfig, MockFrame};
