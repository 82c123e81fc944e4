//! lr-core: Stream classification and re-emission for the Letta relay.
//!
//! This crate holds the classifier session that translates the agent
//! service's fragment stream into host events, plus process
//! configuration, response logging, and the relay driver.

pub mod classifier;
pub mod config;
pub mod relay;
pub mod response_log;
