//! Pipeline utilities shared by the research stages
//!
//! This module provides the coordination primitives the stages are built on:
//! - **handoff**: Zero-capacity rendezvous channel between stages
//! - **retry**: Bounded retry policy with exponential backoff
//! - **serde_duration**: `Duration` as integer milliseconds or nanoseconds

pub mod handoff;
pub mod retry;
pub mod serde_duration;

// Re-export commonly used types and functions
pub use handoff::{handoff, HandoffClosed, HandoffReceiver, HandoffSender};
pub use retry::RetryPolicy;
