//! Cache-aside LLM annotation of document streams.
//!
//! An [`LlmComponent`] wires together three collaborators:
//!
//! - a [`PromptTask`] that turns items into prompts and responses back into
//!   annotated items,
//! - a [`CompletionBackend`] that answers prompts,
//! - a [`CacheGateway`] that remembers annotated items by identity.
//!
//! [`LlmComponent::process_batch`] partitions a batch into cache hits and
//! misses, sends only the misses through the task and backend, and returns
//! every item in its original position. [`LlmComponent::pipe`] does the same
//! over an unbounded stream, one batch at a time, routing batch failures to a
//! caller-supplied error handler.

pub mod cache;
pub mod core;
pub mod data;
pub mod providers;
pub mod utils;

pub use crate::cache::*;
pub use crate::core::*;
pub use crate::data::*;
pub use crate::providers::*;
