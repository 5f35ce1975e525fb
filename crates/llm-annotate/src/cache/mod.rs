//! Cache gateway consumed by [`LlmComponent`](crate::LlmComponent).
//!
//! The component only tests membership, reads hits and writes freshly annotated
//! items. Storage, paging and eviction belong to the implementation. A cache
//! shared between components has to be synchronized by the caller; wrapping
//! it in `Arc<Mutex<_>>` is enough, since the component never holds a lock
//! across a task or backend call.

pub mod memory;
pub mod noop;

pub use memory::*;
pub use noop::*;

use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Vocab, WorkItem};

/// Key-value store from item identity to the fully annotated item.
pub trait CacheGateway<I: WorkItem> {
    /// Binds the cache to the vocabulary of the owning component, while the
    /// component is built. Binding the vocabulary the cache already holds is a
    /// no-op; a cache bound to another vocabulary must refuse.
    fn bind_vocab(&mut self, vocab: Arc<Vocab>) -> Result<()>;

    /// Must agree with [`get`](CacheGateway::get): `true` here means `get`
    /// returns a value.
    fn contains(&self, item: &I) -> bool;

    fn get(&self, item: &I) -> Option<I>;

    /// Stores an annotated item, overwriting any earlier entry for its identity.
    fn add(&mut self, item: I);
}

impl<I, C> CacheGateway<I> for Arc<Mutex<C>>
where
    I: WorkItem,
    C: CacheGateway<I>,
{
    fn bind_vocab(&mut self, vocab: Arc<Vocab>) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bind_vocab(vocab)
    }

    fn contains(&self, item: &I) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item)
    }

    fn get(&self, item: &I) -> Option<I> {
        self.lock().unwrap_or_else(PoisonError::into_inner).get(item)
    }

    fn add(&mut self, item: I) {
        self.lock().unwrap_or_else(PoisonError::into_inner).add(item);
    }
}
