use std::sync::Arc;

use super::CacheGateway;
use crate::{Vocab, WorkItem};

/// Cache that never holds anything. Every item is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<I: WorkItem> CacheGateway<I> for NoCache {
    fn bind_vocab(&mut self, _vocab: Arc<Vocab>) -> anyhow::Result<()> {
        Ok(())
    }

    fn contains(&self, _item: &I) -> bool {
        false
    }

    fn get(&self, _item: &I) -> Option<I> {
        None
    }

    fn add(&mut self, _item: I) {}
}
