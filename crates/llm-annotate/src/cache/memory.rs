use anyhow::{Result, bail};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::CacheGateway;
use crate::{Fingerprint, Vocab, WorkItem};

/// In-memory cache keyed by vocabulary-scoped fingerprint.
///
/// Entries live until the cache is dropped. Lookups clone the stored item, so
/// callers never alias cached state.
#[derive(Debug, Clone)]
pub struct MemoryCache<I> {
    entries: IndexMap<Fingerprint, I>,
    vocab: Option<Arc<Vocab>>,
}

impl<I> Default for MemoryCache<I> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            vocab: None,
        }
    }
}

impl<I: WorkItem> MemoryCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vocab(&self) -> Option<&Vocab> {
        self.vocab.as_deref()
    }

    fn key(&self, item: &I) -> Fingerprint {
        let fingerprint = item.fingerprint();
        match &self.vocab {
            Some(vocab) => vocab.scope(&fingerprint),
            None => fingerprint,
        }
    }
}

impl<I: WorkItem> CacheGateway<I> for MemoryCache<I> {
    fn bind_vocab(&mut self, vocab: Arc<Vocab>) -> Result<()> {
        match &self.vocab {
            Some(bound) if **bound == *vocab => Ok(()),
            Some(bound) => bail!(
                "cache is bound to vocab `{}` and cannot serve `{}`",
                bound.lang(),
                vocab.lang()
            ),
            None => {
                debug!(lang = vocab.lang(), entries = self.entries.len(), "cache bound to vocab");
                self.vocab = Some(vocab);
                Ok(())
            }
        }
    }

    fn contains(&self, item: &I) -> bool {
        self.entries.contains_key(&self.key(item))
    }

    #[tracing::instrument(name = "llm.cache.get", level = "trace", skip_all)]
    fn get(&self, item: &I) -> Option<I> {
        let value = self.entries.get(&self.key(item)).cloned();
        trace!(hit = value.is_some(), "cache lookup complete");
        value
    }

    #[tracing::instrument(name = "llm.cache.add", level = "trace", skip_all)]
    fn add(&mut self, item: I) {
        let key = self.key(&item);
        self.entries.insert(key, item);
        trace!(entries = self.entries.len(), "cache entry inserted");
    }
}
