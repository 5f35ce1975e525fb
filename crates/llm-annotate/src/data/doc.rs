use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::ExchangeJournal;

/// Stable content identity of a [`WorkItem`], used as the cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// SHA-256 over the given parts. Parts are length-prefixed so that
    /// `["ab", "c"]` and `["a", "bc"]` never collide.
    pub fn digest<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// A unit of work flowing through an [`LlmComponent`](crate::LlmComponent).
///
/// Items are owned by the caller. The component only reads their identity,
/// hands them to the task for annotation, and attaches exchange records when
/// I/O capture is enabled.
pub trait WorkItem: Clone + 'static {
    /// Identity used for cache membership. Two items with the same fingerprint
    /// are interchangeable as far as the cache is concerned.
    fn fingerprint(&self) -> Fingerprint;

    fn exchanges(&self) -> &ExchangeJournal;

    fn exchanges_mut(&mut self) -> &mut ExchangeJournal;
}

/// Text document with free-form annotations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Doc {
    text: String,
    #[serde(default)]
    annotations: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "ExchangeJournal::is_empty")]
    llm_io: ExchangeJournal,
}

impl Doc {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn annotation(&self, key: &str) -> Option<&serde_json::Value> {
        self.annotations.get(key)
    }

    pub fn annotations(&self) -> &IndexMap<String, serde_json::Value> {
        &self.annotations
    }

    pub fn is_annotated(&self) -> bool {
        !self.annotations.is_empty()
    }
}

impl WorkItem for Doc {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::digest([self.text.as_bytes()])
    }

    fn exchanges(&self) -> &ExchangeJournal {
        &self.llm_io
    }

    fn exchanges_mut(&mut self) -> &mut ExchangeJournal {
        &mut self.llm_io
    }
}

impl From<&str> for Doc {
    fn from(text: &str) -> Self {
        Doc::new(text)
    }
}
