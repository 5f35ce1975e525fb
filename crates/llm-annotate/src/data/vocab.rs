use serde::{Deserialize, Serialize};

use super::Fingerprint;

/// Shared vocabulary context a cache is bound to.
///
/// The same text processed under two vocabularies yields different cache
/// keys, so a cache shared between pipelines never hands out a document
/// annotated for another language.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    lang: String,
}

impl Vocab {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Derives the vocabulary-scoped key for an item fingerprint.
    pub fn scope(&self, fingerprint: &Fingerprint) -> Fingerprint {
        Fingerprint::digest([self.lang.as_bytes(), fingerprint.as_bytes().as_slice()])
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new("en")
    }
}
