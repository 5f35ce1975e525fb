//! Per-item capture of the raw prompt/response exchange.
//!
//! When a component runs with `save_io` enabled, every item that went through
//! the task and backend leaves with one [`ExchangeRecord`] in its
//! [`ExchangeJournal`], filed under the component's name. Items served from the
//! cache get nothing new for that pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ComponentError, WorkItem, utils::truncate};

const PREVIEW_CHARS: usize = 80;

/// The prompt sent for one item and the backend's reply to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub prompt: String,
    pub response: String,
}

/// Exchange records of one item, keyed by the name of the component that produced them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ExchangeJournal(IndexMap<String, ExchangeRecord>);

impl ExchangeJournal {
    pub fn get(&self, component: &str) -> Option<&ExchangeRecord> {
        self.0.get(component)
    }

    /// Files `record` under `component`, replacing a record from an earlier pass.
    pub fn record(&mut self, component: impl Into<String>, record: ExchangeRecord) {
        self.0.insert(component.into(), record);
    }

    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Retained prompts and responses of one batch's misses, handed out strictly
/// in submission order.
#[derive(Debug)]
pub(crate) struct ExchangeCapture {
    prompts: std::vec::IntoIter<String>,
    responses: std::vec::IntoIter<String>,
}

impl ExchangeCapture {
    pub(crate) fn new(prompts: Vec<String>, responses: Vec<String>) -> Self {
        Self {
            prompts: prompts.into_iter(),
            responses: responses.into_iter(),
        }
    }

    fn next_record(&mut self) -> Option<ExchangeRecord> {
        Some(ExchangeRecord {
            prompt: self.prompts.next()?,
            response: self.responses.next()?,
        })
    }

    /// Pairs `item` with the next captured exchange.
    pub(crate) fn attach<I: WorkItem>(
        &mut self,
        component: &str,
        item: &mut I,
    ) -> Result<(), ComponentError> {
        let record = self
            .next_record()
            .ok_or_else(|| ComponentError::JournalExhausted {
                component: component.to_string(),
            })?;
        trace!(
            component,
            prompt = truncate(&record.prompt, PREVIEW_CHARS),
            response = truncate(&record.response, PREVIEW_CHARS),
            "exchange recorded"
        );
        item.exchanges_mut().record(component, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Doc;

    #[test]
    fn records_are_handed_out_in_order() {
        let mut capture = ExchangeCapture::new(
            vec!["p1".into(), "p2".into()],
            vec!["r1".into(), "r2".into()],
        );
        let mut first = Doc::new("one");
        let mut second = Doc::new("two");

        capture.attach("llm", &mut first).unwrap();
        capture.attach("llm", &mut second).unwrap();

        assert_eq!(first.exchanges().get("llm").unwrap().prompt, "p1");
        assert_eq!(second.exchanges().get("llm").unwrap().response, "r2");
    }

    #[test]
    fn exhausted_capture_is_an_error() {
        let mut capture = ExchangeCapture::new(vec!["p1".into()], vec![]);
        let mut doc = Doc::new("one");

        let err = capture.attach("llm", &mut doc).unwrap_err();
        assert!(matches!(err, ComponentError::JournalExhausted { .. }));
        assert!(doc.exchanges().is_empty());
    }

    #[test]
    fn records_from_distinct_components_coexist() {
        let mut journal = ExchangeJournal::default();
        let record = |p: &str| ExchangeRecord {
            prompt: p.into(),
            response: "ok".into(),
        };
        journal.record("ner", record("a"));
        journal.record("textcat", record("b"));
        journal.record("ner", record("c"));

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.get("ner").unwrap().prompt, "c");
        assert_eq!(journal.components().collect::<Vec<_>>(), vec!["ner", "textcat"]);
    }
}
