#![allow(dead_code)]

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use llm_annotate::{
    CacheGateway, Doc, DummyBackend, Example, Initialize, IoKinds, LlmComponent, Persist,
    PromptTask, ScoreValue, Scorer, Scores, Vocab, WorkItem,
};

pub const PROMPT_PREFIX: &str = "label: ";

/// Labels each document with the backend's answer to `label: <text>`.
///
/// Clones share the log of items sent to `generate_prompts`.
#[derive(Clone, Default)]
pub struct LabelTask {
    pub labels: Vec<String>,
    pub io_kinds: IoKinds,
    pub short_prompts: bool,
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl LabelTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Drops the last prompt of every batch.
    pub fn short_prompts(mut self) -> Self {
        self.short_prompts = true;
        self
    }

    pub fn with_io_kinds(mut self, io_kinds: IoKinds) -> Self {
        self.io_kinds = io_kinds;
        self
    }

    /// Texts of the items passed to `generate_prompts`, one entry per call.
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_flat(&self) -> Vec<String> {
        self.seen().into_iter().flatten().collect()
    }
}

impl PromptTask<Doc> for LabelTask {
    fn generate_prompts(&self, items: &[Doc]) -> Result<Vec<String>> {
        self.seen
            .lock()
            .unwrap()
            .push(items.iter().map(|doc| doc.text().to_string()).collect());
        let mut prompts: Vec<String> = items
            .iter()
            .map(|doc| format!("{PROMPT_PREFIX}{}", doc.text()))
            .collect();
        if self.short_prompts {
            prompts.pop();
        }
        Ok(prompts)
    }

    fn parse_responses(&self, items: Vec<Doc>, responses: &[String]) -> Result<Vec<Doc>> {
        items
            .into_iter()
            .zip(responses)
            .map(|(mut doc, response)| {
                if response.is_empty() {
                    bail!("empty response for `{}`", doc.text());
                }
                doc.annotate("label", response.as_str());
                Ok(doc)
            })
            .collect()
    }

    fn io_kinds(&self) -> IoKinds {
        self.io_kinds
    }

    fn scorer(&self) -> Option<&dyn Scorer<Doc>> {
        Some(self)
    }

    fn initializer(&mut self) -> Option<&mut dyn Initialize<Doc>> {
        Some(self)
    }

    fn persistence(&self) -> Option<&dyn Persist> {
        Some(self)
    }

    fn persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        Some(self)
    }
}

impl Scorer<Doc> for LabelTask {
    fn score(&self, examples: &[Example<Doc>]) -> Scores {
        let correct = examples
            .iter()
            .filter(|example| {
                example.predicted.annotation("label") == example.reference.annotation("label")
            })
            .count();
        let accuracy = if examples.is_empty() {
            0.0
        } else {
            correct as f64 / examples.len() as f64
        };
        Scores::from([("label_acc".to_string(), ScoreValue::Number(accuracy))])
    }
}

impl Initialize<Doc> for LabelTask {
    fn initialize(&mut self, get_examples: &dyn Fn() -> Vec<Example<Doc>>) -> Result<()> {
        for example in get_examples() {
            if let Some(label) = example.reference.annotation("label").and_then(|v| v.as_str())
                && !self.labels.iter().any(|known| known == label)
            {
                self.labels.push(label.to_string());
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LabelState {
    labels: Vec<String>,
}

impl Persist for LabelTask {
    fn to_bytes(&self, _exclude: &[&str]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&LabelState {
            labels: self.labels.clone(),
        })?)
    }

    fn from_bytes(&mut self, data: &[u8], _exclude: &[&str]) -> Result<()> {
        let state: LabelState = serde_json::from_slice(data)?;
        self.labels = state.labels;
        Ok(())
    }
}

/// Task without any optional capability.
pub struct BareTask;

impl PromptTask<Doc> for BareTask {
    fn generate_prompts(&self, items: &[Doc]) -> Result<Vec<String>> {
        Ok(items.iter().map(|doc| doc.text().to_string()).collect())
    }

    fn parse_responses(&self, items: Vec<Doc>, responses: &[String]) -> Result<Vec<Doc>> {
        Ok(items
            .into_iter()
            .zip(responses)
            .map(|(mut doc, response)| {
                doc.annotate("echo", response.as_str());
                doc
            })
            .collect())
    }
}

/// Cache that claims to hold everything and returns nothing.
pub struct InconsistentCache;

impl CacheGateway<Doc> for InconsistentCache {
    fn bind_vocab(&mut self, _vocab: Arc<Vocab>) -> Result<()> {
        Ok(())
    }

    fn contains(&self, _item: &Doc) -> bool {
        true
    }

    fn get(&self, _item: &Doc) -> Option<Doc> {
        None
    }

    fn add(&mut self, _item: Doc) {}
}

/// Backend answering `label: x` with `X`.
pub fn upper_backend() -> DummyBackend {
    DummyBackend::new(|prompt| prompt.trim_start_matches(PROMPT_PREFIX).to_uppercase())
}

pub fn docs(texts: &[&str]) -> Vec<Doc> {
    texts.iter().map(|text| Doc::new(*text)).collect()
}

pub fn texts(docs: &[Doc]) -> Vec<&str> {
    docs.iter().map(Doc::text).collect()
}

pub fn labels(docs: &[Doc]) -> Vec<&str> {
    docs.iter()
        .map(|doc| {
            doc.annotation("label")
                .and_then(|value| value.as_str())
                .unwrap_or("")
        })
        .collect()
}

pub fn exchange_prompts(docs: &[Doc], component: &str) -> Vec<Option<String>> {
    docs.iter()
        .map(|doc| {
            doc.exchanges()
                .get(component)
                .map(|record| record.prompt.clone())
        })
        .collect()
}

pub fn component(
    task: LabelTask,
    backend: DummyBackend,
    cache: Box<dyn CacheGateway<Doc>>,
    save_io: bool,
) -> LlmComponent<Doc> {
    LlmComponent::<Doc>::builder()
        .name("llm")
        .vocab(Vocab::new("en"))
        .task(Box::new(task))
        .backend(Box::new(backend))
        .cache(cache)
        .save_io(save_io)
        .build()
        .expect("component builds")
}
