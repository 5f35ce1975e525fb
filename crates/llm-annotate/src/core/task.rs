use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Example, Persist, WorkItem};

/// Wire format of a prompt or response payload.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Plain completion text.
    #[default]
    Text,
    /// A JSON-encoded list of chat messages.
    Chat,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Chat => "chat",
        })
    }
}

/// Formats a collaborator produces and consumes. Checked once at construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct IoKinds {
    pub prompt: PromptKind,
    pub response: PromptKind,
}

impl IoKinds {
    pub fn new(prompt: PromptKind, response: PromptKind) -> Self {
        Self { prompt, response }
    }
}

/// Value of one metric reported by a [`Scorer`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Nested(IndexMap<String, f64>),
}

impl From<f64> for ScoreValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

pub type Scores = IndexMap<String, ScoreValue>;

/// Turns items into prompts and backend responses back into annotated items.
///
/// Both directions are one-to-one and order-preserving: `generate_prompts`
/// returns exactly one prompt per item and `parse_responses` exactly one item
/// per response, in the order received. The component checks both counts and
/// fails the batch if they are off.
///
/// Optional capabilities are exposed through the accessor methods. Their
/// defaults report the capability as absent.
pub trait PromptTask<I: WorkItem> {
    fn generate_prompts(&self, items: &[I]) -> Result<Vec<String>>;

    fn parse_responses(&self, items: Vec<I>, responses: &[String]) -> Result<Vec<I>>;

    fn io_kinds(&self) -> IoKinds {
        IoKinds::default()
    }

    fn scorer(&self) -> Option<&dyn Scorer<I>> {
        None
    }

    fn initializer(&mut self) -> Option<&mut dyn Initialize<I>> {
        None
    }

    fn persistence(&self) -> Option<&dyn Persist> {
        None
    }

    fn persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        None
    }
}

/// Evaluates predicted items against references.
pub trait Scorer<I> {
    fn score(&self, examples: &[Example<I>]) -> Scores;
}

/// Setup hook run by the host before the first batch, e.g. to collect labels
/// or few-shot examples.
pub trait Initialize<I> {
    fn initialize(&mut self, get_examples: &dyn Fn() -> Vec<Example<I>>) -> Result<()>;
}
