use std::{error::Error as StdError, fmt, path::PathBuf};

use crate::{Fingerprint, PromptKind};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Step of the miss pipeline a batch failure came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchStage {
    GeneratePrompts,
    Complete,
    ParseResponses,
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GeneratePrompts => "generate_prompts",
            Self::Complete => "complete",
            Self::ParseResponses => "parse_responses",
        })
    }
}

/// Which half of the prompt/response exchange two collaborators disagree on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExchangeSide {
    Prompt,
    Response,
}

impl fmt::Display for ExchangeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
        })
    }
}

/// Failure raised by an [`LlmComponent`](crate::LlmComponent).
///
/// Construction problems ([`Configuration`](ComponentError::Configuration),
/// [`CapabilityMismatch`](ComponentError::CapabilityMismatch)) abort the build.
/// [`Batch`](ComponentError::Batch) and [`Arity`](ComponentError::Arity) abort
/// one in-flight batch and are the only kinds a stream hands to its error
/// handler; everything else terminates the stream.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A required argument is missing or invalid.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// The task and backend disagree on the payload format of one side of the exchange.
    #[error("task {side}s are {task} but the backend handles {backend}")]
    CapabilityMismatch {
        side: ExchangeSide,
        task: PromptKind,
        backend: PromptKind,
    },

    /// The cache reported an item as present but returned nothing for it.
    #[error("cache of `{component}` reported {fingerprint} as present but lookup returned nothing")]
    InternalConsistency {
        component: String,
        fingerprint: Fingerprint,
    },

    /// The captured prompt/response list ran out before every fresh item was journaled.
    #[error("exchange capture of `{component}` exhausted before all items were recorded")]
    JournalExhausted { component: String },

    /// The task or backend raised while handling a batch.
    #[error("`{component}` failed during {stage}")]
    Batch {
        component: String,
        stage: BatchStage,
        #[source]
        source: BoxError,
    },

    /// The task or backend broke the one-output-per-input contract.
    #[error("`{component}` {stage} returned {actual} values for {expected} inputs")]
    Arity {
        component: String,
        stage: BatchStage,
        expected: usize,
        actual: usize,
    },

    /// The task's initialization hook failed.
    #[error("initializing the task of `{component}` failed")]
    Initialization {
        component: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ComponentError {
    pub(crate) fn batch(component: &str, stage: BatchStage, source: anyhow::Error) -> Self {
        Self::Batch {
            component: component.to_string(),
            stage,
            source: source.into(),
        }
    }

    /// `true` for failures scoped to a single batch, which a stream may route to
    /// its error handler and skip.
    pub fn is_batch_failure(&self) -> bool {
        matches!(self, Self::Batch { .. } | Self::Arity { .. })
    }

    pub fn stage(&self) -> Option<BatchStage> {
        match self {
            Self::Batch { stage, .. } | Self::Arity { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Failure while producing or restoring a component's persisted segments.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("could not access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The segment container itself is not valid JSON.
    #[error("malformed segment container")]
    Json(#[from] serde_json::Error),

    #[error("segment `{segment}` is not valid base64")]
    Base64 {
        segment: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A sub-component failed to write or read its own segment.
    #[error("sub-component `{segment}` failed to (de)serialize")]
    Segment {
        segment: String,
        #[source]
        source: BoxError,
    },
}

impl SerializationError {
    pub(crate) fn segment(segment: &str, source: anyhow::Error) -> Self {
        Self::Segment {
            segment: segment.to_string(),
            source: source.into(),
        }
    }
}
