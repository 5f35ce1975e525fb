use bon::bon;
use std::sync::Arc;
use tracing::{debug, trace};

use super::journal::ExchangeCapture;
use crate::{
    BatchStage, CacheGateway, ComponentConfig, ComponentError, CompletionBackend,
    DEFAULT_BATCH_SIZE, Example, ExchangeSide, NoCache, Persist, PromptTask, Scores, Vocab,
    WorkItem,
};

/// Optional capabilities of the task and backend, resolved once at construction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub scoring: bool,
    pub initialize: bool,
    pub task_persistence: bool,
    pub backend_persistence: bool,
}

/// Where each position of a batch gets its output from.
enum Slot<I> {
    Cached(I),
    Fresh,
}

/// Pipeline component that annotates items through a prompt task and a
/// completion backend, consulting a cache first.
///
/// Only cache misses reach the task and backend. Outputs always come back in
/// input order, and every freshly annotated item is written to the cache.
/// With `save_io` enabled each fresh item also carries the prompt and response
/// it was annotated from, filed under the component's name.
///
/// Batches are atomic with respect to the cache: a batch that fails anywhere
/// writes nothing.
pub struct LlmComponent<I: WorkItem> {
    name: String,
    vocab: Arc<Vocab>,
    task: Box<dyn PromptTask<I>>,
    backend: Box<dyn CompletionBackend>,
    cache: Box<dyn CacheGateway<I>>,
    save_io: bool,
    batch_size: usize,
    capabilities: Capabilities,
}

#[bon]
impl<I: WorkItem> LlmComponent<I> {
    /// Builds a component and binds the cache to `vocab`.
    ///
    /// Fails with [`ComponentError::Configuration`] when no task is given or
    /// the cache is already bound to another vocabulary, and with
    /// [`ComponentError::CapabilityMismatch`] when the task and backend
    /// disagree on prompt or response format.
    #[builder]
    pub fn new(
        #[builder(into, default = "llm".to_string())] name: String,
        #[builder(into)] vocab: Arc<Vocab>,
        task: Option<Box<dyn PromptTask<I>>>,
        backend: Box<dyn CompletionBackend>,
        #[builder(default = Box::new(NoCache) as Box<dyn CacheGateway<I>>)] cache: Box<
            dyn CacheGateway<I>,
        >,
        #[builder(default)] save_io: bool,
        #[builder(default = DEFAULT_BATCH_SIZE)] batch_size: usize,
    ) -> Result<Self, ComponentError> {
        let Some(mut task) = task else {
            return Err(ComponentError::Configuration {
                message: format!("component `{name}` requires a `task`, but none was given"),
            });
        };
        if batch_size == 0 {
            return Err(ComponentError::Configuration {
                message: format!("component `{name}` needs a positive `batch_size`"),
            });
        }
        check_io_kinds(task.as_ref(), backend.as_ref())?;

        let capabilities = Capabilities {
            scoring: task.scorer().is_some(),
            initialize: task.initializer().is_some(),
            task_persistence: task.persistence().is_some(),
            backend_persistence: backend.persistence().is_some(),
        };
        let mut cache = cache;
        cache
            .bind_vocab(vocab.clone())
            .map_err(|err| ComponentError::Configuration {
                message: format!("component `{name}` cannot use its cache: {err:#}"),
            })?;
        debug!(
            component = %name,
            lang = vocab.lang(),
            save_io,
            ?capabilities,
            "llm component constructed"
        );

        Ok(Self {
            name,
            vocab,
            task,
            backend,
            cache,
            save_io,
            batch_size,
            capabilities,
        })
    }
}

fn check_io_kinds<I: WorkItem>(
    task: &dyn PromptTask<I>,
    backend: &dyn CompletionBackend,
) -> Result<(), ComponentError> {
    let (task_kinds, backend_kinds) = (task.io_kinds(), backend.io_kinds());
    if task_kinds.prompt != backend_kinds.prompt {
        return Err(ComponentError::CapabilityMismatch {
            side: ExchangeSide::Prompt,
            task: task_kinds.prompt,
            backend: backend_kinds.prompt,
        });
    }
    if task_kinds.response != backend_kinds.response {
        return Err(ComponentError::CapabilityMismatch {
            side: ExchangeSide::Response,
            task: task_kinds.response,
            backend: backend_kinds.response,
        });
    }
    Ok(())
}

fn check_arity(
    component: &str,
    stage: BatchStage,
    expected: usize,
    actual: usize,
) -> Result<(), ComponentError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ComponentError::Arity {
            component: component.to_string(),
            stage,
            expected,
            actual,
        })
    }
}

impl<I: WorkItem> LlmComponent<I> {
    /// Builds a component from declarative settings. A `None` task is reported
    /// the same way as a builder without one.
    pub fn from_config(
        config: ComponentConfig,
        vocab: impl Into<Arc<Vocab>>,
        task: Option<Box<dyn PromptTask<I>>>,
        backend: Box<dyn CompletionBackend>,
        cache: Box<dyn CacheGateway<I>>,
    ) -> Result<Self, ComponentError> {
        Self::builder()
            .name(config.name)
            .vocab(vocab)
            .maybe_task(task)
            .backend(backend)
            .cache(cache)
            .save_io(config.save_io)
            .batch_size(config.batch_size)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn save_io(&self) -> bool {
        self.save_io
    }

    /// Batch size used by [`pipe`](LlmComponent::pipe) unless overridden.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn task(&self) -> &dyn PromptTask<I> {
        self.task.as_ref()
    }

    pub fn backend(&self) -> &dyn CompletionBackend {
        self.backend.as_ref()
    }

    /// Annotates a single item. Errors propagate unchanged.
    pub fn call(&mut self, item: I) -> Result<I, ComponentError> {
        let mut outputs = self.process_batch(std::slice::from_ref(&item))?;
        outputs.pop().ok_or_else(|| ComponentError::Arity {
            component: self.name.clone(),
            stage: BatchStage::ParseResponses,
            expected: 1,
            actual: 0,
        })
    }

    /// Annotates one batch, sending only cache misses through the task and backend.
    ///
    /// The output has one item per input, in input order. Hits are returned as
    /// stored. Misses are annotated, written to the cache and, with `save_io`,
    /// journaled. Any failure aborts the whole batch before the cache is touched.
    #[tracing::instrument(
        name = "llm.component.process_batch",
        level = "debug",
        skip(self, batch),
        fields(component = %self.name, batch_len = batch.len())
    )]
    pub fn process_batch(&mut self, batch: &[I]) -> Result<Vec<I>, ComponentError> {
        let mut slots = Vec::with_capacity(batch.len());
        let mut misses = Vec::new();
        for item in batch {
            if self.cache.contains(item) {
                let cached =
                    self.cache
                        .get(item)
                        .ok_or_else(|| ComponentError::InternalConsistency {
                            component: self.name.clone(),
                            fingerprint: item.fingerprint(),
                        })?;
                slots.push(Slot::Cached(cached));
            } else {
                slots.push(Slot::Fresh);
                misses.push(item.clone());
            }
        }
        let miss_count = misses.len();
        debug!(
            hits = batch.len() - miss_count,
            misses = miss_count,
            "batch partitioned"
        );

        let (annotated, mut capture) = if misses.is_empty() {
            (Vec::new(), None)
        } else {
            self.run_misses(misses)?
        };

        let mut fresh = annotated.into_iter();
        let mut outputs = Vec::with_capacity(slots.len());
        let mut cache_writes = Vec::new();
        for slot in slots {
            match slot {
                Slot::Cached(item) => outputs.push(item),
                Slot::Fresh => {
                    let mut item = fresh.next().ok_or_else(|| ComponentError::Arity {
                        component: self.name.clone(),
                        stage: BatchStage::ParseResponses,
                        expected: miss_count,
                        actual: cache_writes.len(),
                    })?;
                    cache_writes.push(item.clone());
                    if let Some(capture) = capture.as_mut() {
                        capture.attach(&self.name, &mut item)?;
                    }
                    outputs.push(item);
                }
            }
        }

        trace!(writes = cache_writes.len(), "writing fresh items to cache");
        for item in cache_writes {
            self.cache.add(item);
        }
        Ok(outputs)
    }

    /// Runs the task and backend over the misses. Returns the annotated items in
    /// miss order plus, with `save_io`, the retained prompts and responses.
    fn run_misses(
        &self,
        misses: Vec<I>,
    ) -> Result<(Vec<I>, Option<ExchangeCapture>), ComponentError> {
        let expected = misses.len();

        let prompts = self
            .task
            .generate_prompts(&misses)
            .map_err(|err| ComponentError::batch(&self.name, BatchStage::GeneratePrompts, err))?;
        check_arity(&self.name, BatchStage::GeneratePrompts, expected, prompts.len())?;

        let responses = self
            .backend
            .complete(&prompts)
            .map_err(|err| ComponentError::batch(&self.name, BatchStage::Complete, err))?;
        check_arity(&self.name, BatchStage::Complete, expected, responses.len())?;

        let annotated = self
            .task
            .parse_responses(misses, &responses)
            .map_err(|err| ComponentError::batch(&self.name, BatchStage::ParseResponses, err))?;
        check_arity(&self.name, BatchStage::ParseResponses, expected, annotated.len())?;

        let capture = self
            .save_io
            .then(|| ExchangeCapture::new(prompts, responses));
        Ok((annotated, capture))
    }

    /// Scores `examples` with the task's scorer. Without the capability the
    /// result is empty.
    pub fn score(&self, examples: &[Example<I>]) -> Scores {
        if !self.capabilities.scoring {
            return Scores::new();
        }
        self.task
            .scorer()
            .map(|scorer| scorer.score(examples))
            .unwrap_or_default()
    }

    /// Runs the task's initialization hook. Returns `false` when the task has none.
    #[tracing::instrument(
        name = "llm.component.initialize",
        level = "debug",
        skip_all,
        fields(component = %self.name)
    )]
    pub fn initialize(
        &mut self,
        get_examples: &dyn Fn() -> Vec<Example<I>>,
    ) -> Result<bool, ComponentError> {
        if !self.capabilities.initialize {
            debug!("task has no initialization hook");
            return Ok(false);
        }
        let Some(initializer) = self.task.initializer() else {
            return Ok(false);
        };
        initializer
            .initialize(get_examples)
            .map_err(|err| ComponentError::Initialization {
                component: self.name.clone(),
                source: err.into(),
            })?;
        Ok(true)
    }

    pub(crate) fn task_persistence(&self) -> Option<&dyn Persist> {
        if self.capabilities.task_persistence {
            self.task.persistence()
        } else {
            None
        }
    }

    pub(crate) fn task_persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        if self.capabilities.task_persistence {
            self.task.persistence_mut()
        } else {
            None
        }
    }

    pub(crate) fn backend_persistence(&self) -> Option<&dyn Persist> {
        if self.capabilities.backend_persistence {
            self.backend.persistence()
        } else {
            None
        }
    }

    pub(crate) fn backend_persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        if self.capabilities.backend_persistence {
            self.backend.persistence_mut()
        } else {
            None
        }
    }
}

impl<I: WorkItem> std::fmt::Debug for LlmComponent<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmComponent")
            .field("name", &self.name)
            .field("vocab", &self.vocab)
            .field("save_io", &self.save_io)
            .field("batch_size", &self.batch_size)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
