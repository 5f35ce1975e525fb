use std::iter::FusedIterator;
use tracing::{debug, warn};

use crate::{ComponentError, LlmComponent, WorkItem};

/// Stock error handler that re-raises, ending the stream at the first failed batch.
pub fn raise_error<I: WorkItem>(
    _name: &str,
    _component: &LlmComponent<I>,
    _batch: &[I],
    error: ComponentError,
) -> Result<(), ComponentError> {
    Err(error)
}

/// Stock error handler that drops the failed batch and keeps going.
pub fn ignore_error<I: WorkItem>(
    name: &str,
    _component: &LlmComponent<I>,
    batch: &[I],
    error: ComponentError,
) -> Result<(), ComponentError> {
    debug!(component = name, batch_len = batch.len(), %error, "ignoring failed batch");
    Ok(())
}

impl<I: WorkItem> LlmComponent<I> {
    /// Annotates a stream lazily, `batch_size` items at a time.
    ///
    /// One batch is in flight at a time and is pulled from `stream` only once
    /// the previous batch's outputs have been consumed. When a batch fails,
    /// `handler` receives the component name, the component, the failing batch
    /// and the error. Returning `Ok(())` drops the batch (it yields nothing);
    /// returning an error yields it and ends the stream. Failures outside a
    /// single batch, such as a cache inconsistency, end the stream without
    /// consulting the handler.
    pub fn pipe<S, H>(
        &mut self,
        stream: S,
        batch_size: usize,
        handler: H,
    ) -> Result<Pipe<'_, I, S::IntoIter, H>, ComponentError>
    where
        S: IntoIterator<Item = I>,
        H: FnMut(&str, &LlmComponent<I>, &[I], ComponentError) -> Result<(), ComponentError>,
    {
        if batch_size == 0 {
            return Err(ComponentError::Configuration {
                message: "`batch_size` must be positive".to_string(),
            });
        }
        Ok(Pipe {
            component: self,
            stream: stream.into_iter(),
            batch_size,
            handler,
            pending: Vec::new().into_iter(),
            batches: 0,
            done: false,
        })
    }
}

/// Lazy output of [`LlmComponent::pipe`].
pub struct Pipe<'a, I: WorkItem, S, H> {
    component: &'a mut LlmComponent<I>,
    stream: S,
    batch_size: usize,
    handler: H,
    pending: std::vec::IntoIter<I>,
    batches: usize,
    done: bool,
}

impl<I, S, H> Pipe<'_, I, S, H>
where
    I: WorkItem,
    S: Iterator<Item = I>,
    H: FnMut(&str, &LlmComponent<I>, &[I], ComponentError) -> Result<(), ComponentError>,
{
    /// Pulls and processes the next batch. Returns `Some(error)` when the stream
    /// has to stop.
    #[tracing::instrument(
        name = "llm.pipe.batch",
        level = "debug",
        skip(self),
        fields(component = %self.component.name(), batch = self.batches)
    )]
    fn advance(&mut self) -> Option<ComponentError> {
        let batch: Vec<I> = self.stream.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            debug!(batches = self.batches, "stream exhausted");
            self.done = true;
            return None;
        }
        self.batches += 1;

        match self.component.process_batch(&batch) {
            Ok(outputs) => {
                self.pending = outputs.into_iter();
                None
            }
            Err(error) if error.is_batch_failure() => {
                let component = &*self.component;
                match (self.handler)(component.name(), component, &batch, error) {
                    Ok(()) => {
                        warn!(batch_len = batch.len(), "batch failed and was skipped");
                        None
                    }
                    Err(error) => {
                        self.done = true;
                        Some(error)
                    }
                }
            }
            Err(error) => {
                self.done = true;
                Some(error)
            }
        }
    }
}

impl<I, S, H> Iterator for Pipe<'_, I, S, H>
where
    I: WorkItem,
    S: Iterator<Item = I>,
    H: FnMut(&str, &LlmComponent<I>, &[I], ComponentError) -> Result<(), ComponentError>,
{
    type Item = Result<I, ComponentError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Some(error) = self.advance() {
                return Some(Err(error));
            }
        }
    }
}

impl<I, S, H> FusedIterator for Pipe<'_, I, S, H>
where
    I: WorkItem,
    S: Iterator<Item = I>,
    H: FnMut(&str, &LlmComponent<I>, &[I], ComponentError) -> Result<(), ComponentError>,
{
}
