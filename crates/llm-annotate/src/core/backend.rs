use anyhow::Result;

use crate::{IoKinds, Persist};

/// Executes prompts against a completion service.
///
/// Returns exactly one response per prompt, in submission order. Transport,
/// retries and rate limiting live behind this trait; a blocking backend blocks
/// the calling thread.
pub trait CompletionBackend {
    fn complete(&self, prompts: &[String]) -> Result<Vec<String>>;

    fn io_kinds(&self) -> IoKinds {
        IoKinds::default()
    }

    fn persistence(&self) -> Option<&dyn Persist> {
        None
    }

    fn persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        None
    }
}

impl<F> CompletionBackend for F
where
    F: Fn(&[String]) -> Result<Vec<String>>,
{
    fn complete(&self, prompts: &[String]) -> Result<Vec<String>> {
        self(prompts)
    }
}
