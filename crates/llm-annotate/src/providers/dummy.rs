use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{CompletionBackend, Persist};

type Responder = dyn Fn(&str) -> String + Send + Sync;
type FailWhen = dyn Fn(&str) -> bool + Send + Sync;

/// Persisted settings of a [`DummyBackend`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
struct DummySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// In-process backend for tests and examples.
///
/// Answers each prompt with `respond(prompt)` and records every call. Clones
/// share the call log, so a test can keep a handle after moving the backend
/// into a component.
#[derive(Clone)]
pub struct DummyBackend {
    respond: Arc<Responder>,
    fail_when: Option<Arc<FailWhen>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    settings: DummySettings,
}

impl DummyBackend {
    pub fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            respond: Arc::new(respond),
            fail_when: None,
            calls: Arc::default(),
            settings: DummySettings::default(),
        }
    }

    /// Backend that answers every prompt with the prompt itself.
    pub fn echo() -> Self {
        Self::new(str::to_string)
    }

    /// Makes any call containing a prompt that matches `predicate` fail.
    pub fn fail_when(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> Option<&str> {
        self.settings.model.as_deref()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.settings.temperature
    }

    /// Prompts of every call so far, one entry per call.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All prompts received so far, flattened in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().flatten().collect()
    }
}

impl CompletionBackend for DummyBackend {
    fn complete(&self, prompts: &[String]) -> Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompts.to_vec());
        if let Some(fail_when) = &self.fail_when
            && let Some(prompt) = prompts.iter().find(|prompt| fail_when(prompt.as_str()))
        {
            bail!("dummy backend rejected prompt `{prompt}`");
        }
        Ok(prompts.iter().map(|prompt| (self.respond)(prompt.as_str())).collect())
    }

    fn persistence(&self) -> Option<&dyn Persist> {
        Some(self)
    }

    fn persistence_mut(&mut self) -> Option<&mut dyn Persist> {
        Some(self)
    }
}

impl Persist for DummyBackend {
    fn to_bytes(&self, exclude: &[&str]) -> Result<Vec<u8>> {
        let mut settings = self.settings.clone();
        if exclude.contains(&"model") {
            settings.model = None;
        }
        if exclude.contains(&"temperature") {
            settings.temperature = None;
        }
        Ok(serde_json::to_vec(&settings)?)
    }

    fn from_bytes(&mut self, data: &[u8], exclude: &[&str]) -> Result<()> {
        let restored: DummySettings = serde_json::from_slice(data)?;
        if !exclude.contains(&"model") {
            self.settings.model = restored.model;
        }
        if !exclude.contains(&"temperature") {
            self.settings.temperature = restored.temperature;
        }
        Ok(())
    }
}
