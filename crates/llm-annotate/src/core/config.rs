use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::ComponentError;

pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Declarative settings of an [`LlmComponent`](crate::LlmComponent).
///
/// Collaborators (task, backend, cache) are passed separately to
/// [`LlmComponent::from_config`](crate::LlmComponent::from_config); this only
/// carries the plain values a host keeps in its config files.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentConfig {
    /// Component instance name. Also the key of exchange records.
    #[builder(into, default = "llm".to_string())]
    pub name: String,
    /// Record each fresh item's prompt and response in its exchange journal.
    #[builder(default = false)]
    pub save_io: bool,
    /// Number of items buffered per batch when piping a stream.
    #[builder(default = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        ComponentConfig::builder().build()
    }
}

impl ComponentConfig {
    /// Parses settings from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ComponentError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ComponentError::Configuration {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComponentError> {
        if self.batch_size == 0 {
            return Err(ComponentError::Configuration {
                message: "`batch_size` must be positive".to_string(),
            });
        }
        Ok(())
    }
}
