//! Reduction configuration.
//!
//! ```toml
//! channel_capacity = 128
//!
//! [reducer]
//! type = "sum"
//! fields = ["bytes_sent", "request_time"]
//! ```
//!
//! The reducer may also be given in the text DSL:
//!
//! ```toml
//! pipeline = "COUNT | SUM bytes_sent"
//! ```

use serde::{Deserialize, Serialize};

use crate::dsl::{ReducerSpec, parse_reducer};
use crate::error::ReduceError;
use crate::reducer::{DEFAULT_CHAIN_CAPACITY, Reducer, spec_to_reducer};

fn default_channel_capacity() -> usize {
    DEFAULT_CHAIN_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceConfig {
    /// Capacity of entry channels created for a reduction.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Structured reducer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reducer: Option<ReducerSpec>,

    /// Reducer description in the text DSL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            reducer: None,
            pipeline: None,
        }
    }
}

impl ReduceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ReduceError> {
        let config: ReduceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.channel_capacity == 0 {
            return Err(ReduceError::InvalidCapacity);
        }
        self.spec().map(|_| ())
    }

    /// The configured reducer description.
    ///
    /// Exactly one of `reducer` and `pipeline` must be set.
    pub fn spec(&self) -> Result<ReducerSpec, ReduceError> {
        match (&self.reducer, &self.pipeline) {
            (Some(spec), None) => Ok(spec.clone()),
            (None, Some(text)) => parse_reducer(text),
            (Some(_), Some(_)) => Err(ReduceError::Parse(
                "set either `reducer` or `pipeline`, not both".to_string(),
            )),
            (None, None) => Err(ReduceError::Parse("no reducer configured".to_string())),
        }
    }

    /// Build a fresh reducer for one reduction pass.
    pub fn build_reducer(&self) -> Result<Box<dyn Reducer>, ReduceError> {
        spec_to_reducer(&self.spec()?, self.channel_capacity)
    }
}
