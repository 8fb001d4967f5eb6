#![forbid(unsafe_code)]

//! Presentation-model policy.
//!
//! [`ModelConfig`] is passed explicitly to
//! [`PresentationModel::with_config`](crate::model::PresentationModel::with_config);
//! there is no process-wide default beyond [`ModelConfig::default`].
//!
//! With the `policy-config` feature, a config can be loaded from TOML or JSON:
//!
//! ```toml
//! validate_after_commit = true
//! validate_after_flush = false
//! error_threshold = "warning"
//! ```
//!
//! Missing keys fall back to their defaults; unknown keys are rejected.

use crate::validation::Severity;

/// Policy knobs for a presentation model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct ModelConfig {
    /// Re-validate after every `commit_data()` pass.
    pub validate_after_commit: bool,
    /// Re-validate after every `flush_data()` pass.
    pub validate_after_flush: bool,
    /// Lowest severity that makes the model invalid.
    pub error_threshold: Severity,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            validate_after_commit: true,
            validate_after_flush: false,
            error_threshold: Severity::Error,
        }
    }
}

impl ModelConfig {
    /// Set whether `commit_data()` re-validates.
    #[must_use]
    pub fn with_validate_after_commit(mut self, enabled: bool) -> Self {
        self.validate_after_commit = enabled;
        self
    }

    /// Set whether `flush_data()` re-validates.
    #[must_use]
    pub fn with_validate_after_flush(mut self, enabled: bool) -> Self {
        self.validate_after_flush = enabled;
        self
    }

    /// Set the severity at which the model becomes invalid.
    #[must_use]
    pub fn with_error_threshold(mut self, threshold: Severity) -> Self {
        self.error_threshold = threshold;
        self
    }
}

#[cfg(feature = "policy-config")]
mod load {
    use std::fmt;

    use super::ModelConfig;

    /// Failure to parse a policy file.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        /// The input was not valid for the given format.
        Parse {
            format: &'static str,
            message: String,
        },
    }

    impl fmt::Display for ConfigError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Parse { format, message } => {
                    write!(f, "invalid {format} model config: {message}")
                }
            }
        }
    }

    impl std::error::Error for ConfigError {}

    impl ModelConfig {
        /// Parse a TOML policy.
        ///
        /// # Errors
        ///
        /// [`ConfigError::Parse`] on malformed input or unknown keys.
        pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
            toml::from_str(input).map_err(|err| ConfigError::Parse {
                format: "toml",
                message: err.to_string(),
            })
        }

        /// Parse a JSON policy.
        ///
        /// # Errors
        ///
        /// [`ConfigError::Parse`] on malformed input or unknown keys.
        pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
            serde_json::from_str(input).map_err(|err| ConfigError::Parse {
                format: "json",
                message: err.to_string(),
            })
        }
    }
}

#[cfg(feature = "policy-config")]
pub use load::ConfigError;
