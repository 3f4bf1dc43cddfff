// src/error.rs

use thiserror::Error;

/// Failures raised by the inventory environment.
#[derive(Debug, Error, PartialEq)]
pub enum EnvError {
    #[error("invalid action {0}: order quantity must be within 0..=50")]
    InvalidAction(i64),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("episode finished after {0} steps; call reset() first")]
    EpisodeFinished(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures while persisting or restoring a policy artifact.
#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("artifact i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("incompatible artifact: {0}")]
    Incompatible(String),
}

/// Failures surfaced by the inference adapter.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("policy could not be loaded: {0}")]
    Policy(#[from] ModelStoreError),
}

impl InferenceError {
    /// True when the caller sent a malformed request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, InferenceError::Validation(_))
    }
}

/// Failures while reading training parameters from the environment.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}={value:?} is not a valid {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
