// src/service/mod.rs

//! Request/response boundary around a trained policy.
//!
//! An `InferenceService` is built once at startup, optionally holding a policy
//! loaded from an artifact, and is read-only afterwards. Every call is
//! independent, so a shared reference can serve concurrent requests.

use crate::error::InferenceError;
use crate::io::model_store;
use crate::model::observation::Observation;
use crate::model::{MAX_ORDER, PIPELINE_SLOTS, SHELF_LIFE_DAYS};
use crate::strategy::traits::OrderPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const ENVIRONMENT_NAME: &str = "HospitalInventoryEnv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub inventory: Vec<f64>,
    pub pipeline: Vec<f64>,
    pub forecast: f64,
}

impl PredictionRequest {
    /// Parses one request body. Malformed JSON is the caller's fault.
    pub fn from_json(raw: &str) -> Result<Self, InferenceError> {
        serde_json::from_str(raw).map_err(|err| InferenceError::Validation(err.to_string()))
    }

    /// Parses a JSON array of request bodies.
    pub fn batch_from_json(raw: &str) -> Result<Vec<Self>, InferenceError> {
        serde_json::from_str(raw).map_err(|err| InferenceError::Validation(err.to_string()))
    }

    /// Checks shape and values and builds the policy input.
    pub fn to_observation(&self) -> Result<Observation, InferenceError> {
        let inventory: [f64; SHELF_LIFE_DAYS] =
            self.inventory.as_slice().try_into().map_err(|_| {
                InferenceError::Validation(format!(
                    "inventory must have {SHELF_LIFE_DAYS} values, got {}",
                    self.inventory.len()
                ))
            })?;
        let pipeline: [f64; PIPELINE_SLOTS] =
            self.pipeline.as_slice().try_into().map_err(|_| {
                InferenceError::Validation(format!(
                    "pipeline must have {PIPELINE_SLOTS} values, got {}",
                    self.pipeline.len()
                ))
            })?;

        check_quantities("inventory", &inventory)?;
        check_quantities("pipeline", &pipeline)?;
        check_quantities("forecast", &[self.forecast])?;

        Ok(Observation {
            inventory,
            pipeline,
            forecast: self.forecast,
        })
    }
}

fn check_quantities(field: &str, values: &[f64]) -> Result<(), InferenceError> {
    match values.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(i) => Err(InferenceError::Validation(format!(
            "{field}[{i}] must be a finite non-negative number, got {}",
            values[i]
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub action: u32,
    pub observation: PredictionRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResponse>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub environment: String,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceService {
    policy: Option<Arc<dyn OrderPolicy>>,
}

impl InferenceService {
    /// A service with no policy; predictions fail until one is supplied.
    pub fn unloaded() -> Self {
        Self { policy: None }
    }

    pub fn with_policy(policy: Arc<dyn OrderPolicy>) -> Self {
        Self {
            policy: Some(policy),
        }
    }

    /// Loads the policy artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let policy = model_store::load_policy(path)?;
        info!(path = %path.display(), "inference service ready");
        Ok(Self::with_policy(Arc::new(policy)))
    }

    /// Like `load`, but starts unloaded instead of failing so health checks
    /// can report the problem.
    pub fn load_or_unloaded(path: &Path) -> Self {
        match Self::load(path) {
            Ok(service) => service,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "model unavailable");
                Self::unloaded()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.policy.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        let loaded = self.is_loaded();
        HealthStatus {
            status: if loaded { "healthy" } else { "unhealthy" }.to_string(),
            model_loaded: loaded,
            environment: ENVIRONMENT_NAME.to_string(),
        }
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, InferenceError> {
        let policy = self.policy.as_ref().ok_or(InferenceError::ModelNotLoaded)?;
        let observation = request.to_observation()?;
        let action = policy.select_order(&observation).min(MAX_ORDER);

        Ok(PredictionResponse {
            action,
            observation: request.clone(),
        })
    }

    /// Predicts every request in order; one invalid record fails the batch.
    pub fn batch_predict(
        &self,
        requests: &[PredictionRequest],
    ) -> Result<BatchPredictionResponse, InferenceError> {
        if !self.is_loaded() {
            return Err(InferenceError::ModelNotLoaded);
        }

        let predictions = requests
            .iter()
            .enumerate()
            .map(|(i, request)| {
                self.predict(request).map_err(|err| match err {
                    InferenceError::Validation(msg) => {
                        InferenceError::Validation(format!("record {i}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchPredictionResponse {
            count: predictions.len(),
            predictions,
        })
    }
}
