//! Hospital perishable-inventory control with reinforcement learning.
//!
//! - [`simulation::engine::HospitalEnv`]: the seeded inventory MDP
//! - [`strategy`]: baseline order policies and the DQN trainer
//! - [`service::InferenceService`]: validated prediction requests against a loaded policy
//! - [`io`]: demand generation, model artifacts and CSV reports

pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod service;
pub mod simulation;
pub mod strategy;

pub use error::{ConfigError, EnvError, InferenceError, ModelStoreError};
pub use model::observation::Observation;
pub use simulation::config::{EnvConfig, TrainingConfig};
pub use simulation::engine::{HospitalEnv, StepResult};
