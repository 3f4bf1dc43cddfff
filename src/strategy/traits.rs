// src/strategy/traits.rs

use crate::model::observation::Observation;
use std::fmt::Debug;

/// Decides how many units to order given what the environment exposes.
///
/// Inference takes `&self`: a loaded policy is read-only, so one instance can
/// serve many threads at once. `Send + Sync` lets it sit behind an `Arc`.
pub trait OrderPolicy: Debug + Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Returns an order quantity in `0..=MAX_ORDER`.
    fn select_order(&self, observation: &Observation) -> u32;
}
