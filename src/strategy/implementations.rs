// src/strategy/implementations.rs

use crate::model::observation::Observation;
use crate::model::MAX_ORDER;
use crate::simulation::config::EnvConfig;
use crate::strategy::optimization::order_up_to_level;
use crate::strategy::traits::OrderPolicy;

/// Rounds a raw order to whole units inside the action space.
pub fn clamp_order(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        0
    } else {
        (raw.round() as u32).min(MAX_ORDER)
    }
}

// =========================================================================
// 1. Constant Policy
// =========================================================================

/// Orders the same quantity every day regardless of state.
#[derive(Debug, Clone)]
pub struct ConstantPolicy {
    quantity: u32,
}

impl ConstantPolicy {
    pub fn new(quantity: u32) -> Self {
        Self {
            quantity: quantity.min(MAX_ORDER),
        }
    }
}

impl OrderPolicy for ConstantPolicy {
    fn name(&self) -> &str {
        "constant"
    }

    fn select_order(&self, _observation: &Observation) -> u32 {
        self.quantity
    }
}

// =========================================================================
// 2. Forecast Cover Policy
// =========================================================================

/// Tops on-hand stock up to today's forecast, ignoring the pipeline.
///
/// Formula: Order = max(0, Forecast - OnHand)
#[derive(Debug, Clone, Default)]
pub struct ForecastCoverPolicy;

impl ForecastCoverPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl OrderPolicy for ForecastCoverPolicy {
    fn name(&self) -> &str {
        "forecast-cover"
    }

    fn select_order(&self, observation: &Observation) -> u32 {
        clamp_order(observation.forecast - observation.on_hand())
    }
}

// =========================================================================
// 3. Base Stock Policy (Rational / "Order-Up-To")
// =========================================================================

/// Maintains a target inventory position.
///
/// Formula: Order = Forecast + (Target - (OnHand + InTransit))
///
/// Units already in the pipeline count toward the position, so the policy
/// does not reorder what is on its way.
#[derive(Debug, Clone)]
pub struct BaseStockPolicy {
    target_position: f64,
}

impl BaseStockPolicy {
    pub fn new(target_position: u32) -> Self {
        Self {
            target_position: f64::from(target_position),
        }
    }

    /// Creates a BaseStockPolicy with a target calculated from the
    /// environment's cost parameters (Newsvendor Model).
    pub fn with_optimal_target(config: &EnvConfig, avg_demand: f64, std_dev_demand: f64) -> Self {
        Self::new(order_up_to_level(config, avg_demand, std_dev_demand))
    }

    pub fn target(&self) -> f64 {
        self.target_position
    }
}

impl OrderPolicy for BaseStockPolicy {
    fn name(&self) -> &str {
        "base-stock"
    }

    fn select_order(&self, observation: &Observation) -> u32 {
        let position = observation.on_hand() + observation.in_transit();
        let gap = self.target_position - position;

        // If we are overstocked (gap is negative), this reduces the order.
        clamp_order(observation.forecast + gap)
    }
}
