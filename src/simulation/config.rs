// src/simulation/config.rs

use crate::error::{ConfigError, EnvError};
use crate::model::{MAX_CONFIGURED_UNITS, SHELF_LIFE_DAYS};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where daily demand comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandSource {
    /// Poisson draws around `base + amplitude * sin(2*pi*t / period_days)`.
    Seasonal {
        base: f64,
        amplitude: f64,
        period_days: f64,
    },
    /// The same demand every day.
    Constant { units: u32 },
    /// A fixed schedule, cycled when shorter than the horizon.
    Schedule { units: Vec<u32> },
}

impl Default for DemandSource {
    fn default() -> Self {
        DemandSource::Seasonal {
            base: 20.0,
            amplitude: 10.0,
            period_days: 365.0,
        }
    }
}

impl DemandSource {
    /// Mean and standard deviation of daily demand, used to size base-stock
    /// targets.
    pub fn moments(&self) -> (f64, f64) {
        match self {
            // Poisson variance plus the variance of a full sine cycle.
            DemandSource::Seasonal {
                base, amplitude, ..
            } => (*base, (base + amplitude * amplitude / 2.0).sqrt()),
            DemandSource::Constant { units } => (f64::from(*units), 0.0),
            DemandSource::Schedule { units } => {
                if units.is_empty() {
                    return (0.0, 0.0);
                }
                let n = units.len() as f64;
                let mean = units.iter().map(|&u| f64::from(u)).sum::<f64>() / n;
                let var = units
                    .iter()
                    .map(|&u| (f64::from(u) - mean).powi(2))
                    .sum::<f64>()
                    / n;
                (mean, var.sqrt())
            }
        }
    }
}

/// How the forecast shown to the policy is produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastModel {
    /// The forecast is the scheduled demand itself, so realized demand
    /// always equals the forecast.
    #[default]
    Oracle,
    /// Mean of the trailing `window` realized demands.
    MovingAverage { window: usize },
}

/// What `step` does with an order quantity outside `0..=MAX_ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionHandling {
    #[default]
    Reject,
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub horizon: usize,
    pub holding_cost: f64,
    pub waste_cost: f64,
    pub shortage_cost: f64,
    pub initial_inventory: [u32; SHELF_LIFE_DAYS],
    pub demand: DemandSource,
    pub forecast: ForecastModel,
    pub action_handling: ActionHandling,
    pub seed: u64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            horizon: 365,
            holding_cost: 0.5,
            waste_cost: 2.0,
            shortage_cost: 3.0,
            initial_inventory: [0; SHELF_LIFE_DAYS],
            demand: DemandSource::default(),
            forecast: ForecastModel::default(),
            action_handling: ActionHandling::default(),
            seed: 0,
        }
    }
}

impl EnvConfig {
    /// Rejects configurations that would make the dynamics meaningless.
    ///
    /// Starting stock and expected daily demand are capped at
    /// `MAX_CONFIGURED_UNITS` so unit counts stay far from `u32` overflow.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.horizon == 0 {
            return Err(EnvError::InvalidConfig("horizon must be at least 1".into()));
        }

        for (name, cost) in [
            ("holding_cost", self.holding_cost),
            ("waste_cost", self.waste_cost),
            ("shortage_cost", self.shortage_cost),
        ] {
            if !cost.is_finite() || cost < 0.0 {
                return Err(EnvError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {cost}"
                )));
            }
        }

        let initial: u64 = self.initial_inventory.iter().map(|&u| u64::from(u)).sum();
        if initial > u64::from(MAX_CONFIGURED_UNITS) {
            return Err(EnvError::InvalidConfig(format!(
                "initial_inventory totals {initial} units, limit is {MAX_CONFIGURED_UNITS}"
            )));
        }

        let peak_demand = match &self.demand {
            DemandSource::Seasonal {
                base,
                amplitude,
                period_days,
            } => {
                if !base.is_finite() || *base < 0.0 || !amplitude.is_finite() {
                    return Err(EnvError::InvalidConfig(
                        "seasonal demand needs a finite non-negative base and a finite amplitude"
                            .into(),
                    ));
                }
                if !period_days.is_finite() || *period_days <= 0.0 {
                    return Err(EnvError::InvalidConfig(
                        "seasonal period_days must be positive".into(),
                    ));
                }
                base + amplitude.abs()
            }
            DemandSource::Constant { units } => f64::from(*units),
            DemandSource::Schedule { units } => match units.iter().max() {
                Some(&max) => f64::from(max),
                None => {
                    return Err(EnvError::InvalidConfig("demand schedule is empty".into()));
                }
            },
        };
        if peak_demand > f64::from(MAX_CONFIGURED_UNITS) {
            return Err(EnvError::InvalidConfig(format!(
                "daily demand may reach {peak_demand} units, limit is {MAX_CONFIGURED_UNITS}"
            )));
        }

        if let ForecastModel::MovingAverage { window: 0 } = self.forecast {
            return Err(EnvError::InvalidConfig(
                "moving average window must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

// =========================================================================
// Training run parameters
// =========================================================================

/// Hyper-parameters for the value-based trainer.
///
/// The four tunables can be overridden through `TIMESTEPS`, `LEARNING_RATE`,
/// `BUFFER_SIZE` and `BATCH_SIZE`; the rest are fixed defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub timesteps: usize,
    pub learning_rate: f64,
    pub buffer_size: usize,
    pub batch_size: usize,
    pub train_freq: usize,
    pub target_update_interval: usize,
    pub exploration_fraction: f64,
    pub exploration_initial_eps: f64,
    pub exploration_final_eps: f64,
    pub gamma: f64,
    pub learning_starts: usize,
    pub hidden_units: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            timesteps: 20_000,
            learning_rate: 1e-3,
            buffer_size: 50_000,
            batch_size: 32,
            train_freq: 4,
            target_update_interval: 1_000,
            exploration_fraction: 0.3,
            exploration_initial_eps: 1.0,
            exploration_final_eps: 0.05,
            gamma: 0.99,
            learning_starts: 1_000,
            hidden_units: 64,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "TIMESTEPS", "positive integer")? {
            config.timesteps = v;
        }
        if let Some(v) = parse_var(&lookup, "LEARNING_RATE", "float")? {
            config.learning_rate = v;
        }
        if let Some(v) = parse_var(&lookup, "BUFFER_SIZE", "positive integer")? {
            config.buffer_size = v;
        }
        if let Some(v) = parse_var(&lookup, "BATCH_SIZE", "positive integer")? {
            config.batch_size = v;
        }
        Ok(config)
    }
}

fn parse_var<T, F>(
    lookup: &F,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    // Empty values fall back to the default, like an unset variable.
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            expected,
        })
}
