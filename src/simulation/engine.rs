// src/simulation/engine.rs

use crate::error::EnvError;
use crate::io::demand;
use crate::model::ledger::InventoryLedger;
use crate::model::observation::Observation;
use crate::model::queues::OrderPipeline;
use crate::model::MAX_ORDER;
use crate::simulation::config::{ActionHandling, DemandSource, EnvConfig, ForecastModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Where an environment instance is in its episode lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EpisodePhase {
    Uninitialized,
    Running,
    Done,
}

/// Diagnostics for a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepInfo {
    pub day: usize,
    pub order: u32,
    pub arrivals: u32,
    pub demand: u32,
    pub served: u32,
    pub shortage: u32,
    pub waste: u32,
    pub on_hand: u32,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// The hospital inventory MDP.
///
/// One instance owns one episode at a time. `reset` and `step` take `&mut self`
/// so callers serialize access; run one instance per worker for parallelism.
#[derive(Debug, Clone)]
pub struct HospitalEnv {
    config: EnvConfig,

    // Episode state
    ledger: InventoryLedger,
    pipeline: OrderPipeline,
    forecast: f64,

    // Inputs
    demand_schedule: Vec<u32>,
    realized_demand: Vec<u32>,

    current_day: usize,
    phase: EpisodePhase,
}

impl HospitalEnv {
    pub fn new(config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;

        Ok(Self {
            ledger: InventoryLedger::new(config.initial_inventory),
            pipeline: OrderPipeline::new(),
            forecast: 0.0,
            demand_schedule: Vec::new(),
            realized_demand: Vec::new(),
            current_day: 0,
            phase: EpisodePhase::Uninitialized,
            config,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn current_day(&self) -> usize {
        self.current_day
    }

    pub fn demand_schedule(&self) -> &[u32] {
        &self.demand_schedule
    }

    pub fn observation(&self) -> Observation {
        Observation::from_units(self.ledger.buckets(), self.pipeline.slots(), self.forecast)
    }

    /// Starts a new episode from the configured seed.
    ///
    /// Resetting twice in a row yields the same episode as resetting once.
    pub fn reset(&mut self) -> Observation {
        self.ledger = InventoryLedger::new(self.config.initial_inventory);
        self.pipeline.clear();
        self.current_day = 0;
        self.realized_demand.clear();
        self.demand_schedule = self.build_demand_schedule();
        self.forecast = f64::from(self.demand_schedule[0]);
        self.phase = EpisodePhase::Running;

        debug!(
            seed = self.config.seed,
            horizon = self.config.horizon,
            forecast = self.forecast,
            "episode reset"
        );
        self.observation()
    }

    /// Re-seeds the environment, then resets it.
    pub fn reset_with_seed(&mut self, seed: u64) -> Observation {
        self.config.seed = seed;
        self.reset()
    }

    /// Advances the episode by one day after ordering `action` units.
    pub fn step(&mut self, action: i64) -> Result<StepResult, EnvError> {
        match self.phase {
            EpisodePhase::Uninitialized => {
                return Err(EnvError::InvalidState("step called before reset"))
            }
            EpisodePhase::Done => return Err(EnvError::EpisodeFinished(self.current_day)),
            EpisodePhase::Running => {}
        }
        let order = self.resolve_action(action)?;
        let day = self.current_day;

        // 1. Arrival
        let arrivals = self.pipeline.pop_arrival();
        self.ledger.receive(arrivals);

        // 2. Demand realization
        let demand = self.demand_schedule[day];

        // 3. Fulfillment
        let fulfillment = self.ledger.fulfill(demand);

        // 4. Aging & expiry
        let waste = self.ledger.age();

        // 5. Ordering
        self.pipeline.push_order(order);

        // 6. Forecast update
        self.realized_demand.push(demand);
        self.current_day += 1;
        self.forecast = self.next_forecast();

        // 7. Reward
        let on_hand = self.ledger.on_hand();
        let cost = self.config.holding_cost * f64::from(on_hand)
            + self.config.waste_cost * f64::from(waste)
            + self.config.shortage_cost * f64::from(fulfillment.shortage);

        // 8. Termination
        let done = self.current_day >= self.config.horizon;
        if done {
            self.phase = EpisodePhase::Done;
        }

        let info = StepInfo {
            day,
            order,
            arrivals,
            demand,
            served: fulfillment.served,
            shortage: fulfillment.shortage,
            waste,
            on_hand,
            cost,
        };
        debug!(?info, "step");

        Ok(StepResult {
            observation: self.observation(),
            reward: -cost,
            done,
            info,
        })
    }

    fn resolve_action(&self, action: i64) -> Result<u32, EnvError> {
        if (0..=i64::from(MAX_ORDER)).contains(&action) {
            return Ok(action as u32);
        }
        match self.config.action_handling {
            ActionHandling::Reject => Err(EnvError::InvalidAction(action)),
            ActionHandling::Clamp => Ok(action.clamp(0, i64::from(MAX_ORDER)) as u32),
        }
    }

    /// One entry per day plus one so the final observation has a forecast.
    fn build_demand_schedule(&self) -> Vec<u32> {
        let days = self.config.horizon + 1;
        match &self.config.demand {
            DemandSource::Seasonal {
                base,
                amplitude,
                period_days,
            } => {
                let mut rng = StdRng::seed_from_u64(self.config.seed);
                demand::generate_seasonal_demand(days, *base, *amplitude, *period_days, &mut rng)
            }
            DemandSource::Constant { units } => demand::generate_constant_demand(days, *units),
            DemandSource::Schedule { units } => demand::cycle_schedule(units, days),
        }
    }

    fn next_forecast(&self) -> f64 {
        match self.config.forecast {
            ForecastModel::Oracle => f64::from(self.demand_schedule[self.current_day]),
            ForecastModel::MovingAverage { window } => {
                let start = self.realized_demand.len().saturating_sub(window);
                let recent = &self.realized_demand[start..];
                recent.iter().map(|&d| f64::from(d)).sum::<f64>() / recent.len() as f64
            }
        }
    }
}

/// Human-readable snapshot of the current day.
impl fmt::Display for HospitalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Day {}/{}", self.current_day, self.config.horizon)?;
        writeln!(
            f,
            "Inventory by age: {:?} (on hand {})",
            self.ledger.buckets(),
            self.ledger.on_hand()
        )?;
        writeln!(
            f,
            "Pipeline: {:?} (in transit {})",
            self.pipeline.slots(),
            self.pipeline.in_transit()
        )?;
        write!(f, "Forecast for next day: {:.1}", self.forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PIPELINE_SLOTS, SHELF_LIFE_DAYS};

    fn constant_env(units: u32, horizon: usize) -> HospitalEnv {
        HospitalEnv::new(EnvConfig {
            horizon,
            demand: DemandSource::Constant { units },
            ..EnvConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn first_step_from_empty_state_is_all_shortage() {
        let mut env = HospitalEnv::new(EnvConfig::default()).unwrap();
        let obs = env.reset();
        assert_eq!(obs.inventory, [0.0; SHELF_LIFE_DAYS]);
        assert_eq!(obs.pipeline, [0.0; PIPELINE_SLOTS]);
        let f0 = obs.forecast;

        let result = env.step(12).unwrap();
        assert_eq!(result.info.arrivals, 0);
        assert_eq!(result.observation.pipeline, [0.0, 0.0, 0.0, 0.0, 0.0, 12.0]);
        assert_eq!(result.observation.inventory, [0.0; SHELF_LIFE_DAYS]);
        assert_eq!(f64::from(result.info.shortage), f0);
        assert_eq!(result.reward, -3.0 * f0);
        assert!(!result.done);
    }

    #[test]
    fn step_before_reset_is_invalid_state() {
        let mut env = constant_env(5, 10);
        assert_eq!(env.phase(), EpisodePhase::Uninitialized);
        assert!(matches!(env.step(1), Err(EnvError::InvalidState(_))));
    }

    #[test]
    fn out_of_range_action_is_rejected_without_mutation() {
        let mut env = constant_env(5, 10);
        env.reset();
        let before = env.observation();
        assert_eq!(env.step(51), Err(EnvError::InvalidAction(51)));
        assert_eq!(env.step(-1), Err(EnvError::InvalidAction(-1)));
        assert_eq!(env.observation(), before);
        assert_eq!(env.current_day(), 0);
    }

    #[test]
    fn out_of_range_action_is_clamped_when_configured() {
        let mut env = HospitalEnv::new(EnvConfig {
            action_handling: ActionHandling::Clamp,
            ..EnvConfig::default()
        })
        .unwrap();
        env.reset();
        let result = env.step(80).unwrap();
        assert_eq!(result.info.order, MAX_ORDER);
        let result = env.step(-4).unwrap();
        assert_eq!(result.info.order, 0);
    }

    #[test]
    fn episode_ends_at_horizon_and_requires_reset() {
        let mut env = constant_env(3, 4);
        env.reset();
        for i in 0..4 {
            let result = env.step(3).unwrap();
            assert_eq!(result.done, i == 3);
        }
        assert_eq!(env.phase(), EpisodePhase::Done);
        assert_eq!(env.step(0), Err(EnvError::EpisodeFinished(4)));

        env.reset();
        assert_eq!(env.phase(), EpisodePhase::Running);
        assert!(env.step(0).is_ok());
    }

    #[test]
    fn orders_arrive_after_six_steps_and_are_consumed() {
        let mut env = constant_env(4, 30);
        env.reset();
        let first = env.step(10).unwrap();
        assert_eq!(first.info.arrivals, 0);
        for _ in 0..5 {
            let r = env.step(0).unwrap();
            assert_eq!(r.info.arrivals, 0);
        }
        let r = env.step(0).unwrap();
        assert_eq!(r.info.arrivals, 10);
        assert_eq!(r.info.served, 4);
        assert_eq!(r.info.shortage, 0);
        // Remaining six units have aged one day.
        assert_eq!(r.observation.inventory[1], 6.0);
        assert_eq!(r.reward, -(0.5 * 6.0));
    }

    #[test]
    fn unsold_stock_expires_as_waste() {
        let mut env = HospitalEnv::new(EnvConfig {
            horizon: 20,
            initial_inventory: [0, 0, 0, 0, 0, 0, 8],
            demand: DemandSource::Constant { units: 3 },
            ..EnvConfig::default()
        })
        .unwrap();
        env.reset();
        let r = env.step(0).unwrap();
        assert_eq!(r.info.served, 3);
        assert_eq!(r.info.waste, 5);
        assert_eq!(r.info.on_hand, 0);
        assert_eq!(r.reward, -(2.0 * 5.0));
    }

    #[test]
    fn moving_average_forecast_follows_realized_demand() {
        let mut env = HospitalEnv::new(EnvConfig {
            horizon: 10,
            demand: DemandSource::Schedule {
                units: vec![10, 20, 30],
            },
            forecast: ForecastModel::MovingAverage { window: 2 },
            ..EnvConfig::default()
        })
        .unwrap();
        let obs = env.reset();
        assert_eq!(obs.forecast, 10.0);
        assert_eq!(env.step(0).unwrap().observation.forecast, 10.0);
        assert_eq!(env.step(0).unwrap().observation.forecast, 15.0);
        assert_eq!(env.step(0).unwrap().observation.forecast, 25.0);
    }

    #[test]
    fn oracle_forecast_equals_next_demand() {
        let mut env = HospitalEnv::new(EnvConfig::default()).unwrap();
        let mut obs = env.reset();
        for _ in 0..20 {
            let r = env.step(20).unwrap();
            assert_eq!(f64::from(r.info.demand), obs.forecast);
            obs = r.observation;
        }
    }

    #[test]
    fn reset_twice_matches_reset_once() {
        let mut once = HospitalEnv::new(EnvConfig::default()).unwrap();
        let mut twice = HospitalEnv::new(EnvConfig::default()).unwrap();

        let a = once.reset();
        twice.reset();
        twice.step(30).unwrap();
        twice.step(30).unwrap();
        let b = twice.reset();

        assert_eq!(a, b);
        assert_eq!(once.demand_schedule(), twice.demand_schedule());
        assert_eq!(once.step(7).unwrap(), twice.step(7).unwrap());
    }

    #[test]
    fn different_seeds_draw_different_demand() {
        let mut env = HospitalEnv::new(EnvConfig::default()).unwrap();
        env.reset_with_seed(1);
        let first = env.demand_schedule().to_vec();
        env.reset_with_seed(2);
        assert_ne!(first, env.demand_schedule());
        assert_eq!(env.demand_schedule().len(), 366);
    }

    #[test]
    fn display_renders_day_stock_pipeline_and_forecast() {
        let mut env = constant_env(5, 10);
        env.reset();
        env.step(12).unwrap();
        let rendered = env.to_string();
        assert_eq!(
            rendered,
            "Day 1/10\n\
             Inventory by age: [0, 0, 0, 0, 0, 0, 0] (on hand 0)\n\
             Pipeline: [0, 0, 0, 0, 0, 12] (in transit 12)\n\
             Forecast for next day: 5.0"
        );
    }
}
