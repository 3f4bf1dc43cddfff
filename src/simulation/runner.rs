// src/simulation/runner.rs

use crate::error::EnvError;
use crate::simulation::engine::HospitalEnv;
use crate::strategy::traits::OrderPolicy;
use serde::Serialize;
use tracing::{debug, info};

// Serialize so the episode can be written to CSV later
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub episode: usize,
    pub day: usize,
    pub order: u32,
    pub arrivals: u32,
    pub demand: u32,
    pub forecast: f64,
    pub served: u32,
    pub shortage: u32,
    pub waste: u32,
    pub on_hand: u32,
    pub in_transit: u32,
    pub cost: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub policy: String,
    pub steps: usize,
    pub total_reward: f64,
    pub total_cost: f64,
    pub total_shortage: u64,
    pub total_waste: u64,
    pub records: Vec<StepRecord>,
}

impl EpisodeSummary {
    pub fn average_daily_cost(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.total_cost / self.steps as f64
        }
    }
}

/// Plays one full episode with `policy`, starting from a fresh reset.
pub fn run_episode(
    env: &mut HospitalEnv,
    policy: &dyn OrderPolicy,
    episode: usize,
) -> Result<EpisodeSummary, EnvError> {
    let mut observation = env.reset();
    let mut summary = EpisodeSummary {
        policy: policy.name().to_string(),
        steps: 0,
        total_reward: 0.0,
        total_cost: 0.0,
        total_shortage: 0,
        total_waste: 0,
        records: Vec::with_capacity(env.config().horizon),
    };

    loop {
        let order = policy.select_order(&observation);
        let forecast = observation.forecast;
        let result = env.step(i64::from(order))?;
        let info = result.info;

        summary.steps += 1;
        summary.total_reward += result.reward;
        summary.total_cost += info.cost;
        summary.total_shortage += u64::from(info.shortage);
        summary.total_waste += u64::from(info.waste);
        summary.records.push(StepRecord {
            episode,
            day: info.day,
            order: info.order,
            arrivals: info.arrivals,
            demand: info.demand,
            forecast,
            served: info.served,
            shortage: info.shortage,
            waste: info.waste,
            on_hand: info.on_hand,
            in_transit: result.observation.in_transit() as u32,
            cost: info.cost,
            reward: result.reward,
        });

        if summary.steps % 30 == 0 {
            info!(
                day = summary.steps,
                order,
                reward = result.reward,
                cost = info.cost,
                shortage = info.shortage,
                waste = info.waste,
                "episode progress"
            );
            debug!(state = %env, "episode snapshot");
        }

        if result.done {
            break;
        }
        observation = result.observation;
    }

    info!(
        policy = %summary.policy,
        steps = summary.steps,
        total_reward = summary.total_reward,
        avg_daily_cost = summary.average_daily_cost(),
        total_shortage = summary.total_shortage,
        total_waste = summary.total_waste,
        "episode summary"
    );
    Ok(summary)
}
