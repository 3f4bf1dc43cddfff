// src/strategy/dqn.rs

//! Value-based control: a deep Q-network trained with experience replay.
//!
//! The trainer drives a `HospitalEnv` through `reset`/`step`, explores with a
//! linearly decaying epsilon-greedy schedule and regresses the online network
//! toward one-step TD targets from a periodically synchronized target network.

use crate::error::{ConfigError, EnvError};
use crate::model::observation::Observation;
use crate::model::{ACTION_COUNT, OBSERVATION_DIM};
use crate::simulation::config::TrainingConfig;
use crate::simulation::engine::HospitalEnv;
use crate::strategy::network::{clip_grad_norm, Adam, QNetwork};
use crate::strategy::traits::OrderPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Observations are divided by this before entering the network.
pub const OBSERVATION_SCALE: f64 = 100.0;
/// Rewards are multiplied by this when forming TD targets.
pub const REWARD_SCALE: f64 = 0.01;
const MAX_GRAD_NORM: f64 = 10.0;
const LOG_INTERVAL: usize = 1_000;

pub fn encode_observation(observation: &Observation) -> Vec<f64> {
    observation
        .to_vector()
        .iter()
        .map(|v| v / OBSERVATION_SCALE)
        .collect()
}

/// Index of the largest value; ties resolve to the smallest order.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

// =========================================================================
// Trained policy
// =========================================================================

/// Greedy policy over a trained Q-network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnPolicy {
    network: QNetwork,
}

impl DqnPolicy {
    pub fn new(network: QNetwork) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    pub fn q_values(&self, observation: &Observation) -> Vec<f64> {
        self.network.predict(&encode_observation(observation))
    }
}

impl OrderPolicy for DqnPolicy {
    fn name(&self) -> &str {
        "dqn"
    }

    fn select_order(&self, observation: &Observation) -> u32 {
        argmax(&self.q_values(observation)) as u32
    }
}

// =========================================================================
// Replay buffer
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

/// Fixed-capacity ring buffer; the oldest transition is overwritten first.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    items: Vec<Transition>,
    capacity: usize,
    next: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(65_536)),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.items.len() < self.capacity {
            self.items.push(transition);
        } else {
            self.items[self.next] = transition;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Uniform sample with replacement.
    pub fn sample<'a, R: Rng + ?Sized>(&'a self, batch: usize, rng: &mut R) -> Vec<&'a Transition> {
        (0..batch)
            .map(|_| &self.items[rng.gen_range(0..self.items.len())])
            .collect()
    }
}

/// Linear decay from `start` to `end` over the first `fraction` of training.
pub fn linear_schedule(start: f64, end: f64, fraction: f64, progress: f64) -> f64 {
    if fraction <= 0.0 || progress >= fraction {
        end
    } else {
        start + (end - start) * progress / fraction
    }
}

// =========================================================================
// Trainer
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub timesteps: usize,
    pub episodes: usize,
    pub mean_episode_reward: Option<f64>,
    pub gradient_updates: usize,
    pub last_loss: Option<f64>,
    pub final_epsilon: f64,
}

pub struct DqnTrainer {
    env: HospitalEnv,
    config: TrainingConfig,
    online: QNetwork,
    target: QNetwork,
    optimizer: Adam,
    buffer: ReplayBuffer,
    rng: StdRng,
}

impl DqnTrainer {
    pub fn new(env: HospitalEnv, config: TrainingConfig) -> Result<Self, ConfigError> {
        for (key, value) in [
            ("TIMESTEPS", config.timesteps),
            ("BUFFER_SIZE", config.buffer_size),
            ("BATCH_SIZE", config.batch_size),
            ("train_freq", config.train_freq),
            ("target_update_interval", config.target_update_interval),
            ("hidden_units", config.hidden_units),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                    expected: "positive integer",
                });
            }
        }
        if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "LEARNING_RATE",
                value: config.learning_rate.to_string(),
                expected: "positive float",
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let h = config.hidden_units;
        let online = QNetwork::new(&[OBSERVATION_DIM, h, h, ACTION_COUNT], &mut rng);
        let target = online.clone();
        let optimizer = Adam::new(&online, config.learning_rate);
        let buffer = ReplayBuffer::new(config.buffer_size);

        Ok(Self {
            env,
            config,
            online,
            target,
            optimizer,
            buffer,
            rng,
        })
    }

    /// Runs the configured number of environment steps.
    ///
    /// Each episode is reset with its own seed derived from the environment's
    /// base seed, so a full training run is reproducible.
    pub fn train(mut self) -> Result<(DqnPolicy, TrainingReport), EnvError> {
        let cfg = self.config.clone();
        let base_seed = self.env.config().seed;
        info!(
            timesteps = cfg.timesteps,
            learning_rate = cfg.learning_rate,
            buffer_size = cfg.buffer_size,
            batch_size = cfg.batch_size,
            "starting training"
        );

        let mut episode = 0u64;
        let mut observation = self.env.reset_with_seed(base_seed);
        let mut episode_reward = 0.0;
        let mut finished_rewards: Vec<f64> = Vec::new();
        let mut gradient_updates = 0;
        let mut last_loss = None;
        let mut epsilon = cfg.exploration_initial_eps;

        for step in 0..cfg.timesteps {
            let progress = step as f64 / cfg.timesteps as f64;
            epsilon = linear_schedule(
                cfg.exploration_initial_eps,
                cfg.exploration_final_eps,
                cfg.exploration_fraction,
                progress,
            );

            let state = encode_observation(&observation);
            let action = if self.rng.gen::<f64>() < epsilon {
                self.rng.gen_range(0..ACTION_COUNT)
            } else {
                argmax(&self.online.predict(&state))
            };

            let result = self.env.step(action as i64)?;
            episode_reward += result.reward;
            self.buffer.push(Transition {
                state,
                action,
                reward: result.reward,
                next_state: encode_observation(&result.observation),
                done: result.done,
            });

            observation = if result.done {
                finished_rewards.push(episode_reward);
                debug!(episode, reward = episode_reward, "episode finished");
                episode_reward = 0.0;
                episode += 1;
                self.env.reset_with_seed(base_seed.wrapping_add(episode))
            } else {
                result.observation
            };

            if step >= cfg.learning_starts
                && step % cfg.train_freq == 0
                && self.buffer.len() >= cfg.batch_size
            {
                last_loss = Some(self.train_batch());
                gradient_updates += 1;
            }

            if step % cfg.target_update_interval == 0 {
                self.target.copy_from(&self.online);
            }

            if (step + 1) % LOG_INTERVAL == 0 {
                info!(
                    step = step + 1,
                    epsilon,
                    episodes = finished_rewards.len(),
                    loss = last_loss.unwrap_or(f64::NAN),
                    "training progress"
                );
            }
        }

        let mean_episode_reward = if finished_rewards.is_empty() {
            None
        } else {
            Some(finished_rewards.iter().sum::<f64>() / finished_rewards.len() as f64)
        };
        let report = TrainingReport {
            timesteps: cfg.timesteps,
            episodes: finished_rewards.len(),
            mean_episode_reward,
            gradient_updates,
            last_loss,
            final_epsilon: epsilon,
        };
        info!(?report, "training completed");

        Ok((DqnPolicy::new(self.online), report))
    }

    /// One gradient step on a uniformly sampled minibatch. Returns the mean
    /// Huber loss.
    fn train_batch(&mut self) -> f64 {
        let batch_size = self.config.batch_size;
        let gamma = self.config.gamma;
        let batch: Vec<Transition> = self
            .buffer
            .sample(batch_size, &mut self.rng)
            .into_iter()
            .cloned()
            .collect();

        let mut grads = self.online.zero_grads();
        let mut loss = 0.0;

        for t in &batch {
            let next_q = self.target.predict(&t.next_state);
            let bootstrap = if t.done {
                0.0
            } else {
                next_q.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            };
            let td_target = t.reward * REWARD_SCALE + gamma * bootstrap;

            let q = self.online.predict(&t.state);
            let error = q[t.action] - td_target;

            // Huber loss: quadratic inside [-1, 1], linear outside.
            loss += if error.abs() <= 1.0 {
                0.5 * error * error
            } else {
                error.abs() - 0.5
            };

            let mut output_grad = vec![0.0; ACTION_COUNT];
            output_grad[t.action] = error.clamp(-1.0, 1.0) / batch_size as f64;
            self.online
                .accumulate_gradients(&t.state, &output_grad, &mut grads);
        }

        clip_grad_norm(&mut grads, MAX_GRAD_NORM);
        self.optimizer.step(&mut self.online, &grads);
        loss / batch_size as f64
    }
}
