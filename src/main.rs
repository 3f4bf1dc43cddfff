use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hospital_inventory_rl::io::{model_store, reporting};
use hospital_inventory_rl::logging;
use hospital_inventory_rl::InferenceError;
use hospital_inventory_rl::service::{InferenceService, PredictionRequest};
use hospital_inventory_rl::simulation::config::{EnvConfig, TrainingConfig};
use hospital_inventory_rl::simulation::engine::HospitalEnv;
use hospital_inventory_rl::simulation::runner::run_episode;
use hospital_inventory_rl::strategy::dqn::DqnTrainer;
use hospital_inventory_rl::strategy::implementations::{
    BaseStockPolicy, ConstantPolicy, ForecastCoverPolicy,
};
use hospital_inventory_rl::strategy::traits::OrderPolicy;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_MODEL_PATH: &str = "models/dqn_inventory.json";
/// Exit status for malformed requests; every other failure exits with 1.
const CLIENT_ERROR_EXIT: u8 = 2;

#[derive(Parser)]
#[command(author, version, about = "Hospital inventory management with reinforcement learning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a DQN policy and save it as a model artifact
    Train {
        /// Where to write the trained model
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model_path: PathBuf,

        /// Total environment steps (overrides TIMESTEPS)
        #[arg(long)]
        timesteps: Option<usize>,

        /// Optimizer learning rate (overrides LEARNING_RATE)
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Replay buffer capacity (overrides BUFFER_SIZE)
        #[arg(long)]
        buffer_size: Option<usize>,

        /// Minibatch size (overrides BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Seed for network initialization and exploration
        #[arg(long, default_value = "0")]
        seed: u64,

        /// JSON file with environment settings
        #[arg(long)]
        env_config: Option<PathBuf>,
    },
    /// Run full episodes with a policy and export a per-step CSV log
    Evaluate {
        #[arg(long, value_enum, default_value = "dqn")]
        policy: PolicyKind,

        /// Model artifact, used by the dqn policy
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model_path: PathBuf,

        /// Order-up-to position for base-stock (default: newsvendor target)
        #[arg(long)]
        target: Option<u32>,

        /// Daily order for the constant policy
        #[arg(long, default_value = "20")]
        order: u32,

        #[arg(long, default_value = "1")]
        episodes: usize,

        #[arg(long, default_value = "simulation_results.csv")]
        output: PathBuf,

        /// JSON file with environment settings
        #[arg(long)]
        env_config: Option<PathBuf>,
    },
    /// Answer prediction requests read as JSON (a file, or `-` for stdin)
    Predict {
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model_path: PathBuf,

        #[arg(long, default_value = "-")]
        input: String,

        /// Treat the input as an array of requests
        #[arg(long)]
        batch: bool,
    },
    /// Report whether a model can be loaded
    Health {
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model_path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    Dqn,
    BaseStock,
    ForecastCover,
    Constant,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let client_error = err
                .downcast_ref::<InferenceError>()
                .is_some_and(InferenceError::is_client_error);
            error!(client_error, "{err:#}");
            eprintln!("Error: {err:#}");
            if client_error {
                ExitCode::from(CLIENT_ERROR_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train {
            model_path,
            timesteps,
            learning_rate,
            buffer_size,
            batch_size,
            seed,
            env_config,
        } => {
            // 1. SETUP CONFIGURATION
            let mut config = TrainingConfig::from_env()?;
            if let Some(v) = timesteps {
                config.timesteps = v;
            }
            if let Some(v) = learning_rate {
                config.learning_rate = v;
            }
            if let Some(v) = buffer_size {
                config.buffer_size = v;
            }
            if let Some(v) = batch_size {
                config.batch_size = v;
            }
            config.seed = seed;

            // 2. TRAIN
            let env = HospitalEnv::new(load_env_config(env_config.as_deref())?)?;
            let (policy, report) = DqnTrainer::new(env, config)?.train()?;

            // 3. SAVE
            model_store::save_policy(&model_path, &policy)
                .with_context(|| format!("saving model to {}", model_path.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Evaluate {
            policy,
            model_path,
            target,
            order,
            episodes,
            output,
            env_config,
        } => {
            let env_config = load_env_config(env_config.as_deref())?;
            let policy = build_policy(policy, &model_path, target, order, &env_config)?;
            let mut env = HospitalEnv::new(env_config)?;
            let base_seed = env.config().seed;

            let mut records = Vec::new();
            for episode in 0..episodes {
                env.reset_with_seed(base_seed.wrapping_add(episode as u64));
                let summary = run_episode(&mut env, policy.as_ref(), episode)?;
                println!(
                    "episode {episode}: policy={} steps={} reward={:.2} avg_daily_cost={:.2} shortage={} waste={}",
                    summary.policy,
                    summary.steps,
                    summary.total_reward,
                    summary.average_daily_cost(),
                    summary.total_shortage,
                    summary.total_waste
                );
                records.extend(summary.records);
            }

            reporting::write_episode_log(&output, &records)
                .map_err(|e| anyhow::anyhow!("writing {}: {e}", output.display()))?;
        }
        Commands::Predict {
            model_path,
            input,
            batch,
        } => {
            let service = InferenceService::load(&model_path)?;
            let raw = read_input(&input)?;
            let rendered = if batch {
                let requests = PredictionRequest::batch_from_json(&raw)?;
                serde_json::to_string_pretty(&service.batch_predict(&requests)?)?
            } else {
                let request = PredictionRequest::from_json(&raw)?;
                serde_json::to_string_pretty(&service.predict(&request)?)?
            };
            println!("{rendered}");
        }
        Commands::Health { model_path } => {
            let service = InferenceService::load_or_unloaded(&model_path);
            let health = service.health();
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.model_loaded {
                bail!("model not loaded from {}", model_path.display());
            }
        }
    }

    Ok(())
}

fn load_env_config(path: Option<&Path>) -> Result<EnvConfig> {
    let Some(path) = path else {
        return Ok(EnvConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let config: EnvConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), "environment config loaded");
    Ok(config)
}

fn build_policy(
    kind: PolicyKind,
    model_path: &Path,
    target: Option<u32>,
    order: u32,
    env_config: &EnvConfig,
) -> Result<Box<dyn OrderPolicy>> {
    Ok(match kind {
        PolicyKind::Dqn => Box::new(
            model_store::load_policy(model_path)
                .with_context(|| format!("loading model from {}", model_path.display()))?,
        ),
        PolicyKind::BaseStock => match target {
            Some(t) => Box::new(BaseStockPolicy::new(t)),
            None => {
                let (mean, std_dev) = env_config.demand.moments();
                Box::new(BaseStockPolicy::with_optimal_target(env_config, mean, std_dev))
            }
        },
        PolicyKind::ForecastCover => Box::new(ForecastCoverPolicy::new()),
        PolicyKind::Constant => Box::new(ConstantPolicy::new(order)),
    })
}

fn read_input(input: &str) -> Result<String> {
    let mut raw = String::new();
    if input == "-" {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        File::open(input)
            .with_context(|| format!("opening {input}"))?
            .read_to_string(&mut raw)?;
    }
    Ok(raw)
}
