// src/io/model_store.rs

use crate::error::ModelStoreError;
use crate::model::{ACTION_COUNT, OBSERVATION_DIM};
use crate::strategy::dqn::DqnPolicy;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Bumped whenever the artifact layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// On-disk form of a trained policy: one JSON document per model.
#[derive(Debug, Serialize, Deserialize)]
struct PolicyArtifact {
    format_version: u32,
    observation_dim: usize,
    action_count: usize,
    policy: DqnPolicy,
}

/// Writes `policy` to `path`, creating parent directories as needed.
pub fn save_policy(path: &Path, policy: &DqnPolicy) -> Result<(), ModelStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let artifact = PolicyArtifact {
        format_version: FORMAT_VERSION,
        observation_dim: OBSERVATION_DIM,
        action_count: ACTION_COUNT,
        policy: policy.clone(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &artifact)?;
    writer.flush()?;

    info!(path = %path.display(), "policy saved");
    Ok(())
}

/// Reads a policy previously written by `save_policy`.
///
/// The artifact must match the current format version and the fixed
/// observation/action dimensions.
pub fn load_policy(path: &Path) -> Result<DqnPolicy, ModelStoreError> {
    let artifact: PolicyArtifact = {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)?
    };

    if artifact.format_version != FORMAT_VERSION {
        return Err(ModelStoreError::Incompatible(format!(
            "format version {} (expected {FORMAT_VERSION})",
            artifact.format_version
        )));
    }
    if artifact.observation_dim != OBSERVATION_DIM || artifact.action_count != ACTION_COUNT {
        return Err(ModelStoreError::Incompatible(format!(
            "model expects {} inputs and {} actions (expected {OBSERVATION_DIM} and {ACTION_COUNT})",
            artifact.observation_dim, artifact.action_count
        )));
    }

    let network = artifact.policy.network();
    network
        .check_shapes()
        .map_err(ModelStoreError::Incompatible)?;
    if network.input_dim() != OBSERVATION_DIM || network.output_dim() != ACTION_COUNT {
        return Err(ModelStoreError::Incompatible(format!(
            "network maps {} inputs to {} outputs",
            network.input_dim(),
            network.output_dim()
        )));
    }

    info!(path = %path.display(), "policy loaded");
    Ok(artifact.policy)
}
