// src/model/observation.rs

use crate::model::{OBSERVATION_DIM, PIPELINE_SLOTS, SHELF_LIFE_DAYS};
use serde::{Deserialize, Serialize};

/// Everything a policy gets to see about the environment.
///
/// Flattened in the order ledger (7), pipeline (6), forecast (1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub inventory: [f64; SHELF_LIFE_DAYS],
    pub pipeline: [f64; PIPELINE_SLOTS],
    pub forecast: f64,
}

impl Observation {
    pub fn from_units(
        inventory: [u32; SHELF_LIFE_DAYS],
        pipeline: [u32; PIPELINE_SLOTS],
        forecast: f64,
    ) -> Self {
        Self {
            inventory: inventory.map(f64::from),
            pipeline: pipeline.map(f64::from),
            forecast,
        }
    }

    pub fn to_vector(&self) -> [f64; OBSERVATION_DIM] {
        let mut out = [0.0; OBSERVATION_DIM];
        out[..SHELF_LIFE_DAYS].copy_from_slice(&self.inventory);
        out[SHELF_LIFE_DAYS..SHELF_LIFE_DAYS + PIPELINE_SLOTS].copy_from_slice(&self.pipeline);
        out[OBSERVATION_DIM - 1] = self.forecast;
        out
    }

    pub fn on_hand(&self) -> f64 {
        self.inventory.iter().sum()
    }

    pub fn in_transit(&self) -> f64 {
        self.pipeline.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_layout_is_inventory_pipeline_forecast() {
        let obs = Observation::from_units([1, 2, 3, 4, 5, 6, 7], [8, 9, 10, 11, 12, 13], 15.5);
        let v = obs.to_vector();
        assert_eq!(v.len(), 14);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[6], 7.0);
        assert_eq!(v[7], 8.0);
        assert_eq!(v[12], 13.0);
        assert_eq!(v[13], 15.5);
        assert_eq!(obs.on_hand(), 28.0);
        assert_eq!(obs.in_transit(), 63.0);
    }
}
