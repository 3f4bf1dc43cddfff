// src/model/mod.rs
//
// Contract constants shared by the environment, the policies and the
// prediction schema. Changing any of them breaks saved models and clients.

pub mod ledger;
pub mod observation;
pub mod queues;

/// Number of shelf-life age buckets in the inventory ledger.
pub const SHELF_LIFE_DAYS: usize = 7;
/// Number of lead-time slots in the order pipeline.
pub const PIPELINE_SLOTS: usize = 6;
/// Flattened observation length: ledger + pipeline + forecast.
pub const OBSERVATION_DIM: usize = SHELF_LIFE_DAYS + PIPELINE_SLOTS + 1;
/// Largest order quantity a single action may place.
pub const MAX_ORDER: u32 = 50;
/// Size of the discrete action space, `0..=MAX_ORDER`.
pub const ACTION_COUNT: usize = MAX_ORDER as usize + 1;
/// Ceiling on configured starting stock and on expected daily demand.
pub const MAX_CONFIGURED_UNITS: u32 = 1_000_000;
