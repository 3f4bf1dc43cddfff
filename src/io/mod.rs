pub mod demand;
pub mod model_store;
pub mod reporting;
