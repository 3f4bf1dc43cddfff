pub mod dqn;
pub mod implementations;
pub mod network;
pub mod optimization;
pub mod traits;
