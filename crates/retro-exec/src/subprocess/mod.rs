//! Trainer backed by an external training command.
//!
//! The command receives the dataset coordinates in its environment and reports a JSON [`retro_core::TrainerOutput`] on stdout.
mod config;
pub use config::{LogConfig, TrainCommand};

mod trainer;
pub use trainer::SubprocessTrainer;
