//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! data:
//!   dataset: cifar10
//!   root: ./data
//!   batch_size: 4
//!   shuffle: true
//!   num_workers: 2
//!
//! optimizer:
//!   name: sgd
//!   lr: 0.001
//!   momentum: 0.9
//!
//! training:
//!   epochs: 2
//!   log_interval: 2000
//!   zero_grad: optimizer
//! ```

mod cli;
mod schema;
mod train;
mod validate;

#[cfg(test)]
mod tests;

pub use cli::{
    apply_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat, TrainArgs, ValidateArgs,
};
pub use schema::{DataConfig, DatasetKind, OptimSpec, TrainSpec, TrainingParams};
pub use train::{
    build_dataset, build_optimizer, load_config, run_training, train_from_yaml, RunOptions,
    RunReport,
};
pub use validate::{validate_config, ValidationError};
