//! YAML schema definitions for declarative training configuration

use crate::nn::NetConfig;
use crate::train::ZeroGradMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete training specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSpec {
    /// Data configuration
    pub data: DataConfig,

    /// Optimizer configuration
    pub optimizer: OptimSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,

    /// Network architecture (defaults to the CIFAR-10 net)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<NetConfig>,
}

impl TrainSpec {
    pub fn net_config(&self) -> NetConfig {
        self.model.clone().unwrap_or_default()
    }
}

/// Which dataset to train on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    #[default]
    Cifar10,
    /// Generated images, no download needed
    Synthetic,
}

/// Data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub dataset: DatasetKind,

    /// Directory holding (or receiving) the dataset files
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Use the training split
    #[serde(default = "default_true")]
    pub train: bool,

    /// Fetch the dataset when it is missing
    #[serde(default = "default_true")]
    pub download: bool,

    /// Batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_true")]
    pub shuffle: bool,

    /// Decoding threads
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Number of generated samples for the synthetic dataset
    #[serde(default = "default_synthetic_samples")]
    pub synthetic_samples: usize,
}

/// Optimizer specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Optimizer name: "sgd" | "adam"
    #[serde(default = "default_optimizer")]
    pub name: String,

    /// Learning rate
    pub lr: f32,

    /// SGD momentum
    #[serde(default)]
    pub momentum: f32,
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Print the running loss every N mini-batches (null = silent)
    #[serde(default = "default_log_interval")]
    pub log_interval: Option<usize>,

    /// How gradients are reset before each backward pass
    #[serde(default)]
    pub zero_grad: ZeroGradMode,

    /// Drop gradient buffers instead of zero-filling them
    #[serde(default = "default_true")]
    pub set_to_none: bool,

    /// Gradient accumulation steps
    #[serde(default = "default_accumulation")]
    pub gradient_accumulation_steps: usize,

    /// Gradient clipping threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_clip: Option<f32>,

    /// Seed for weight init and shuffling
    #[serde(default)]
    pub seed: u64,

    /// Where to write the trained weights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            log_interval: default_log_interval(),
            zero_grad: ZeroGradMode::default(),
            set_to_none: true,
            gradient_accumulation_steps: default_accumulation(),
            grad_clip: None,
            seed: 0,
            output: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_batch_size() -> usize {
    4
}

fn default_num_workers() -> usize {
    2
}

fn default_synthetic_samples() -> usize {
    512
}

fn default_optimizer() -> String {
    "sgd".to_string()
}

fn default_epochs() -> usize {
    2
}

fn default_log_interval() -> Option<usize> {
    Some(2000)
}

fn default_accumulation() -> usize {
    1
}
