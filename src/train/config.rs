//! Training configuration and metrics

use serde::{Deserialize, Serialize};

/// Where the per-step gradient reset happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroGradMode {
    /// `optimizer.zero_grad()` over the model's parameters
    #[default]
    Optimizer,
    /// `model.zero_grad()`
    Model,
    /// Never reset; gradients keep accumulating across steps
    Never,
}

/// Training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    /// Print the running loss every N mini-batches (None or 0 = silent)
    pub log_interval: Option<usize>,

    /// Maximum gradient norm for clipping (None = no clipping)
    pub max_grad_norm: Option<f32>,

    /// Gradient accumulation steps (1 = no accumulation)
    ///
    /// Gradients are reset only at the start of each window of this many
    /// mini-batches, and the optimizer steps once per window. Each batch loss
    /// is scaled by 1/len of its window, so a short trailing window still
    /// steps with its own mean gradient.
    /// Effective batch size = batch_size * gradient_accumulation_steps
    pub gradient_accumulation_steps: usize,

    /// How gradients are reset before each backward pass
    pub zero_grad: ZeroGradMode,

    /// Drop gradient buffers instead of filling them with zeros
    pub set_to_none: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            log_interval: Some(2000),
            max_grad_norm: None,
            gradient_accumulation_steps: 1,
            zero_grad: ZeroGradMode::Optimizer,
            set_to_none: true,
        }
    }
}

impl TrainConfig {
    /// Create a new training configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging interval, if logging is on
    pub fn log_every(&self) -> Option<usize> {
        self.log_interval.filter(|&n| n > 0)
    }

    /// Set gradient clipping norm
    pub fn with_grad_clip(mut self, max_norm: f32) -> Self {
        self.max_grad_norm = Some(max_norm);
        self
    }

    /// Disable gradient clipping
    pub fn without_grad_clip(mut self) -> Self {
        self.max_grad_norm = None;
        self
    }

    /// Set logging interval
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = Some(interval.max(1));
        self
    }

    /// Disable the running-loss lines
    pub fn without_logging(mut self) -> Self {
        self.log_interval = None;
        self
    }

    /// Set gradient accumulation steps
    pub fn with_gradient_accumulation(mut self, steps: usize) -> Self {
        self.gradient_accumulation_steps = steps.max(1);
        self
    }

    pub fn with_zero_grad(mut self, mode: ZeroGradMode) -> Self {
        self.zero_grad = mode;
        self
    }

    pub fn with_set_to_none(mut self, set_to_none: bool) -> Self {
        self.set_to_none = set_to_none;
        self
    }
}

/// Tracks training metrics across epochs
#[derive(Clone, Debug, Default)]
pub struct MetricsTracker {
    /// Training loss history (one mean per epoch)
    pub losses: Vec<f32>,

    /// Learning rates (one per epoch)
    pub learning_rates: Vec<f32>,

    /// Optimizer steps taken
    pub steps: usize,

    /// Every running-loss value that was logged, in order
    pub running_losses: Vec<f32>,

    /// Completed epochs
    pub epoch: usize,
}

impl MetricsTracker {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an epoch's training metrics
    pub fn record_epoch(&mut self, loss: f32, lr: f32) {
        self.losses.push(loss);
        self.learning_rates.push(lr);
        self.epoch += 1;
    }

    /// Increment step counter
    pub fn increment_step(&mut self) {
        self.steps += 1;
    }

    /// Get average loss over last N epochs
    pub fn avg_loss(&self, n: usize) -> f32 {
        if self.losses.is_empty() || n == 0 {
            return 0.0;
        }

        let start = self.losses.len().saturating_sub(n);
        let window = &self.losses[start..];
        window.iter().sum::<f32>() / window.len() as f32
    }

    /// Get best (minimum) loss
    pub fn best_loss(&self) -> Option<f32> {
        self.losses.iter().copied().reduce(f32::min)
    }

    /// Whether the latest epoch beat every one of the `patience` epochs before it
    pub fn is_improving(&self, patience: usize) -> bool {
        let Some((&last, earlier)) = self.losses.split_last() else {
            return true;
        };
        let start = earlier.len().saturating_sub(patience);
        earlier[start..].iter().all(|&l| last < l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_config_default() {
        let config = TrainConfig::default();
        assert_eq!(config.log_interval, Some(2000));
        assert_eq!(config.max_grad_norm, None);
        assert_eq!(config.gradient_accumulation_steps, 1);
        assert_eq!(config.zero_grad, ZeroGradMode::Optimizer);
        assert!(config.set_to_none);
    }

    #[test]
    fn test_train_config_builder() {
        let config = TrainConfig::new()
            .with_grad_clip(0.5)
            .with_log_interval(20)
            .with_zero_grad(ZeroGradMode::Model)
            .with_set_to_none(false)
            .without_grad_clip();

        assert_eq!(config.max_grad_norm, None);
        assert_eq!(config.log_interval, Some(20));
        assert_eq!(config.zero_grad, ZeroGradMode::Model);
        assert!(!config.set_to_none);
        assert_eq!(TrainConfig::new().without_logging().log_interval, None);
    }

    #[test]
    fn test_gradient_accumulation_min_value() {
        let config = TrainConfig::new().with_gradient_accumulation(0);
        assert_eq!(config.gradient_accumulation_steps, 1);
    }

    #[test]
    fn test_zero_grad_mode_serde_names() {
        let mode: ZeroGradMode = serde_yaml::from_str("never").unwrap();
        assert_eq!(mode, ZeroGradMode::Never);
        assert_eq!(
            serde_yaml::to_string(&ZeroGradMode::Optimizer).unwrap().trim(),
            "optimizer"
        );
    }

    #[test]
    fn test_metrics_tracker() {
        let mut tracker = MetricsTracker::new();

        tracker.record_epoch(1.0, 0.001);
        tracker.record_epoch(0.8, 0.001);
        tracker.record_epoch(0.6, 0.001);

        assert_eq!(tracker.epoch, 3);
        assert_eq!(tracker.losses.len(), 3);
        assert_eq!(tracker.best_loss(), Some(0.6));
        assert!((tracker.avg_loss(2) - 0.7).abs() < 1e-5);
        assert!(tracker.is_improving(2));
    }

    #[test]
    fn test_metrics_not_improving() {
        let mut tracker = MetricsTracker::new();
        tracker.record_epoch(0.5, 0.001);
        tracker.record_epoch(0.6, 0.001);
        assert!(!tracker.is_improving(1));
        assert_eq!(MetricsTracker::new().best_loss(), None);
    }
}
