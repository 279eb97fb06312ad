//! Trainer abstraction for training loops

use super::{Batch, LossFn, MetricsTracker, TrainConfig, ZeroGradMode};
use crate::autograd::backward;
use crate::data::DataLoader;
use crate::nn::Module;
use crate::optim::{clip_grad_norm, Optimizer};
use ndarray::arr1;
use std::time::Instant;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainResult {
    /// Epochs completed
    pub final_epoch: usize,
    /// Mean loss of the last epoch
    pub final_loss: f32,
    /// Lowest epoch mean loss
    pub best_loss: f32,
    /// Mean loss of every epoch, in order
    pub epoch_losses: Vec<f32>,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}

/// Mean loss over the mini-batches since the last log line
#[derive(Debug, Clone, PartialEq)]
pub struct RunningLoss {
    interval: usize,
    sum: f32,
    count: usize,
}

impl RunningLoss {
    /// `interval` of 0 is treated as 1
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            sum: 0.0,
            count: 0,
        }
    }

    /// Add one batch loss
    ///
    /// Every `interval`-th call returns the mean of the window and starts a
    /// new one.
    pub fn record(&mut self, loss: f32) -> Option<f32> {
        self.sum += loss;
        self.count += 1;
        if self.count < self.interval {
            return None;
        }
        let mean = self.sum / self.interval as f32;
        self.sum = 0.0;
        self.count = 0;
        Some(mean)
    }
}

/// `[epoch, batch] loss: mean` with one-based epoch and batch numbers
pub fn format_loss_line(epoch: usize, batch_index: usize, loss: f32) -> String {
    format!("[{}, {:5}] loss: {:.3}", epoch + 1, batch_index + 1, loss)
}

/// Runs the classic loop: reset gradients, forward, loss, backward, step
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use zerograd::data::{Cifar10, DataLoader, LoaderConfig};
/// use zerograd::nn::{Net, NetConfig};
/// use zerograd::optim::SGD;
/// use zerograd::train::{CrossEntropyLoss, TrainConfig, Trainer};
///
/// let trainset = Cifar10::new("./data", true, true).unwrap();
/// let loader = DataLoader::new(Arc::new(trainset), LoaderConfig::default()).unwrap();
/// let net = Net::new(NetConfig::default(), 0).unwrap();
///
/// let mut trainer = Trainer::new(
///     net,
///     Box::new(SGD::new(0.001, 0.9)),
///     Box::new(CrossEntropyLoss::new(10)),
///     TrainConfig::default(),
/// );
/// let result = trainer.train(&loader, 2);
/// println!("final loss: {:.3}", result.final_loss);
/// ```
pub struct Trainer<M: Module> {
    model: M,
    optimizer: Box<dyn Optimizer>,
    loss_fn: Box<dyn LossFn>,
    config: TrainConfig,
    pub metrics: MetricsTracker,
}

impl<M: Module> Trainer<M> {
    pub fn new(
        model: M,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn LossFn>,
        config: TrainConfig,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            config,
            metrics: MetricsTracker::new(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Get current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Set learning rate
    pub fn set_lr(&mut self, lr: f32) {
        self.optimizer.set_lr(lr);
    }

    /// Reset parameter gradients the way the config asks
    pub fn zero_grad(&mut self) {
        match self.config.zero_grad {
            ZeroGradMode::Optimizer => {
                let mut params = self.model.parameters_mut();
                self.optimizer
                    .zero_grad_with(&mut params, self.config.set_to_none);
            }
            ZeroGradMode::Model => {
                if self.config.set_to_none {
                    self.model.zero_grad();
                } else {
                    for param in self.model.parameters() {
                        param.fill_grad_zero();
                    }
                }
            }
            ZeroGradMode::Never => {}
        }
    }

    /// Forward, loss and backward; gradients are summed into the parameters
    ///
    /// The loss gradient is seeded with `scale`, so a window of `n`
    /// accumulated batches seeded with `1/n` yields their mean gradient.
    fn accumulate_gradients(&mut self, batch: &Batch, scale: f32) -> f32 {
        let predictions = self.model.forward(&batch.inputs, batch.size);
        let mut loss = self.loss_fn.forward(&predictions, &batch.targets);
        let loss_val = loss.data()[0];

        backward(&mut loss, Some(arr1(&[scale])));

        loss_val
    }

    /// Clip, then let the optimizer consume the accumulated gradients
    fn apply_update(&mut self) {
        let mut params = self.model.parameters_mut();
        if let Some(max_norm) = self.config.max_grad_norm {
            clip_grad_norm(&mut params, max_norm);
        }
        self.optimizer.step(&mut params);
        self.metrics.increment_step();
    }

    /// Perform a single training step
    ///
    /// Resets gradients, runs forward and backward on `batch`, then updates the
    /// parameters. Returns the batch loss.
    pub fn train_step(&mut self, batch: &Batch) -> f32 {
        self.zero_grad();
        let loss = self.accumulate_gradients(batch, 1.0);
        self.apply_update();
        loss
    }

    /// Train for one epoch
    ///
    /// `epoch` is zero-based and only selects the shuffle order and the label
    /// of the log lines. Returns the mean batch loss.
    pub fn train_epoch(&mut self, loader: &DataLoader, epoch: usize) -> f32 {
        let window = self.config.gradient_accumulation_steps.max(1);
        let num_batches = loader.len();

        let mut total_loss = 0.0;
        let mut seen = 0;
        let mut running = self.config.log_every().map(RunningLoss::new);
        let mut scale = 1.0;

        for (i, batch) in loader.iter_epoch(epoch).enumerate() {
            if i % window == 0 {
                self.zero_grad();
                // a trailing window may hold fewer batches
                scale = 1.0 / window.min(num_batches.saturating_sub(i)).max(1) as f32;
            }

            let loss = self.accumulate_gradients(&batch, scale);

            if (i + 1) % window == 0 || i + 1 == num_batches {
                self.apply_update();
            }

            total_loss += loss;
            seen += 1;

            if let Some(mean) = running.as_mut().and_then(|r| r.record(loss)) {
                println!("{}", format_loss_line(epoch, i, mean));
                self.metrics.running_losses.push(mean);
            }
        }

        let avg_loss = if seen > 0 {
            total_loss / seen as f32
        } else {
            0.0
        };

        self.metrics.record_epoch(avg_loss, self.lr());

        avg_loss
    }

    /// Train for `epochs` full passes over `loader`
    pub fn train(&mut self, loader: &DataLoader, epochs: usize) -> TrainResult {
        let start = Instant::now();
        let mut epoch_losses = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            epoch_losses.push(self.train_epoch(loader, epoch));
        }

        if self.config.log_every().is_some() {
            println!("Finished Training");
        }

        TrainResult {
            final_epoch: epoch_losses.len(),
            final_loss: epoch_losses.last().copied().unwrap_or(0.0),
            best_loss: self.metrics.best_loss().unwrap_or(0.0),
            epoch_losses,
            elapsed_secs: start.elapsed().as_secs_f64(),
        }
    }
}
