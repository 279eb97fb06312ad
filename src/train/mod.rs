//! High-level training loop
//!
//! This module provides:
//! - Loss functions (MSE, Cross-Entropy)
//! - The `Trainer`, which resets gradients before every backward pass
//! - Training configuration and metrics tracking
//! - Accuracy evaluation
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use zerograd::data::{DataLoader, ImageDims, LoaderConfig, SyntheticImages};
//! use zerograd::nn::{Net, NetConfig};
//! use zerograd::optim::SGD;
//! use zerograd::train::{CrossEntropyLoss, TrainConfig, Trainer};
//!
//! let dims = ImageDims { channels: 3, height: 32, width: 32 };
//! let data = SyntheticImages::new(8, dims, 10, 0).unwrap();
//! let loader = DataLoader::new(Arc::new(data), LoaderConfig::default()).unwrap();
//!
//! let mut trainer = Trainer::new(
//!     Net::new(NetConfig::default(), 0).unwrap(),
//!     Box::new(SGD::new(0.001, 0.9)),
//!     Box::new(CrossEntropyLoss::new(10)),
//!     TrainConfig::default().without_logging(),
//! );
//! let loss = trainer.train_epoch(&loader, 0);
//! assert!(loss.is_finite());
//! ```

mod batch;
mod config;
mod eval;
mod loss;
mod trainer;


pub use batch::Batch;
pub use config::{MetricsTracker, TrainConfig, ZeroGradMode};
pub use eval::{evaluate, EvalReport};
pub use loss::{CrossEntropyLoss, LossFn, MSELoss};
pub use trainer::{format_loss_line, RunningLoss, TrainResult, Trainer};
