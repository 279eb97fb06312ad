//! # Zerograd: gradient zeroing on a tape-based autograd engine
//!
//! Trains a small convolutional network on CIFAR-10 with the classic loop:
//! reset gradients, forward, loss, backward, optimizer step. Gradients are
//! summed into existing buffers on every backward pass, so forgetting the reset
//! makes each step use the sum of all earlier gradients.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation, convolution and pooling
//! - **nn**: `Conv2d`, `MaxPool2d`, `Linear` and the CIFAR-10 `Net`
//! - **optim**: Optimizers (SGD with momentum, Adam) and gradient clipping
//! - **data**: CIFAR-10 reader and downloader, synthetic images, `DataLoader`
//! - **train**: Loss functions, `Trainer`, evaluation
//! - **io**: Checkpoint saving and loading (JSON, YAML formats)
//! - **config**: Declarative YAML configuration and CLI

pub mod autograd;
pub mod config;
pub mod data;
pub mod io;
pub mod nn;
pub mod optim;
pub mod progress;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
