//! Neural network building blocks
//!
//! - **layers**: `Conv2d`, `MaxPool2d` and `Linear` over flat NCHW buffers
//! - **net**: the small CIFAR-10 convolutional network

mod layers;
mod net;

pub use layers::{Conv2d, FeatureMap, Linear, MaxPool2d};
pub use net::{Net, NetConfig};

use crate::Tensor;

/// A trainable model that owns its parameters
pub trait Module {
    /// Forward pass over a batch of flattened inputs
    fn forward(&self, input: &Tensor, batch_size: usize) -> Tensor;

    /// Parameters paired with stable names, in optimizer order
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Mutable parameters, in the same order as [`Module::named_parameters`]
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Logical shape of each parameter, in the same order
    ///
    /// Tensors are flat, so the default reports only their lengths.
    fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        self.parameters().iter().map(|p| vec![p.len()]).collect()
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.named_parameters().into_iter().map(|(_, t)| t).collect()
    }

    /// Reset the gradient of every parameter
    ///
    /// Same effect as calling the optimizer's `zero_grad` over
    /// [`Module::parameters_mut`], which is how the optimizer-side reset works
    /// when the optimizer covers all of the model's parameters.
    fn zero_grad(&self) {
        for param in self.parameters() {
            param.zero_grad();
        }
    }

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

/// Index of the largest value in each row of `num_classes` logits
pub fn argmax_rows(logits: &[f32], num_classes: usize) -> Vec<usize> {
    logits
        .chunks_exact(num_classes)
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}
