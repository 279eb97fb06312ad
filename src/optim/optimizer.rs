//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// Parameters are passed in the same order on every call; optimizers keep
/// per-parameter state by position.
pub trait Optimizer {
    /// Apply one update from the gradients currently stored on `params`
    fn step(&mut self, params: &mut [&mut Tensor]);

    /// Reset all gradients by dropping their buffers
    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter() {
            param.zero_grad();
        }
    }

    /// Reset all gradients, either dropping the buffers (`set_to_none`) or
    /// overwriting them with zeros
    fn zero_grad_with(&mut self, params: &mut [&mut Tensor], set_to_none: bool) {
        if set_to_none {
            self.zero_grad(params);
        } else {
            for param in params.iter() {
                param.fill_grad_zero();
            }
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Short identifier used in logs
    fn name(&self) -> &str;
}
