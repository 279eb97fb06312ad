//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// SGD with optional momentum
///
/// With momentum μ the update is `v = μ·v + g; p -= lr·v`, where the velocity
/// starts as the first gradient seen.
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<Array1<f32>>>,
}

impl SGD {
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    fn ensure_velocities(&mut self, count: usize) {
        if self.velocities.len() != count {
            self.velocities = vec![None; count];
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Tensor]) {
        self.ensure_velocities(params.len());

        for (param, velocity) in params.iter_mut().zip(self.velocities.iter_mut()) {
            // Parameters that took no part in the backward pass are left alone
            let Some(grad) = param.grad() else {
                continue;
            };

            let update = if self.momentum > 0.0 {
                let v = match velocity.take() {
                    Some(v) => v * self.momentum + &grad,
                    None => grad,
                };
                let update = &v * self.lr;
                *velocity = Some(v);
                update
            } else {
                grad * self.lr
            };

            *param.data_mut() -= &update;
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "sgd"
    }
}
