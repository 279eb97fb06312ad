//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// Adam optimizer (Adaptive Moment Estimation)
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
}

impl Adam {
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with β1=0.9, β2=0.999, ε=1e-8
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    fn ensure_moments(&mut self, count: usize) {
        if self.m.len() != count {
            self.m = vec![None; count];
            self.v = vec![None; count];
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Tensor]) {
        self.ensure_moments(params.len());
        self.t = self.t.saturating_add(1);

        let lr_t = self.lr * (1.0 - self.beta2.powi(self.t)).sqrt()
            / (1.0 - self.beta1.powi(self.t));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else {
                continue;
            };

            let m = match self.m[i].take() {
                Some(m) => m * self.beta1 + &(&grad * (1.0 - self.beta1)),
                None => &grad * (1.0 - self.beta1),
            };
            let v = match self.v[i].take() {
                Some(v) => v * self.beta2 + &(&grad * &grad * (1.0 - self.beta2)),
                None => &grad * &grad * (1.0 - self.beta2),
            };

            let update = &m / &v.mapv(|x| x.sqrt() + self.epsilon) * lr_t;
            *param.data_mut() -= &update;

            self.m[i] = Some(m);
            self.v[i] = Some(v);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "adam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_step_moves_by_lr() {
        // With bias correction the first step is lr * sign(g)
        let mut w = Tensor::from_vec(vec![1.0, -1.0], true);
        w.set_grad(ndarray::arr1(&[0.3, -2.0]));

        let mut opt = Adam::default_params(0.1);
        opt.step(&mut [&mut w]);

        assert_abs_diff_eq!(w.data()[0], 0.9, epsilon = 1e-4);
        assert_abs_diff_eq!(w.data()[1], -0.9, epsilon = 1e-4);
    }

    #[test]
    fn test_converges_on_quadratic() {
        let mut w = Tensor::from_vec(vec![3.0, -2.0], true);
        let mut opt = Adam::default_params(0.05);

        for _ in 0..500 {
            let grad = w.data().mapv(|x| 2.0 * x);
            w.set_grad(grad);
            opt.step(&mut [&mut w]);
        }

        assert!(w.data().iter().all(|x| x.abs() < 0.2));
    }
}
