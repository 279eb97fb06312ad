//! Optimizers for training neural networks

mod adam;
mod optimizer;
mod sgd;

pub use adam::Adam;
pub use optimizer::Optimizer;
pub use sgd::SGD;

use crate::Tensor;

/// Scale all gradients so their global L2 norm is at most `max_norm`
///
/// Returns the global norm measured before clipping.
pub fn clip_grad_norm(params: &mut [&mut Tensor], max_norm: f32) -> f32 {
    let total_norm = params
        .iter()
        .map(|p| p.grad_norm_sq())
        .sum::<f32>()
        .sqrt();

    if total_norm > max_norm && total_norm > 0.0 {
        let factor = max_norm / total_norm;
        for param in params.iter() {
            if let Some(grad) = param.grad() {
                param.set_grad(grad * factor);
            }
        }
    }

    total_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clip_grad_norm_scales_down() {
        let mut a = Tensor::from_vec(vec![0.0, 0.0], true);
        let mut b = Tensor::from_vec(vec![0.0], true);
        a.set_grad(ndarray::arr1(&[3.0, 0.0]));
        b.set_grad(ndarray::arr1(&[4.0]));

        let norm = clip_grad_norm(&mut [&mut a, &mut b], 1.0);

        assert_abs_diff_eq!(norm, 5.0);
        assert_abs_diff_eq!(a.grad().unwrap()[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(b.grad().unwrap()[0], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_leaves_small_gradients() {
        let mut a = Tensor::from_vec(vec![0.0], true);
        a.set_grad(ndarray::arr1(&[0.5]));

        let norm = clip_grad_norm(&mut [&mut a], 1.0);

        assert_abs_diff_eq!(norm, 0.5);
        assert_abs_diff_eq!(a.grad().unwrap()[0], 0.5);
    }

    #[test]
    fn test_clip_ignores_missing_gradients() {
        let mut a = Tensor::from_vec(vec![1.0], true);
        assert_eq!(clip_grad_norm(&mut [&mut a], 1.0), 0.0);
        assert!(!a.has_grad());
    }
}
