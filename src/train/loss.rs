//! Loss functions for training

use crate::autograd::{propagate, BackwardOp, GradCell};
use crate::Tensor;
use ndarray::Array1;
use std::rc::Rc;

/// Trait for loss functions
pub trait LossFn {
    /// Compute loss given predictions and targets
    ///
    /// Returns a scalar loss tensor whose backward pass flows into the graph
    /// that produced `predictions`
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Backward of a scalar loss with a precomputed local gradient
struct LossBackward {
    predictions: Tensor,
    local_grad: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for LossBackward {
    fn backward(&self) {
        let upstream = match self.result_grad.borrow().as_ref() {
            Some(grad) => grad[0],
            None => return,
        };
        if self.predictions.requires_grad() {
            self.predictions.receive_grad(&self.local_grad * upstream);
        }
        propagate(&self.predictions);
    }
}

fn scalar_loss(value: f32, predictions: &Tensor, local_grad: Array1<f32>) -> Tensor {
    let mut loss = Tensor::from_vec(vec![value], predictions.requires_grad());
    if predictions.requires_grad() {
        loss.set_backward_op(Rc::new(LossBackward {
            predictions: predictions.clone(),
            local_grad,
            result_grad: loss.grad_cell(),
        }));
    }
    loss
}

/// Mean Squared Error Loss
///
/// L = mean((predictions - targets)²)
///
/// # Example
///
/// ```
/// use zerograd::train::{MSELoss, LossFn};
/// use zerograd::Tensor;
///
/// let loss_fn = MSELoss;
/// let pred = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
/// let target = Tensor::from_vec(vec![1.5, 2.5, 3.5], false);
///
/// let loss = loss_fn.forward(&pred, &target);
/// assert!(loss.data()[0] > 0.0);
/// ```
pub struct MSELoss;

impl LossFn for MSELoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );

        let diff = predictions.data() - targets.data();
        let mse = (&diff * &diff).mean().unwrap_or(0.0);

        // d(MSE)/d(pred) = 2 * (pred - target) / n
        let n = predictions.len() as f32;
        scalar_loss(mse, predictions, diff * (2.0 / n))
    }

    fn name(&self) -> &str {
        "MSE"
    }
}

/// Cross Entropy Loss over a batch of logit rows
///
/// L = mean over rows of -sum(targets * log(softmax(logits)))
///
/// `predictions` and `targets` hold `batch × num_classes` values, row-major,
/// with one-hot target rows.
///
/// # Example
///
/// ```
/// use zerograd::train::{CrossEntropyLoss, LossFn};
/// use zerograd::Tensor;
///
/// let loss_fn = CrossEntropyLoss::new(3);
/// let logits = Tensor::from_vec(vec![2.0, 1.0, 0.5], true);
/// let targets = Tensor::from_vec(vec![1.0, 0.0, 0.0], false); // one-hot
///
/// let loss = loss_fn.forward(&logits, &targets);
/// assert!(loss.data()[0] > 0.0);
/// ```
pub struct CrossEntropyLoss {
    num_classes: usize,
}

impl CrossEntropyLoss {
    pub fn new(num_classes: usize) -> Self {
        assert!(num_classes > 0, "CrossEntropyLoss needs at least one class");
        Self { num_classes }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Compute softmax: exp(x_i) / sum(exp(x_j))
    fn softmax(x: &[f32]) -> Vec<f32> {
        let max = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_x: Vec<f32> = x.iter().map(|v| (v - max).exp()).collect();
        let sum: f32 = exp_x.iter().sum();
        exp_x.into_iter().map(|e| e / sum).collect()
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );
        assert_eq!(
            predictions.len() % self.num_classes,
            0,
            "Predictions must hold whole rows of num_classes logits"
        );

        let batch = predictions.len() / self.num_classes;
        let logits = predictions.data().to_vec();
        let target = targets.data().to_vec();

        let mut total = 0.0;
        let mut grad = Vec::with_capacity(logits.len());
        for (row, t) in logits
            .chunks_exact(self.num_classes)
            .zip(target.chunks_exact(self.num_classes))
        {
            let probs = Self::softmax(row);
            total += t
                .iter()
                .zip(&probs)
                .map(|(&t, &p)| -t * (p + 1e-10).ln())
                .sum::<f32>();
            // d(CE)/d(logits) = (probs - targets) / batch
            grad.extend(probs.iter().zip(t).map(|(p, t)| (p - t) / batch as f32));
        }

        scalar_loss(total / batch as f32, predictions, Array1::from(grad))
    }

    fn name(&self) -> &str {
        "CrossEntropy"
    }
}
