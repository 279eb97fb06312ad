//! Tensor type with gradient tracking

use super::BackwardOp;
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared gradient slot of a tensor
pub type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Flat `f32` tensor with automatic differentiation support
///
/// Shapes are carried by the operations that consume the tensor, not by the
/// tensor itself. Clones share the gradient slot, so a backward pass that runs
/// through a clone accumulates into the original leaf.
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a new tensor with data
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::ones(size), requires_grad)
    }

    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Get gradient (if computed)
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Whether a gradient buffer currently exists
    pub fn has_grad(&self) -> bool {
        self.grad.borrow().is_some()
    }

    /// Set gradient, replacing any accumulated value
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Sum `grad` into the existing buffer, allocating it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing += &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    /// Deliver a gradient from the op that consumed this tensor
    ///
    /// Leaves sum it into their buffer. Tensors produced by an op hold only the
    /// gradient of the current pass, so a repeated backward over the same graph
    /// does not count earlier passes twice on the way down.
    pub fn receive_grad(&self, grad: Array1<f32>) {
        if self.is_leaf() {
            self.accumulate_grad(grad);
        } else {
            self.set_grad(grad);
        }
    }

    /// True when no op produced this tensor
    pub fn is_leaf(&self) -> bool {
        self.backward_op.is_none()
    }

    /// Drop the gradient buffer
    ///
    /// The next backward pass starts from an empty slot, so the result is the
    /// gradient of that pass alone.
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Overwrite the gradient buffer with zeros, keeping its allocation
    ///
    /// Tensors that never received a gradient are left untouched.
    pub fn fill_grad_zero(&self) {
        if let Some(existing) = self.grad.borrow_mut().as_mut() {
            existing.fill(0.0);
        }
    }

    /// Squared L2 norm of the gradient (0 when absent)
    pub fn grad_norm_sq(&self) -> f32 {
        self.grad
            .borrow()
            .as_ref()
            .map(|g| g.iter().map(|x| x * x).sum())
            .unwrap_or(0.0)
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Get reference to gradient cell (for backward operations)
    pub fn grad_cell(&self) -> GradCell {
        self.grad.clone()
    }

    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Copy of the values cut off from the graph
    pub fn detach(&self) -> Tensor {
        Tensor::new(self.data.clone(), false)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.data.len())
            .field("grad", &self.grad.borrow().is_some())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
