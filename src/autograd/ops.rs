//! Autograd operations with backward passes

use super::{BackwardOp, GradCell, Tensor};
use ndarray::{Array1, ArrayView2};
use std::rc::Rc;

/// Run the recorded op of `input`, if any
pub(crate) fn propagate(input: &Tensor) {
    if let Some(op) = input.backward_op() {
        op.backward();
    }
}

/// View a flat buffer as a row-major `rows × cols` matrix
pub(crate) fn as_matrix(data: &Array1<f32>, rows: usize, cols: usize) -> ArrayView2<'_, f32> {
    let slice = data
        .as_slice()
        .expect("tensor buffers are always contiguous");
    ArrayView2::from_shape((rows, cols), slice).expect("matrix dims must match buffer length")
}

/// Add two tensors element-wise
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(a.len(), b.len(), "add: operands must have same length");
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(a.data() + b.data(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.receive_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.receive_grad(grad.clone());
            }
        } else {
            return;
        }
        propagate(&self.a);
        propagate(&self.b);
    }
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(a.len(), b.len(), "mul: operands must have same length");
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(a.data() * b.data(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(MulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for MulBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            // ∂L/∂a = ∂L/∂out * b, ∂L/∂b = ∂L/∂out * a
            if self.a.requires_grad() {
                self.a.receive_grad(grad * self.b.data());
            }
            if self.b.requires_grad() {
                self.b.receive_grad(grad * self.a.data());
            }
        } else {
            return;
        }
        propagate(&self.a);
        propagate(&self.b);
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let mut result = Tensor::new(a.data() * factor, a.requires_grad());

    if a.requires_grad() {
        result.set_backward_op(Rc::new(ScaleBackward {
            a: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            self.a.receive_grad(grad * self.factor);
        } else {
            return;
        }
        propagate(&self.a);
    }
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let mut result = Tensor::new(a.data().mapv(|x| x.max(0.0)), a.requires_grad());

    if a.requires_grad() {
        result.set_backward_op(Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            // ∂L/∂a = ∂L/∂out * (a > 0)
            let mask = self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
            self.a.receive_grad(grad * &mask);
        } else {
            return;
        }
        propagate(&self.a);
    }
}

/// Sum all elements into a one-element tensor
pub fn sum(a: &Tensor) -> Tensor {
    let mut result = Tensor::from_vec(vec![a.data().sum()], a.requires_grad());

    if a.requires_grad() {
        result.set_backward_op(Rc::new(SumBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct SumBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            self.a.receive_grad(Array1::from_elem(self.a.len(), grad[0]));
        } else {
            return;
        }
        propagate(&self.a);
    }
}

/// Matrix multiplication
///
/// Computes C = A @ B where:
/// - A is m×k (flattened to length m*k)
/// - B is k×n (flattened to length k*n)
/// - C is m×n (flattened to length m*n)
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    assert_eq!(a.len(), m * k, "Matrix A size mismatch");
    assert_eq!(b.len(), k * n, "Matrix B size mismatch");

    let c = as_matrix(a.data(), m, k).dot(&as_matrix(b.data(), k, n));
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(c.into_iter().collect(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: GradCell,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let grad_c = as_matrix(grad_output, self.m, self.n);

            // ∂L/∂A = ∂L/∂C @ Bᵀ
            if self.a.requires_grad() {
                let b = as_matrix(self.b.data(), self.k, self.n);
                self.a
                    .receive_grad(grad_c.dot(&b.t()).into_iter().collect());
            }

            // ∂L/∂B = Aᵀ @ ∂L/∂C
            if self.b.requires_grad() {
                let a = as_matrix(self.a.data(), self.m, self.k);
                self.b
                    .receive_grad(a.t().dot(&grad_c).into_iter().collect());
            }
        } else {
            return;
        }
        propagate(&self.a);
        propagate(&self.b);
    }
}

/// Add a bias vector to every row of a `rows × cols` matrix
pub fn add_row_bias(x: &Tensor, bias: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "add_row_bias: input size mismatch");
    assert_eq!(bias.len(), cols, "add_row_bias: bias length must equal cols");
    assert!(cols > 0, "add_row_bias: cols must be positive");

    let mut data = x.data().to_vec();
    for row in data.chunks_exact_mut(cols) {
        for (value, b) in row.iter_mut().zip(bias.data().iter()) {
            *value += b;
        }
    }

    let requires_grad = x.requires_grad() || bias.requires_grad();
    let mut result = Tensor::from_vec(data, requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(RowBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct RowBiasBackward {
    x: Tensor,
    bias: Tensor,
    rows: usize,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for RowBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.receive_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                let grad_bias = as_matrix(grad, self.rows, self.cols).sum_axis(ndarray::Axis(0));
                self.bias.receive_grad(grad_bias);
            }
        } else {
            return;
        }
        propagate(&self.x);
        propagate(&self.bias);
    }
}
