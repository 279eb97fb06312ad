//! Tape-based autograd engine
//!
//! Every operation returns a tensor carrying a [`BackwardOp`] that knows how to
//! push the output gradient back into its inputs. Gradients are summed into the
//! existing buffers of leaf tensors, so they keep growing across backward passes
//! until [`Tensor::zero_grad`] is called.

mod backward;
mod conv;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use conv::{conv2d, max_pool2d, Conv2dGeometry, Pool2dGeometry};
pub use ops::*;
pub use tensor::{GradCell, Tensor};

/// Perform backward pass on a tensor
///
/// Seeds the tensor's gradient with `grad_output` (ones when `None`) and runs
/// the recorded operations down to the leaves.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
