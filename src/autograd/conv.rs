//! Spatial operations on NCHW feature maps: 2D convolution and max pooling
//!
//! Tensors stay flat; the geometry structs carry the batch, channel and spatial
//! dimensions that the buffers are laid out with.

use super::ops::{as_matrix, propagate};
use super::{BackwardOp, GradCell, Tensor};
use ndarray::{Array1, Array2, Axis};
use std::rc::Rc;

/// Dimensions of a stride-1, unpadded convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dGeometry {
    pub batch: usize,
    pub in_channels: usize,
    pub height: usize,
    pub width: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
}

impl Conv2dGeometry {
    pub fn out_height(&self) -> usize {
        self.height + 1 - self.kernel_size
    }

    pub fn out_width(&self) -> usize {
        self.width + 1 - self.kernel_size
    }

    pub fn input_len(&self) -> usize {
        self.batch * self.in_channels * self.height * self.width
    }

    /// Weight layout is `[out_channels][in_channels][k][k]`
    pub fn weight_len(&self) -> usize {
        self.out_channels * self.patch_len()
    }

    pub fn output_len(&self) -> usize {
        self.batch * self.out_channels * self.out_height() * self.out_width()
    }

    fn patch_len(&self) -> usize {
        self.in_channels * self.kernel_size * self.kernel_size
    }

    fn positions(&self) -> usize {
        self.out_height() * self.out_width()
    }

    fn sample_len(&self) -> usize {
        self.in_channels * self.height * self.width
    }
}

/// Unfold one sample into a `patch_len × positions` matrix
fn im2col(sample: &[f32], geo: &Conv2dGeometry) -> Array2<f32> {
    let k = geo.kernel_size;
    let (oh, ow) = (geo.out_height(), geo.out_width());
    let mut cols = Array2::zeros((geo.patch_len(), geo.positions()));

    for c in 0..geo.in_channels {
        let plane = &sample[c * geo.height * geo.width..(c + 1) * geo.height * geo.width];
        for ki in 0..k {
            for kj in 0..k {
                let row = (c * k + ki) * k + kj;
                for oy in 0..oh {
                    let src = (oy + ki) * geo.width + kj;
                    for ox in 0..ow {
                        cols[[row, oy * ow + ox]] = plane[src + ox];
                    }
                }
            }
        }
    }

    cols
}

/// Fold a `patch_len × positions` gradient back onto one sample's input
fn col2im(cols: &Array2<f32>, geo: &Conv2dGeometry, out: &mut [f32]) {
    let k = geo.kernel_size;
    let (oh, ow) = (geo.out_height(), geo.out_width());

    for c in 0..geo.in_channels {
        let plane = &mut out[c * geo.height * geo.width..(c + 1) * geo.height * geo.width];
        for ki in 0..k {
            for kj in 0..k {
                let row = (c * k + ki) * k + kj;
                for oy in 0..oh {
                    let dst = (oy + ki) * geo.width + kj;
                    for ox in 0..ow {
                        plane[dst + ox] += cols[[row, oy * ow + ox]];
                    }
                }
            }
        }
    }
}

/// 2D convolution (cross-correlation), stride 1, no padding
///
/// `input` is `[batch][in_channels][height][width]`, `weight` is
/// `[out_channels][in_channels][k][k]` and `bias` has one entry per output
/// channel. The result is `[batch][out_channels][height-k+1][width-k+1]`.
pub fn conv2d(input: &Tensor, weight: &Tensor, bias: &Tensor, geo: Conv2dGeometry) -> Tensor {
    assert!(
        geo.kernel_size > 0 && geo.kernel_size <= geo.height && geo.kernel_size <= geo.width,
        "conv2d: kernel {} does not fit a {}x{} input",
        geo.kernel_size,
        geo.height,
        geo.width
    );
    assert_eq!(input.len(), geo.input_len(), "conv2d: input size mismatch");
    assert_eq!(weight.len(), geo.weight_len(), "conv2d: weight size mismatch");
    assert_eq!(bias.len(), geo.out_channels, "conv2d: bias size mismatch");

    let w = as_matrix(weight.data(), geo.out_channels, geo.patch_len());
    let input_slice = input
        .data()
        .as_slice()
        .expect("tensor buffers are always contiguous");

    let mut columns = Vec::with_capacity(geo.batch);
    let mut out = Vec::with_capacity(geo.output_len());
    for sample in input_slice.chunks_exact(geo.sample_len().max(1)).take(geo.batch) {
        let cols = im2col(sample, &geo);
        let mut y = w.dot(&cols);
        for (mut channel, &b) in y.axis_iter_mut(Axis(0)).zip(bias.data().iter()) {
            channel += b;
        }
        out.extend(y.iter().copied());
        columns.push(cols);
    }

    let requires_grad = input.requires_grad() || weight.requires_grad() || bias.requires_grad();
    let mut result = Tensor::from_vec(out, requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(Conv2dBackward {
            input: input.clone(),
            weight: weight.clone(),
            bias: bias.clone(),
            columns,
            geo,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct Conv2dBackward {
    input: Tensor,
    weight: Tensor,
    bias: Tensor,
    columns: Vec<Array2<f32>>,
    geo: Conv2dGeometry,
    result_grad: GradCell,
}

impl BackwardOp for Conv2dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let geo = &self.geo;
            let out_sample = geo.out_channels * geo.positions();
            let w = as_matrix(self.weight.data(), geo.out_channels, geo.patch_len());

            let mut grad_w = Array2::<f32>::zeros((geo.out_channels, geo.patch_len()));
            let mut grad_b = Array1::<f32>::zeros(geo.out_channels);
            let mut grad_in = vec![0.0; geo.input_len()];

            for (s, cols) in self.columns.iter().enumerate() {
                let g = &grad_output.as_slice().expect("contiguous gradient")
                    [s * out_sample..(s + 1) * out_sample];
                let g = ndarray::ArrayView2::from_shape((geo.out_channels, geo.positions()), g)
                    .expect("gradient matches conv output");

                // ∂L/∂W += G · colsᵀ, ∂L/∂b += Σ_positions G
                grad_w += &g.dot(&cols.t());
                grad_b += &g.sum_axis(Axis(1));

                // ∂L/∂x = col2im(Wᵀ · G)
                if self.input.requires_grad() {
                    let grad_cols = w.t().dot(&g);
                    let len = geo.sample_len();
                    col2im(&grad_cols, geo, &mut grad_in[s * len..(s + 1) * len]);
                }
            }

            if self.weight.requires_grad() {
                self.weight.receive_grad(grad_w.into_iter().collect());
            }
            if self.bias.requires_grad() {
                self.bias.receive_grad(grad_b);
            }
            if self.input.requires_grad() {
                self.input.receive_grad(Array1::from(grad_in));
            }
        } else {
            return;
        }
        propagate(&self.input);
        propagate(&self.weight);
        propagate(&self.bias);
    }
}

/// Dimensions of a non-overlapping max pool (window = stride)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool2dGeometry {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel_size: usize,
}

impl Pool2dGeometry {
    /// Trailing rows that do not fill a window are dropped
    pub fn out_height(&self) -> usize {
        self.height / self.kernel_size
    }

    pub fn out_width(&self) -> usize {
        self.width / self.kernel_size
    }

    pub fn input_len(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    pub fn output_len(&self) -> usize {
        self.batch * self.channels * self.out_height() * self.out_width()
    }
}

/// Max pooling over `k × k` windows with stride `k`
///
/// The gradient of each window flows only to its maximum; ties go to the
/// first element in row-major order.
pub fn max_pool2d(input: &Tensor, geo: Pool2dGeometry) -> Tensor {
    assert!(geo.kernel_size > 0, "max_pool2d: kernel must be positive");
    assert_eq!(input.len(), geo.input_len(), "max_pool2d: input size mismatch");

    let k = geo.kernel_size;
    let (oh, ow) = (geo.out_height(), geo.out_width());
    let data = input.data();

    let mut out = Vec::with_capacity(geo.output_len());
    let mut argmax = Vec::with_capacity(geo.output_len());

    for plane in 0..geo.batch * geo.channels {
        let base = plane * geo.height * geo.width;
        for oy in 0..oh {
            for ox in 0..ow {
                let mut best_idx = base + (oy * k) * geo.width + ox * k;
                let mut best = data[best_idx];
                for ki in 0..k {
                    for kj in 0..k {
                        let idx = base + (oy * k + ki) * geo.width + ox * k + kj;
                        if data[idx] > best {
                            best = data[idx];
                            best_idx = idx;
                        }
                    }
                }
                out.push(best);
                argmax.push(best_idx);
            }
        }
    }

    let mut result = Tensor::from_vec(out, input.requires_grad());

    if input.requires_grad() {
        result.set_backward_op(Rc::new(MaxPoolBackward {
            input: input.clone(),
            argmax,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct MaxPoolBackward {
    input: Tensor,
    argmax: Vec<usize>,
    result_grad: GradCell,
}

impl BackwardOp for MaxPoolBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let mut grad_in = Array1::<f32>::zeros(self.input.len());
            for (&idx, &g) in self.argmax.iter().zip(grad_output.iter()) {
                grad_in[idx] += g;
            }
            self.input.receive_grad(grad_in);
        } else {
            return;
        }
        propagate(&self.input);
    }
}
