//! Backward operation trait

/// A recorded operation that can push its output gradient to its inputs
pub trait BackwardOp {
    /// Accumulate into the inputs' gradients and recurse into their ops
    fn backward(&self);
}
