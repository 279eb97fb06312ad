//! Image datasets and mini-batch loading
//!
//! - **cifar**: the CIFAR-10 binary batches, with optional download
//! - **synthetic**: a deterministic, learnable stand-in for offline runs
//! - **loader**: shuffling, batching and parallel decoding

mod cifar;
mod download;
mod loader;
mod synthetic;
mod transform;

pub use cifar::{Cifar10, CIFAR10_CLASSES, CIFAR10_URL};
pub use download::download_and_extract;
pub use loader::{DataLoader, LoaderConfig};
pub use synthetic::SyntheticImages;
pub use transform::Normalize;

/// Channel/height/width of the images a dataset yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDims {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageDims {
    pub fn features(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// One decoded example: a CHW float image and its class index
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: Vec<f32>,
    pub label: usize,
}

/// Random-access collection of labelled images
///
/// Datasets are shared with decoding workers, so they must be `Send + Sync`.
/// `get` panics on an out-of-range index, like slice indexing.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Sample;

    fn num_classes(&self) -> usize;

    fn image_dims(&self) -> ImageDims;
}
