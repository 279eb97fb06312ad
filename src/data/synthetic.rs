//! Deterministic synthetic images
//!
//! Each class owns a horizontal band of brighter pixels in one channel, so a
//! small convolutional model can separate the classes within a few epochs.
//! Used for offline runs and tests.

use super::{Dataset, ImageDims, Sample};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SyntheticImages {
    images: Vec<Vec<f32>>,
    labels: Vec<usize>,
    dims: ImageDims,
    num_classes: usize,
}

impl SyntheticImages {
    pub fn new(samples: usize, dims: ImageDims, num_classes: usize, seed: u64) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidParameter(
                "synthetic dataset needs at least one class".to_string(),
            ));
        }
        if dims.features() == 0 {
            return Err(Error::InvalidParameter(
                "synthetic images must have non-zero dimensions".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut images = Vec::with_capacity(samples);
        let mut labels = Vec::with_capacity(samples);

        for i in 0..samples {
            let label = i % num_classes;
            images.push(Self::render(label, num_classes, dims, &mut rng));
            labels.push(label);
        }

        Ok(Self {
            images,
            labels,
            dims,
            num_classes,
        })
    }

    fn render(label: usize, num_classes: usize, dims: ImageDims, rng: &mut StdRng) -> Vec<f32> {
        let band_channel = label % dims.channels;
        let band_rows = (dims.height / num_classes).max(1);
        let band_start = (label * dims.height / num_classes).min(dims.height - band_rows);
        let plane = dims.height * dims.width;

        let mut image = vec![0.0f32; dims.features()];
        for (i, px) in image.iter_mut().enumerate() {
            let c = i / plane;
            let row = (i % plane) / dims.width;
            let in_band =
                c == band_channel && row >= band_start && row < band_start + band_rows;
            let base = if in_band { 0.8 } else { -0.5 };
            *px = base + rng.gen_range(-0.2..0.2);
        }
        image
    }
}

impl Dataset for SyntheticImages {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn get(&self, index: usize) -> Sample {
        Sample {
            image: self.images[index].clone(),
            label: self.labels[index],
        }
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn image_dims(&self) -> ImageDims {
        self.dims
    }
}
