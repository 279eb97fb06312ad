//! Shuffled mini-batch loading
//!
//! Samples are decoded either on the calling thread or on a dedicated rayon
//! pool. Collation into tensors always happens on the calling thread, so batch
//! order and content do not depend on the worker count.

use super::{Dataset, Sample};
use crate::train::Batch;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Batching options
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Decoding threads; 0 decodes on the calling thread
    pub num_workers: usize,
    /// Drop the trailing partial batch
    pub drop_last: bool,
    pub seed: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            shuffle: true,
            num_workers: 2,
            drop_last: false,
            seed: 0,
        }
    }
}

pub struct DataLoader {
    dataset: Arc<dyn Dataset>,
    config: LoaderConfig,
    pool: Option<ThreadPool>,
}

impl DataLoader {
    pub fn new(dataset: Arc<dyn Dataset>, config: LoaderConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::InvalidParameter(
                "batch_size must be > 0".to_string(),
            ));
        }

        let pool = if config.num_workers > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.num_workers)
                .thread_name(|i| format!("zerograd-loader-{i}"))
                .build()
                .map_err(|e| Error::Dataset(format!("failed to start loader workers: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            dataset,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &dyn Dataset {
        self.dataset.as_ref()
    }

    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    /// Batches per epoch
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        let b = self.config.batch_size;
        if self.config.drop_last {
            n / b
        } else {
            n.div_ceil(b)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample order for an epoch
    ///
    /// With shuffling on, each epoch gets its own permutation derived from the
    /// loader seed, so runs are reproducible.
    pub fn epoch_order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            let seed = self
                .config
                .seed
                .wrapping_add((epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        order
    }

    pub fn iter_epoch(&self, epoch: usize) -> EpochIter<'_> {
        EpochIter {
            loader: self,
            order: self.epoch_order(epoch),
            position: 0,
            remaining: self.len(),
        }
    }

    fn load_batch(&self, indices: &[usize]) -> Batch {
        let dataset = self.dataset.as_ref();
        let samples: Vec<Sample> = match &self.pool {
            Some(pool) => pool.install(|| indices.par_iter().map(|&i| dataset.get(i)).collect()),
            None => indices.iter().map(|&i| dataset.get(i)).collect(),
        };
        Batch::from_samples(samples, dataset.num_classes())
    }
}

/// Batches of one epoch, in order
pub struct EpochIter<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    position: usize,
    remaining: usize,
}

impl Iterator for EpochIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.remaining == 0 {
            return None;
        }
        let end = (self.position + self.loader.config.batch_size).min(self.order.len());
        let batch = self.loader.load_batch(&self.order[self.position..end]);
        self.position = end;
        self.remaining -= 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EpochIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ImageDims, SyntheticImages};
    use proptest::prelude::*;

    /// Image `i` is filled with the value `i`
    struct Indexed(usize);

    impl Dataset for Indexed {
        fn len(&self) -> usize {
            self.0
        }

        fn get(&self, index: usize) -> Sample {
            assert!(index < self.0);
            Sample {
                image: vec![index as f32; 2],
                label: index % 3,
            }
        }

        fn num_classes(&self) -> usize {
            3
        }

        fn image_dims(&self) -> ImageDims {
            ImageDims {
                channels: 1,
                height: 1,
                width: 2,
            }
        }
    }

    fn loader(
        n: usize,
        batch_size: usize,
        shuffle: bool,
        workers: usize,
        drop_last: bool,
    ) -> DataLoader {
        DataLoader::new(
            Arc::new(Indexed(n)),
            LoaderConfig {
                batch_size,
                shuffle,
                num_workers: workers,
                drop_last,
                seed: 42,
            },
        )
        .unwrap()
    }

    fn first_pixels(batch: &Batch) -> Vec<usize> {
        batch.inputs.data().iter().step_by(2).map(|v| *v as usize).collect()
    }

    #[test]
    fn test_sequential_batches_with_partial_tail() {
        let dl = loader(10, 4, false, 0, false);
        assert_eq!(dl.len(), 3);

        let batches: Vec<Batch> = dl.iter_epoch(0).collect();
        let sizes: Vec<usize> = batches.iter().map(|b| b.size).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(first_pixels(&batches[2]), vec![8, 9]);
        assert_eq!(batches[0].labels, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_drop_last() {
        let dl = loader(10, 4, false, 0, true);
        assert_eq!(dl.len(), 2);
        assert_eq!(dl.iter_epoch(0).count(), 2);
    }

    #[test]
    fn test_shuffle_differs_between_epochs() {
        let dl = loader(50, 5, true, 0, false);
        assert_ne!(dl.epoch_order(0), dl.epoch_order(1));
        assert_eq!(dl.epoch_order(3), dl.epoch_order(3));
    }

    #[test]
    fn test_worker_count_does_not_change_batches() {
        let serial = loader(23, 4, true, 0, false);
        let parallel = loader(23, 4, true, 3, false);

        for (a, b) in serial.iter_epoch(1).zip(parallel.iter_epoch(1)) {
            assert_eq!(a.inputs.data(), b.inputs.data());
            assert_eq!(a.labels, b.labels);
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = DataLoader::new(
            Arc::new(Indexed(4)),
            LoaderConfig {
                batch_size: 0,
                ..LoaderConfig::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_synthetic_dataset_batches() {
        let dims = ImageDims {
            channels: 3,
            height: 8,
            width: 8,
        };
        let ds = SyntheticImages::new(9, dims, 3, 1).unwrap();
        let dl = DataLoader::new(Arc::new(ds), LoaderConfig::default()).unwrap();

        let batch = dl.iter_epoch(0).next().unwrap();
        assert_eq!(batch.size, 4);
        assert_eq!(batch.inputs.len(), 4 * dims.features());
        assert_eq!(batch.targets.len(), 4 * 3);
    }

    proptest! {
        #[test]
        fn prop_epoch_visits_every_sample_once(
            n in 1usize..60,
            batch_size in 1usize..9,
            epoch in 0usize..5,
        ) {
            let dl = loader(n, batch_size, true, 0, false);
            let mut seen: Vec<usize> = dl
                .iter_epoch(epoch)
                .flat_map(|b| first_pixels(&b))
                .collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }
}
