//! CIFAR-10 binary format
//!
//! Each batch file is a sequence of 3073-byte records: one label byte followed
//! by a 32x32 RGB image stored channel-major (1024 red, 1024 green, 1024 blue).

use super::download::download_and_extract;
use super::{Dataset, ImageDims, Normalize, Sample};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";

pub const CIFAR10_CLASSES: [&str; 10] = [
    "plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck",
];

const BATCH_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

const DIMS: ImageDims = ImageDims {
    channels: 3,
    height: 32,
    width: 32,
};
const RECORD_LEN: usize = 1 + 3 * 32 * 32;

/// The CIFAR-10 training or test split, held in memory as raw bytes
pub struct Cifar10 {
    pixels: Vec<u8>,
    labels: Vec<u8>,
    normalize: Normalize,
}

impl Cifar10 {
    /// Load the split from `root`, downloading the archive first if asked to
    /// and the batch files are missing
    pub fn new(root: impl AsRef<Path>, train: bool, download: bool) -> Result<Self> {
        Self::with_transform(root, train, download, Normalize::symmetric(DIMS.channels))
    }

    pub fn with_transform(
        root: impl AsRef<Path>,
        train: bool,
        download: bool,
        normalize: Normalize,
    ) -> Result<Self> {
        let root = root.as_ref();
        let files = Self::split_files(root, train);

        if !files.iter().all(|f| f.exists()) {
            if !download {
                return Err(Error::Dataset(format!(
                    "CIFAR-10 not found under {} (enable download to fetch it)",
                    root.display()
                )));
            }
            println!("Downloading {CIFAR10_URL} to {}", root.display());
            download_and_extract(CIFAR10_URL, root, true)?;
        }

        Self::from_files(&files, normalize)
    }

    /// Batch files that make up a split
    pub fn split_files(root: &Path, train: bool) -> Vec<PathBuf> {
        let dir = root.join(BATCH_DIR);
        if train {
            TRAIN_FILES.iter().map(|f| dir.join(f)).collect()
        } else {
            vec![dir.join(TEST_FILE)]
        }
    }

    /// Load and concatenate explicit batch files
    pub fn from_files(files: &[PathBuf], normalize: Normalize) -> Result<Self> {
        if normalize.channels() != DIMS.channels {
            return Err(Error::InvalidParameter(format!(
                "CIFAR-10 images have {} channels, normalization has {}",
                DIMS.channels,
                normalize.channels()
            )));
        }

        let mut pixels = Vec::new();
        let mut labels = Vec::new();
        for path in files {
            let bytes = fs::read(path).map_err(|e| {
                Error::Dataset(format!("failed to read {}: {e}", path.display()))
            })?;
            parse_records(&bytes, &mut pixels, &mut labels)
                .map_err(|e| Error::Dataset(format!("{}: {e}", path.display())))?;
        }

        Ok(Self {
            pixels,
            labels,
            normalize,
        })
    }
}

/// Append the records of one batch file
fn parse_records(
    bytes: &[u8],
    pixels: &mut Vec<u8>,
    labels: &mut Vec<u8>,
) -> std::result::Result<(), String> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(format!(
            "truncated batch: {} bytes is not a multiple of the {RECORD_LEN}-byte record",
            bytes.len()
        ));
    }

    pixels.reserve(bytes.len() / RECORD_LEN * (RECORD_LEN - 1));
    for (i, record) in bytes.chunks_exact(RECORD_LEN).enumerate() {
        let label = record[0];
        if label as usize >= CIFAR10_CLASSES.len() {
            return Err(format!("record {i} has invalid label {label}"));
        }
        labels.push(label);
        pixels.extend_from_slice(&record[1..]);
    }
    Ok(())
}

impl Dataset for Cifar10 {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn get(&self, index: usize) -> Sample {
        let features = DIMS.features();
        let raw = &self.pixels[index * features..(index + 1) * features];
        Sample {
            image: self.normalize.apply(raw, DIMS),
            label: self.labels[index] as usize,
        }
    }

    fn num_classes(&self) -> usize {
        CIFAR10_CLASSES.len()
    }

    fn image_dims(&self) -> ImageDims {
        DIMS
    }
}
