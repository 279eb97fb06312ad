//! Single-command training from YAML configuration

use super::schema::{DataConfig, DatasetKind, OptimSpec, TrainSpec};
use super::validate::validate_config;
use crate::data::{Cifar10, DataLoader, Dataset, ImageDims, LoaderConfig, SyntheticImages};
use crate::error::{Error, Result};
use crate::io::{Checkpoint, CheckpointFormat, CheckpointMetadata};
use crate::nn::{Module, Net, NetConfig};
use crate::optim::{Adam, Optimizer, SGD};
use crate::train::{evaluate, CrossEntropyLoss, EvalReport, TrainConfig, TrainResult, Trainer};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Knobs that come from the command line rather than the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Measure accuracy on the test split after training
    pub evaluate: bool,
    /// Suppress the running-loss lines
    pub quiet: bool,
}

/// Everything a training run produced
#[derive(Debug)]
pub struct RunReport {
    pub result: TrainResult,
    pub eval: Option<EvalReport>,
    pub num_parameters: usize,
}

/// Load training spec from YAML file (without running training)
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<TrainSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec: TrainSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    Ok(spec)
}

/// Train from a YAML configuration file with default run options
///
/// # Example
///
/// ```no_run
/// use zerograd::config::train_from_yaml;
///
/// let report = train_from_yaml("configs/cifar10.yaml")?;
/// println!("final loss: {:.3}", report.result.final_loss);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn train_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<RunReport> {
    let spec = load_config(config_path)?;
    run_training(&spec, RunOptions::default())
}

/// Build the optimizer named in the spec
pub fn build_optimizer(spec: &OptimSpec) -> Result<Box<dyn Optimizer>> {
    match spec.name.as_str() {
        "sgd" => Ok(Box::new(SGD::new(spec.lr, spec.momentum))),
        "adam" => Ok(Box::new(Adam::default_params(spec.lr))),
        other => Err(Error::ConfigError(format!("Unknown optimizer: {other}"))),
    }
}

/// Open the configured dataset split
///
/// The images must fit the network's input layer.
pub fn build_dataset(
    data: &DataConfig,
    train: bool,
    net: &NetConfig,
    seed: u64,
) -> Result<Arc<dyn Dataset>> {
    let dataset: Arc<dyn Dataset> = match data.dataset {
        DatasetKind::Cifar10 => Arc::new(Cifar10::new(&data.root, train, data.download)?),
        DatasetKind::Synthetic => {
            let dims = ImageDims {
                channels: net.in_channels,
                height: net.image_size,
                width: net.image_size,
            };
            let (samples, seed) = if train {
                (data.synthetic_samples, seed)
            } else {
                ((data.synthetic_samples / 4).max(1), seed.wrapping_add(1))
            };
            Arc::new(SyntheticImages::new(samples, dims, net.num_classes, seed)?)
        }
    };

    let dims = dataset.image_dims();
    if dims.channels != net.in_channels
        || dims.height != net.image_size
        || dims.width != net.image_size
    {
        return Err(Error::ConfigError(format!(
            "dataset images are {}x{}x{}, model expects {}x{}x{}",
            dims.channels,
            dims.height,
            dims.width,
            net.in_channels,
            net.image_size,
            net.image_size
        )));
    }
    if dataset.num_classes() != net.num_classes {
        return Err(Error::ConfigError(format!(
            "dataset has {} classes, model predicts {}",
            dataset.num_classes(),
            net.num_classes
        )));
    }

    Ok(dataset)
}

fn build_loader(
    dataset: Arc<dyn Dataset>,
    data: &DataConfig,
    shuffle: bool,
    seed: u64,
) -> Result<DataLoader> {
    DataLoader::new(
        dataset,
        LoaderConfig {
            batch_size: data.batch_size,
            shuffle,
            num_workers: data.num_workers,
            drop_last: false,
            seed,
        },
    )
}

/// Run a full training session described by `spec`
///
/// Builds the dataset, loader, network and optimizer, trains, then optionally
/// evaluates on the test split and writes the weights to `training.output`.
pub fn run_training(spec: &TrainSpec, options: RunOptions) -> Result<RunReport> {
    let net_config = spec.net_config();
    let seed = spec.training.seed;

    let trainset = build_dataset(&spec.data, spec.data.train, &net_config, seed)?;
    let loader = build_loader(trainset, &spec.data, spec.data.shuffle, seed)?;

    let model = Net::new(net_config.clone(), seed)?;
    let num_parameters = model.num_parameters();

    let mut config = TrainConfig {
        log_interval: spec.training.log_interval,
        max_grad_norm: spec.training.grad_clip,
        gradient_accumulation_steps: spec.training.gradient_accumulation_steps,
        zero_grad: spec.training.zero_grad,
        set_to_none: spec.training.set_to_none,
    };
    if options.quiet {
        config = config.without_logging();
    }

    let mut trainer = Trainer::new(
        model,
        build_optimizer(&spec.optimizer)?,
        Box::new(CrossEntropyLoss::new(net_config.num_classes)),
        config,
    );
    let result = trainer.train(&loader, spec.training.epochs);
    let model = trainer.into_model();

    if let Some(path) = &spec.training.output {
        let format = CheckpointFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "output path {} must end in .json or .yaml",
                path.display()
            ))
        })?;
        let metadata = CheckpointMetadata {
            epochs: Some(result.final_epoch),
            final_loss: Some(result.final_loss),
            ..CheckpointMetadata::default()
        };
        Checkpoint::from_module(&model, metadata).save(path, format)?;
    }

    let eval = if options.evaluate {
        let testset = build_dataset(&spec.data, false, &net_config, seed)?;
        let test_loader = build_loader(testset, &spec.data, false, seed)?;
        Some(evaluate(&model, &test_loader))
    } else {
        None
    };

    Ok(RunReport {
        result,
        eval,
        num_parameters,
    })
}
