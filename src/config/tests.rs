//! Integration tests for config module

use super::*;
use crate::io::load_checkpoint;
use crate::nn::{Net, NetConfig};
use crate::train::ZeroGradMode;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_yaml(yaml: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(yaml.as_bytes()).unwrap();
    temp_file
}

#[test]
fn test_end_to_end_config_loading() {
    let yaml = r#"
data:
  dataset: cifar10
  root: /tmp/cifar
  train: true
  download: false
  batch_size: 4
  shuffle: true
  num_workers: 2

optimizer:
  name: sgd
  lr: 0.001
  momentum: 0.9

training:
  epochs: 2
  log_interval: 2000
  zero_grad: model
  set_to_none: false
  gradient_accumulation_steps: 2
  grad_clip: 5.0
  seed: 3
"#;

    let temp_file = write_yaml(yaml);
    let spec = load_config(temp_file.path()).unwrap();

    assert_eq!(spec.data.dataset, DatasetKind::Cifar10);
    assert_eq!(spec.data.root, PathBuf::from("/tmp/cifar"));
    assert!(!spec.data.download);
    assert_eq!(spec.optimizer.momentum, 0.9);
    assert_eq!(spec.training.zero_grad, ZeroGradMode::Model);
    assert!(!spec.training.set_to_none);
    assert_eq!(spec.training.gradient_accumulation_steps, 2);
    assert_eq!(spec.training.grad_clip, Some(5.0));
    assert_eq!(spec.net_config(), NetConfig::default());
}

#[test]
fn test_minimal_config_defaults() {
    let temp_file = write_yaml("optimizer:\n  lr: 0.001\ndata: {}\n");
    let spec = load_config(temp_file.path()).unwrap();

    assert_eq!(spec.data.batch_size, 4);
    assert!(spec.data.shuffle);
    assert_eq!(spec.data.num_workers, 2);
    assert_eq!(spec.data.root, PathBuf::from("./data"));
    assert_eq!(spec.optimizer.name, "sgd");
    assert_eq!(spec.training.epochs, 2);
    assert_eq!(spec.training.log_interval, Some(2000));
    assert_eq!(spec.training.zero_grad, ZeroGradMode::Optimizer);
    assert!(spec.training.set_to_none);
    assert!(spec.model.is_none());
}

#[test]
fn test_log_interval_null_disables_logging() {
    let temp_file =
        write_yaml("optimizer:\n  lr: 0.001\ndata: {}\ntraining:\n  log_interval: null\n");
    let spec = load_config(temp_file.path()).unwrap();
    assert_eq!(spec.training.log_interval, None);
}

#[test]
fn test_load_invalid_config() {
    let temp_file = write_yaml("data:\n  batch_size: 0\noptimizer:\n  lr: 0.001\n");
    let result = load_config(temp_file.path());
    assert!(matches!(result, Err(crate::Error::ConfigError(msg)) if msg.contains("batch size")));
}

#[test]
fn test_load_malformed_yaml() {
    let temp_file = write_yaml("this is not valid yaml: [}");
    assert!(load_config(temp_file.path()).is_err());
}

#[test]
fn test_unknown_zero_grad_mode_rejected() {
    let temp_file =
        write_yaml("optimizer:\n  lr: 0.001\ndata: {}\ntraining:\n  zero_grad: sometimes\n");
    assert!(load_config(temp_file.path()).is_err());
}

#[test]
fn test_build_optimizer() {
    let sgd = build_optimizer(&OptimSpec {
        name: "sgd".to_string(),
        lr: 0.01,
        momentum: 0.9,
    })
    .unwrap();
    assert_eq!(sgd.name(), "sgd");
    assert_eq!(sgd.lr(), 0.01);

    let adam = build_optimizer(&OptimSpec {
        name: "adam".to_string(),
        lr: 0.001,
        momentum: 0.0,
    })
    .unwrap();
    assert_eq!(adam.name(), "adam");
}

#[test]
fn test_missing_cifar_without_download() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        "data:\n  root: {}\n  download: false\noptimizer:\n  lr: 0.001\n",
        dir.path().display()
    );
    let spec: TrainSpec = serde_yaml::from_str(&yaml).unwrap();

    let result = run_training(&spec, RunOptions::default());
    assert!(matches!(result, Err(crate::Error::Dataset(_))));
}

fn small_net_yaml(output: &std::path::Path) -> String {
    format!(
        r#"
data:
  dataset: synthetic
  batch_size: 4
  num_workers: 0
  synthetic_samples: 32
optimizer:
  name: sgd
  lr: 0.01
  momentum: 0.9
training:
  epochs: 2
  log_interval: 4
  seed: 1
  output: {}
model:
  in_channels: 3
  image_size: 16
  conv1_channels: 4
  conv2_channels: 4
  kernel_size: 3
  fc1_features: 16
  fc2_features: 12
  num_classes: 4
"#,
        output.display()
    )
}

#[test]
fn test_run_training_on_synthetic_data() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("net.json");
    let temp_file = write_yaml(&small_net_yaml(&output));
    let spec = load_config(temp_file.path()).unwrap();

    let report = run_training(
        &spec,
        RunOptions {
            evaluate: true,
            quiet: true,
        },
    )
    .unwrap();

    assert_eq!(report.result.final_epoch, 2);
    assert!(report.result.final_loss.is_finite());
    let eval = report.eval.unwrap();
    assert_eq!(eval.total, 8);

    let mut restored = Net::new(spec.net_config(), 99).unwrap();
    let metadata = load_checkpoint(&mut restored, &output).unwrap();
    assert_eq!(metadata.epochs, Some(2));
}

#[test]
fn test_cli_overrides_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    let temp_file = write_yaml(&small_net_yaml(&dir.path().join("net.json")));
    let mut spec = load_config(temp_file.path()).unwrap();

    let cli = parse_args(["zerograd", "train", "c.yaml", "--batch-size", "0"]).unwrap();
    let Command::Train(args) = cli.command else {
        panic!("Expected Train command");
    };
    apply_overrides(&mut spec, &args);

    assert_eq!(
        validate_config(&spec),
        Err(ValidationError::InvalidBatchSize(0))
    );
}
