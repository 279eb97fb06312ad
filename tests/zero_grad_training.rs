//! End-to-end training runs on generated images.
//!
//! The loop resets gradients before every backward pass, so the loss falls
//! over the epochs; the same loop without the reset drifts on stale gradients.

use std::sync::Arc;
use zerograd::data::{DataLoader, ImageDims, LoaderConfig, SyntheticImages};
use zerograd::nn::{Module, Net, NetConfig};
use zerograd::optim::SGD;
use zerograd::train::{evaluate, CrossEntropyLoss, TrainConfig, Trainer, ZeroGradMode};

fn net_config() -> NetConfig {
    NetConfig {
        in_channels: 3,
        image_size: 16,
        conv1_channels: 4,
        conv2_channels: 4,
        kernel_size: 3,
        pool_size: 2,
        fc1_features: 16,
        fc2_features: 12,
        num_classes: 4,
    }
}

fn loader(samples: usize, seed: u64, workers: usize) -> DataLoader {
    let dims = ImageDims {
        channels: 3,
        height: 16,
        width: 16,
    };
    let data = SyntheticImages::new(samples, dims, 4, seed).unwrap();
    DataLoader::new(
        Arc::new(data),
        LoaderConfig {
            batch_size: 4,
            shuffle: true,
            num_workers: workers,
            drop_last: false,
            seed,
        },
    )
    .unwrap()
}

fn trainer(mode: ZeroGradMode) -> Trainer<Net> {
    Trainer::new(
        Net::new(net_config(), 0).unwrap(),
        Box::new(SGD::new(0.01, 0.9)),
        Box::new(CrossEntropyLoss::new(4)),
        TrainConfig::new().with_log_interval(8).with_zero_grad(mode),
    )
}

#[test]
fn test_loss_decreases_with_zero_grad() {
    let train_loader = loader(64, 1, 2);
    let mut trainer = trainer(ZeroGradMode::Optimizer);

    let result = trainer.train(&train_loader, 8);

    assert_eq!(result.final_epoch, 8);
    assert!(result.epoch_losses.iter().all(|l| l.is_finite()));
    assert!(
        result.final_loss < result.epoch_losses[0],
        "loss did not decrease: {:?}",
        result.epoch_losses
    );
    assert!(result.best_loss <= result.final_loss);
}

#[test]
fn test_model_level_reset_trains_identically() {
    let train_loader = loader(32, 2, 0);
    let mut by_optimizer = trainer(ZeroGradMode::Optimizer);
    let mut by_model = trainer(ZeroGradMode::Model);

    let a = by_optimizer.train(&train_loader, 2);
    let b = by_model.train(&train_loader, 2);

    for (x, y) in a.epoch_losses.iter().zip(&b.epoch_losses) {
        assert!((x - y).abs() < 1e-5);
    }
}

#[test]
fn test_skipping_reset_changes_the_updates() {
    let train_loader = loader(32, 3, 0);
    let mut reset = trainer(ZeroGradMode::Optimizer);
    let mut stale = trainer(ZeroGradMode::Never);

    reset.train_epoch(&train_loader, 0);
    stale.train_epoch(&train_loader, 0);

    let diff: f32 = reset
        .model()
        .parameters()
        .iter()
        .zip(stale.model().parameters())
        .map(|(a, b)| (a.data() - b.data()).mapv(f32::abs).sum())
        .sum();
    assert!(diff > 1e-3, "parameters should diverge, diff = {diff}");
}

#[test]
fn test_evaluate_after_training() {
    let mut trainer = trainer(ZeroGradMode::Optimizer);
    trainer.train(&loader(64, 4, 0), 2);

    let report = evaluate(trainer.model(), &loader(20, 5, 0));
    assert_eq!(report.total, 20);
    assert_eq!(report.per_class.iter().map(|c| c.1).sum::<usize>(), 20);
}
