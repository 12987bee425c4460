use burn::backend::Autodiff;
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use class_dataset::{build_train_val_iters, BatchIter, DatasetConfig};
use clap::{Parser, ValueEnum};
use models::{
    Classifier, ClassifierHead, ClassifierHeadConfig, ConvFeatureExtractor,
    ConvFeatureExtractorConfig,
};
use std::fs;
use std::path::Path;

use crate::history::{EpochRecord, TrainingHistory};
use crate::TrainBackend;

type ADBackend = Autodiff<TrainBackend>;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Train the two-class classifier head on a frozen pretrained conv base"
)]
pub struct TrainArgs {
    /// Training set root: one subdirectory per class.
    #[arg(long, default_value = "assets/datasets/train")]
    pub train_root: String,
    /// Validation set root: one subdirectory per class.
    #[arg(long, default_value = "assets/datasets/valid")]
    pub val_root: String,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Square image side; all images are resized to this at load time.
    #[arg(long, default_value_t = 128)]
    pub image_size: u32,
    /// Batch size.
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
    /// Number of epochs (fixed count; no early stopping).
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,
    /// Learning rate for Adam.
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,
    /// Probability of a horizontal flip per training image.
    #[arg(long, default_value_t = 0.5)]
    pub flip_prob: f32,
    /// Contrast jitter bound; factors are drawn from [1 - b, 1 + b].
    #[arg(long, default_value_t = 0.5)]
    pub contrast_jitter: f32,
    /// Seed for shuffling, augmentation draws, and head initialization.
    #[arg(long, default_value_t = 31415)]
    pub seed: u64,
    /// Pretrained conv base checkpoint; fresh weights are used if missing.
    #[arg(long, default_value = "checkpoints/conv_base.bin")]
    pub base_checkpoint: String,
    /// Head checkpoint output path.
    #[arg(long, default_value = "checkpoints/classifier_head.bin")]
    pub head_checkpoint_out: String,
    /// Per-epoch history JSON output path.
    #[arg(long, default_value = "checkpoints/history.json")]
    pub history_out: String,
}

pub fn load_feature_extractor_from_checkpoint<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> Result<ConvFeatureExtractor<B>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    ConvFeatureExtractor::<B>::new(ConvFeatureExtractorConfig::default(), device).load_file(
        path.as_ref(),
        &recorder,
        device,
    )
}

pub fn load_head_from_checkpoint<B: Backend, P: AsRef<Path>>(
    path: P,
    input_dim: usize,
    device: &B::Device,
) -> Result<ClassifierHead<B>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    ClassifierHead::<B>::new(ClassifierHeadConfig::new(input_dim), device).load_file(
        path.as_ref(),
        &recorder,
        device,
    )
}

/// Binary cross-entropy over probabilities, clamped away from 0 and 1.
pub fn bce_loss<B: Backend>(preds: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-6;
    let preds = preds.clamp(eps, 1.0 - eps);
    let ones_t = Tensor::<B, 2>::ones(targets.dims(), &targets.device());
    let ones_p = Tensor::<B, 2>::ones(preds.dims(), &preds.device());
    let loss =
        -((targets.clone() * preds.clone().log()) + ((ones_t - targets) * (ones_p - preds).log()));
    loss.mean()
}

/// Samples where the thresholded prediction matches the label.
pub fn count_correct(probs: &[f32], targets: &[f32]) -> usize {
    probs
        .iter()
        .zip(targets)
        .filter(|(p, t)| (**p > 0.5) == (**t > 0.5))
        .count()
}

/// Fraction of samples where the thresholded prediction matches the label.
pub fn accuracy_from_probs(probs: &[f32], targets: &[f32]) -> f32 {
    if probs.is_empty() {
        return 0.0;
    }
    count_correct(probs, targets) as f32 / probs.len() as f32
}

fn scalar<B: Backend>(loss: Tensor<B, 1>) -> f32 {
    loss.into_data()
        .to_vec::<f32>()
        .unwrap_or_default()
        .into_iter()
        .next()
        .unwrap_or(0.0)
}

/// One full pass without parameter updates: mean loss and accuracy.
pub fn evaluate<B: Backend>(
    model: &Classifier<B>,
    iter: &mut BatchIter,
    batch_size: usize,
    device: &B::Device,
) -> (f32, f32) {
    iter.reset();
    let mut loss_sum = 0.0f32;
    let mut correct = 0usize;
    let mut total = 0usize;
    while let Some(batch) = iter.next_batch::<B>(batch_size, device) {
        let n = batch.images.dims()[0];
        let preds = model.forward(batch.images);
        let loss = bce_loss(preds.clone(), batch.labels.clone());
        let probs = preds.into_data().to_vec::<f32>().unwrap_or_default();
        let targets = batch.labels.into_data().to_vec::<f32>().unwrap_or_default();
        correct += count_correct(&probs, &targets);
        loss_sum += scalar(loss) * n as f32;
        total += n;
    }
    if total == 0 {
        return (0.0, 0.0);
    }
    (loss_sum / total as f32, correct as f32 / total as f32)
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            tracing::warn!(
                "built with backend-wgpu; training uses the WGPU backend despite --backend ndarray"
            );
        }
        _ => {}
    }
    Ok(())
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<TrainingHistory> {
    validate_backend_choice(args.backend)?;

    if args.image_size % 8 != 0 {
        anyhow::bail!("image size must be a multiple of 8 (three 2x2 pooling stages)");
    }
    let target_size = (args.image_size, args.image_size);

    let cfg = DatasetConfig {
        target_size,
        flip_horizontal_prob: args.flip_prob,
        contrast_jitter: args.contrast_jitter,
        shuffle: true,
        drop_last: false,
        seed: Some(args.seed),
    };

    let (mut train_iter, mut val_iter) =
        build_train_val_iters(Path::new(&args.train_root), Path::new(&args.val_root), cfg)?;
    tracing::info!(pipeline = %train_iter.pipeline().describe(), "augmentation active for training");

    // Seed the backend so head initialization is reproducible.
    <ADBackend as Backend>::seed(args.seed);
    let device = <ADBackend as Backend>::Device::default();

    let base_cfg = ConvFeatureExtractorConfig::default();
    let base: ConvFeatureExtractor<ADBackend> =
        match load_feature_extractor_from_checkpoint(&args.base_checkpoint, &device) {
            Ok(model) => {
                tracing::info!(path = %args.base_checkpoint, "loaded pretrained conv base");
                model
            }
            Err(e) => {
                tracing::warn!(
                    path = %args.base_checkpoint,
                    error = %e,
                    "pretrained base unavailable; using fresh frozen weights"
                );
                ConvFeatureExtractor::new(base_cfg.clone(), &device)
            }
        };

    let head_cfg = ClassifierHeadConfig::new(base_cfg.feature_dim(target_size));
    let mut head = ClassifierHead::<ADBackend>::new(head_cfg, &device);
    let mut optim = AdamConfig::new().init();

    let batch_size = args.batch_size.max(1);
    let mut history = TrainingHistory::new();

    for epoch in 0..args.epochs {
        train_iter.reset();
        let mut loss_sum = 0.0f32;
        let mut correct = 0usize;
        let mut total = 0usize;

        while let Some(batch) = train_iter.next_batch::<ADBackend>(batch_size, &device) {
            let n = batch.images.dims()[0];
            // Freeze contract: gradients never reach the base.
            let features = base.forward(batch.images).detach();
            let preds = head.forward(features);
            let loss = bce_loss(preds.clone(), batch.labels.clone());
            let loss_detached = loss.clone().detach();
            let grads = GradientsParams::from_grads(loss.backward(), &head);
            head = optim.step(args.lr, head, grads);

            let probs = preds
                .detach()
                .into_data()
                .to_vec::<f32>()
                .unwrap_or_default();
            let targets = batch.labels.into_data().to_vec::<f32>().unwrap_or_default();
            correct += count_correct(&probs, &targets);
            loss_sum += scalar(loss_detached) * n as f32;
            total += n;
        }

        let train_loss = if total > 0 {
            loss_sum / total as f32
        } else {
            0.0
        };
        let train_accuracy = if total > 0 {
            correct as f32 / total as f32
        } else {
            0.0
        };

        // Validation runs on the inner backend with augmentation disabled.
        let val_model = Classifier::new(base.valid(), head.valid());
        let (val_loss, val_accuracy) = evaluate::<TrainBackend>(
            &val_model,
            &mut val_iter,
            batch_size,
            &Default::default(),
        );

        tracing::info!(
            epoch,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            "epoch complete"
        );
        history.push(EpochRecord {
            epoch,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
        });
    }

    if let Some(parent) = Path::new(&args.head_checkpoint_out).parent() {
        fs::create_dir_all(parent)?;
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    head.clone()
        .save_file(Path::new(&args.head_checkpoint_out), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save head checkpoint: {e}"))?;
    tracing::info!(path = %args.head_checkpoint_out, "saved head checkpoint");

    history.save(Path::new(&args.history_out))?;
    tracing::info!(path = %args.history_out, epochs = history.len(), "saved training history");

    Ok(history)
}
