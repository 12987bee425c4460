use clap::Parser;
use class_dataset::{AugMode, BatchIter, DatasetConfig, InMemoryDataset};
use models::{
    Classifier, ClassifierHead, ClassifierHeadConfig, ConvFeatureExtractor,
    ConvFeatureExtractorConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use training::{
    evaluate, load_feature_extractor_from_checkpoint, load_head_from_checkpoint,
    validate_backend_choice, BackendKind, TrainBackend,
};

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    about = "Evaluate a trained classifier head (with its frozen base) on a labeled directory tree"
)]
struct Args {
    /// Dataset root: one subdirectory per class.
    #[arg(long, default_value = "assets/datasets/valid")]
    dataset_root: String,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    backend: BackendKind,
    /// Square image side; must match the size used for training.
    #[arg(long, default_value_t = 128)]
    image_size: u32,
    /// Batch size.
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    /// Pretrained conv base checkpoint.
    #[arg(long, default_value = "checkpoints/conv_base.bin")]
    base_checkpoint: String,
    /// Trained head checkpoint.
    #[arg(long, default_value = "checkpoints/classifier_head.bin")]
    head_checkpoint: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    validate_backend_choice(args.backend)?;

    if args.image_size % 8 != 0 {
        anyhow::bail!("image size must be a multiple of 8 (three 2x2 pooling stages)");
    }
    let target_size = (args.image_size, args.image_size);

    let data = Arc::new(InMemoryDataset::from_root(
        Path::new(&args.dataset_root),
        target_size,
    )?);
    let classes = data.classes().clone();
    let cfg = DatasetConfig {
        target_size,
        shuffle: false,
        drop_last: false,
        ..Default::default()
    };
    let mut iter = BatchIter::new(data, cfg, AugMode::Eval);

    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let base_cfg = ConvFeatureExtractorConfig::default();

    let base: ConvFeatureExtractor<TrainBackend> =
        load_feature_extractor_from_checkpoint(&args.base_checkpoint, &device).unwrap_or_else(
            |e| {
                println!(
                    "Failed to load base checkpoint {}; using fresh weights ({e})",
                    args.base_checkpoint
                );
                ConvFeatureExtractor::new(base_cfg.clone(), &device)
            },
        );

    let input_dim = base_cfg.feature_dim(target_size);
    let head: ClassifierHead<TrainBackend> =
        load_head_from_checkpoint(&args.head_checkpoint, input_dim, &device).unwrap_or_else(|e| {
            println!(
                "Failed to load head checkpoint {}; using fresh weights ({e})",
                args.head_checkpoint
            );
            ClassifierHead::new(ClassifierHeadConfig::new(input_dim), &device)
        });

    let model = Classifier::new(base, head);
    let (loss, accuracy) = evaluate(&model, &mut iter, args.batch_size.max(1), &device);
    println!(
        "Eval complete: classes=[{}, {}] loss={:.4} accuracy={:.3}",
        classes[0], classes[1], loss, accuracy
    );

    Ok(())
}
