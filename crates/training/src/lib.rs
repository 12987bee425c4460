#![recursion_limit = "256"]

pub mod history;
pub mod util;

pub use history::{EpochRecord, TrainingHistory};
pub use models::{
    Classifier, ClassifierHead, ClassifierHeadConfig, ConvFeatureExtractor,
    ConvFeatureExtractorConfig,
};
pub use util::{
    accuracy_from_probs, bce_loss, count_correct, evaluate, load_feature_extractor_from_checkpoint,
    load_head_from_checkpoint, run_train, validate_backend_choice, BackendKind, TrainArgs,
};

/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
