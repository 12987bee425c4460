//! Dataset loading, augmentation, and Burn-compatible batching for two-class
//! image classification.
//!
//! This crate provides:
//! - Indexing of class-per-subdirectory image trees
//! - One-time decode + resize with an in-memory cache reused across epochs
//! - A stochastic, label-preserving augmentation pipeline (flip, contrast)
//!   that is a strict no-op in eval mode
//! - Seeded, reproducible batch iteration

pub mod aug;
pub mod batch;
pub mod folder;
pub mod types;

pub use aug::{DatasetConfig, TransformPipeline};
pub use batch::{build_train_val_iters, BatchIter, ClassBatch, InMemoryDataset};
pub use folder::{index_class_tree, load_samples, ClassTree};
pub use types::*;
