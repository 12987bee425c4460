//! Integration tests for on-disk class trees: indexing, loading, iteration.

use class_dataset::{
    build_train_val_iters, index_class_tree, AugMode, BatchIter, ClassDatasetError, DatasetConfig,
    InMemoryDataset,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;

type TestBackend = burn_ndarray::NdArray<f32>;

/// Write `count` solid-color images into `root/<class_name>/`.
fn create_class_folder(
    root: &Path,
    class_name: &str,
    count: usize,
    tint: u8,
) -> anyhow::Result<()> {
    let dir = root.join(class_name);
    fs::create_dir_all(&dir)?;
    for i in 0..count {
        let img = RgbImage::from_pixel(12, 9, Rgb([tint, (i * 20) as u8, 80]));
        img.save(dir.join(format!("img_{i:03}.png")))?;
    }
    Ok(())
}

#[test]
fn index_assigns_labels_by_sorted_folder_name() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    create_class_folder(tmp.path(), "truck", 3, 10)?;
    create_class_folder(tmp.path(), "car", 2, 200)?;

    let tree = index_class_tree(tmp.path())?;
    assert_eq!(tree.classes, ["car".to_string(), "truck".to_string()]);
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.indices.iter().filter(|s| s.label == 0.0).count(), 2);
    assert_eq!(tree.indices.iter().filter(|s| s.label == 1.0).count(), 3);
    Ok(())
}

#[test]
fn index_rejects_single_class_tree() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    create_class_folder(tmp.path(), "only", 2, 1)?;
    match index_class_tree(tmp.path()) {
        Err(ClassDatasetError::Validation { .. }) => Ok(()),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn non_image_files_are_skipped() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    create_class_folder(tmp.path(), "a", 2, 1)?;
    create_class_folder(tmp.path(), "b", 2, 2)?;
    fs::write(tmp.path().join("a").join("notes.txt"), b"not an image")?;

    let tree = index_class_tree(tmp.path())?;
    assert_eq!(tree.len(), 4);
    Ok(())
}

#[test]
fn loaded_samples_share_target_dimensions() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    create_class_folder(tmp.path(), "a", 2, 30)?;
    create_class_folder(tmp.path(), "b", 2, 60)?;

    let data = InMemoryDataset::from_root(tmp.path(), (16, 16))?;
    assert_eq!(data.len(), 4);
    for sample in data.samples() {
        assert_eq!(sample.rgb.dimensions(), (16, 16));
    }
    Ok(())
}

#[test]
fn end_to_end_batches_cover_every_sample_once() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    create_class_folder(tmp.path(), "a", 5, 30)?;
    create_class_folder(tmp.path(), "b", 5, 60)?;

    let data = Arc::new(InMemoryDataset::from_root(tmp.path(), (8, 8))?);
    let cfg = DatasetConfig {
        target_size: (8, 8),
        seed: Some(31415),
        ..Default::default()
    };
    let mut iter = BatchIter::new(data, cfg, AugMode::Train);
    let device = Default::default();

    let mut total = 0;
    let mut label_sum = 0.0;
    while let Some(batch) = iter.next_batch::<TestBackend>(4, &device) {
        let labels = batch.labels.into_data().to_vec::<f32>().unwrap();
        total += labels.len();
        label_sum += labels.iter().sum::<f32>();
    }
    assert_eq!(total, 10);
    assert!((label_sum - 5.0).abs() < 1e-6, "each class seen once");
    Ok(())
}

#[test]
fn train_val_split_only_augments_the_training_side() -> anyhow::Result<()> {
    let train = tempfile::tempdir()?;
    create_class_folder(train.path(), "a", 2, 30)?;
    create_class_folder(train.path(), "b", 2, 60)?;
    let val = tempfile::tempdir()?;
    create_class_folder(val.path(), "a", 2, 90)?;
    create_class_folder(val.path(), "b", 2, 120)?;

    let cfg = DatasetConfig {
        target_size: (8, 8),
        seed: Some(31415),
        ..Default::default()
    };
    let (train_iter, val_iter) = build_train_val_iters(train.path(), val.path(), cfg)?;
    assert_eq!(train_iter.mode(), AugMode::Train);
    assert_eq!(val_iter.mode(), AugMode::Eval);
    Ok(())
}
