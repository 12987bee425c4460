//! Indexing and loading class-per-subdirectory image trees.
//!
//! A dataset root is expected to contain exactly two subdirectories, one per
//! class. Folder names sorted lexicographically define the labels: the first
//! folder maps to 0.0, the second to 1.0.

use crate::types::{ClassDatasetError, DatasetResult, LoadedSample, SampleIndex};
use image::imageops::FilterType;
use rayon::prelude::*;
use std::fs;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// An indexed two-class dataset root.
#[derive(Debug, Clone)]
pub struct ClassTree {
    /// Class folder names, sorted; position is the label (0 or 1).
    pub classes: [String; 2],
    pub indices: Vec<SampleIndex>,
}

impl ClassTree {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Walk `root` and index every image file under its two class folders.
pub fn index_class_tree(root: &Path) -> DatasetResult<ClassTree> {
    let entries = fs::read_dir(root).map_err(|source| ClassDatasetError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut class_dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ClassDatasetError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            class_dirs.push(path);
        }
    }
    class_dirs.sort();

    if class_dirs.len() != 2 {
        return Err(ClassDatasetError::Validation {
            path: root.to_path_buf(),
            msg: format!(
                "expected exactly 2 class subdirectories, found {}",
                class_dirs.len()
            ),
        });
    }

    let classes = [
        dir_name(&class_dirs[0]),
        dir_name(&class_dirs[1]),
    ];

    let mut indices = Vec::new();
    for (label, dir) in class_dirs.iter().enumerate() {
        let entries = fs::read_dir(dir).map_err(|source| ClassDatasetError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut count = 0usize;
        for entry in entries {
            let entry = entry.map_err(|source| ClassDatasetError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if !is_image_file(&path) {
                tracing::warn!(path = %path.display(), "skipping non-image file");
                continue;
            }
            indices.push(SampleIndex {
                path,
                label: label as f32,
            });
            count += 1;
        }
        if count == 0 {
            return Err(ClassDatasetError::Validation {
                path: dir.clone(),
                msg: "class folder contains no image files".to_string(),
            });
        }
    }

    // Stable ordering regardless of directory iteration order; shuffling is
    // the batch iterator's job.
    indices.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(ClassTree { classes, indices })
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Decode and resize every indexed sample, in parallel.
///
/// All samples come out at `target_size`, so every later batch shares
/// dimensions by construction. Decoded pixels stay resident until the dataset
/// is dropped; epochs re-augment them without touching disk again.
pub fn load_samples(
    indices: &[SampleIndex],
    target_size: (u32, u32),
) -> DatasetResult<Vec<LoadedSample>> {
    indices
        .par_iter()
        .map(|idx| {
            let img = image::open(&idx.path).map_err(|source| ClassDatasetError::Image {
                path: idx.path.clone(),
                source,
            })?;
            let rgb = img.to_rgb8();
            let (w, h) = target_size;
            let rgb = if rgb.dimensions() == target_size {
                rgb
            } else {
                image::imageops::resize(&rgb, w, h, FilterType::Triangle)
            };
            Ok(LoadedSample {
                rgb,
                label: idx.label,
            })
        })
        .collect()
}
