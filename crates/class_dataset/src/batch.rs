//! Batch iteration over an in-memory dataset for training and validation.

use crate::aug::{DatasetConfig, TransformPipeline};
use crate::folder::{index_class_tree, load_samples};
use crate::types::{AugMode, DatasetResult, LoadedSample};
use rand::{seq::SliceRandom, SeedableRng};
use std::path::Path;
use std::sync::Arc;

/// A two-class dataset decoded once and cached for the whole run.
#[derive(Debug)]
pub struct InMemoryDataset {
    samples: Vec<LoadedSample>,
    classes: [String; 2],
}

impl InMemoryDataset {
    /// Index `root`, then decode and resize every sample.
    pub fn from_root(root: &Path, target_size: (u32, u32)) -> DatasetResult<Self> {
        let tree = index_class_tree(root)?;
        let samples = load_samples(&tree.indices, target_size)?;
        tracing::info!(
            root = %root.display(),
            samples = samples.len(),
            class_a = %tree.classes[0],
            class_b = %tree.classes[1],
            "dataset cached in memory"
        );
        Ok(Self {
            samples,
            classes: tree.classes,
        })
    }

    pub fn from_samples(samples: Vec<LoadedSample>, classes: [String; 2]) -> Self {
        Self { samples, classes }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn classes(&self) -> &[String; 2] {
        &self.classes
    }

    pub fn samples(&self) -> &[LoadedSample] {
        &self.samples
    }
}

/// One collated batch: NCHW images in [0, 1] plus a one-column label tensor.
pub struct ClassBatch<B: burn::tensor::backend::Backend> {
    pub images: burn::tensor::Tensor<B, 4>,
    pub labels: burn::tensor::Tensor<B, 2>,
}

/// Epoch iterator over a cached dataset.
///
/// Shuffle order and augmentation draws come from a single seeded RNG stream,
/// so two iterators built with the same seed replay identical decisions.
pub struct BatchIter {
    data: Arc<InMemoryDataset>,
    order: Vec<usize>,
    cursor: usize,
    mode: AugMode,
    cfg: DatasetConfig,
    pipeline: TransformPipeline,
    rng: rand::rngs::StdRng,
    images_buf: Vec<f32>,
    labels_buf: Vec<f32>,
}

impl BatchIter {
    pub fn new(data: Arc<InMemoryDataset>, cfg: DatasetConfig, mode: AugMode) -> Self {
        let rng = match cfg.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
        };
        let pipeline = match mode {
            AugMode::Train => TransformPipeline::from_config(&cfg),
            AugMode::Eval => TransformPipeline::disabled(),
        };
        let order = (0..data.len()).collect();
        let mut iter = Self {
            data,
            order,
            cursor: 0,
            mode,
            cfg,
            pipeline,
            rng,
            images_buf: Vec::new(),
            labels_buf: Vec::new(),
        };
        iter.reset();
        iter
    }

    pub fn mode(&self) -> AugMode {
        self.mode
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Start a new epoch: rewind and, for shuffled training iterators, reorder
    /// samples with the next draws from the RNG stream.
    pub fn reset(&mut self) {
        self.cursor = 0;
        if self.cfg.shuffle && self.mode == AugMode::Train {
            self.order.shuffle(&mut self.rng);
        }
    }

    /// Assemble the next batch, or `None` when the epoch is exhausted.
    pub fn next_batch<B: burn::tensor::backend::Backend>(
        &mut self,
        batch_size: usize,
        device: &B::Device,
    ) -> Option<ClassBatch<B>> {
        let batch_size = batch_size.max(1);
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + batch_size).min(self.order.len());
        let slice_len = end - self.cursor;
        if self.cfg.drop_last && slice_len < batch_size {
            self.cursor = self.order.len();
            return None;
        }

        let (width, height) = self.cfg.target_size;
        let pixels = (width * height) as usize;
        self.images_buf.clear();
        self.images_buf.reserve(slice_len * 3 * pixels);
        self.labels_buf.clear();
        self.labels_buf.reserve(slice_len);

        for pos in self.cursor..end {
            let sample = &self.data.samples()[self.order[pos]];
            debug_assert_eq!(sample.rgb.dimensions(), self.cfg.target_size);

            let mut rgb = sample.rgb.clone();
            self.pipeline.apply(&mut rgb, self.mode, &mut self.rng);

            // CHW, normalized to [0, 1].
            let base = self.images_buf.len();
            self.images_buf.resize(base + 3 * pixels, 0.0);
            for (y, x, pixel) in rgb.enumerate_pixels() {
                let offset = (y * width + x) as usize;
                self.images_buf[base + offset] = pixel[0] as f32 / 255.0;
                self.images_buf[base + pixels + offset] = pixel[1] as f32 / 255.0;
                self.images_buf[base + 2 * pixels + offset] = pixel[2] as f32 / 255.0;
            }
            self.labels_buf.push(sample.label);
        }
        self.cursor = end;

        let images =
            burn::tensor::Tensor::<B, 1>::from_floats(self.images_buf.as_slice(), device)
                .reshape([slice_len, 3, height as usize, width as usize]);
        let labels =
            burn::tensor::Tensor::<B, 1>::from_floats(self.labels_buf.as_slice(), device)
                .reshape([slice_len, 1]);

        Some(ClassBatch { images, labels })
    }
}

/// Build train and validation iterators from their directory roots.
///
/// Validation always iterates unshuffled with augmentation disabled; the
/// training iterator keeps whatever the caller configured.
pub fn build_train_val_iters(
    train_root: &Path,
    val_root: &Path,
    cfg: DatasetConfig,
) -> DatasetResult<(BatchIter, BatchIter)> {
    let train_data = Arc::new(InMemoryDataset::from_root(train_root, cfg.target_size)?);
    let val_data = Arc::new(InMemoryDataset::from_root(val_root, cfg.target_size)?);
    let val_cfg = DatasetConfig {
        shuffle: false,
        drop_last: false,
        ..cfg.clone()
    };
    let train_iter = BatchIter::new(train_data, cfg, AugMode::Train);
    let val_iter = BatchIter::new(val_data, val_cfg, AugMode::Eval);
    Ok((train_iter, val_iter))
}
