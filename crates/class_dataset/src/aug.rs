//! Stochastic, label-preserving image augmentation.
//!
//! Two transforms are supported: horizontal flip and contrast jitter. Both are
//! drawn independently per image, per epoch, and both are disabled entirely in
//! [`AugMode::Eval`] so validation metrics never see augmented pixels.

use crate::types::AugMode;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Resize all images to this (width, height) at load time.
    pub target_size: (u32, u32),
    /// Probability of mirroring an image left-to-right.
    pub flip_horizontal_prob: f32,
    /// Contrast factor bound: factors are drawn uniformly from
    /// [1 - bound, 1 + bound].
    pub contrast_jitter: f32,
    /// Shuffle sample order each epoch (training only).
    pub shuffle: bool,
    /// Drop the last partial batch.
    pub drop_last: bool,
    /// Seed for reproducible shuffling and augmentation draws.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            target_size: (128, 128),
            flip_horizontal_prob: 0.5,
            contrast_jitter: 0.5,
            shuffle: true,
            drop_last: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    pub flip_horizontal_prob: f32,
    pub contrast_jitter: f32,
}

impl TransformPipeline {
    pub fn from_config(cfg: &DatasetConfig) -> Self {
        Self {
            flip_horizontal_prob: cfg.flip_horizontal_prob,
            contrast_jitter: cfg.contrast_jitter,
        }
    }

    /// Identity pipeline, regardless of mode.
    pub fn disabled() -> Self {
        Self {
            flip_horizontal_prob: 0.0,
            contrast_jitter: 0.0,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "flip_p={:.2} contrast_jitter={:.2}",
            self.flip_horizontal_prob, self.contrast_jitter
        )
    }

    /// Apply the pipeline in place. Eval mode is a strict no-op.
    pub fn apply(&self, img: &mut image::RgbImage, mode: AugMode, rng: &mut dyn rand::RngCore) {
        if mode == AugMode::Eval {
            return;
        }
        maybe_hflip(img, self.flip_horizontal_prob, rng);
        maybe_contrast(img, self.contrast_jitter, rng);
    }
}

pub(crate) fn maybe_hflip(img: &mut image::RgbImage, prob: f32, rng: &mut dyn rand::RngCore) {
    if prob <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) < prob {
        image::imageops::flip_horizontal_in_place(img);
    }
}

/// Scale each pixel's deviation from the per-channel image mean by a factor
/// drawn uniformly from [1 - bound, 1 + bound], clamping to the valid range.
pub(crate) fn maybe_contrast(img: &mut image::RgbImage, bound: f32, rng: &mut dyn rand::RngCore) {
    if bound <= 0.0 {
        return;
    }
    let factor = rng.random_range((1.0 - bound).max(0.0)..1.0 + bound);
    apply_contrast(img, factor);
}

pub(crate) fn apply_contrast(img: &mut image::RgbImage, factor: f32) {
    let pixel_count = (img.width() * img.height()) as f32;
    if pixel_count == 0.0 {
        return;
    }

    let mut mean = [0.0f32; 3];
    for pixel in img.pixels() {
        for c in 0..3 {
            mean[c] += pixel[c] as f32;
        }
    }
    for m in mean.iter_mut() {
        *m /= pixel_count;
    }

    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = (pixel[c] as f32 - mean[c]) * factor + mean[c];
            pixel[c] = v.clamp(0.0, 255.0).round() as u8;
        }
    }
}

#[cfg(test)]
mod aug_tests {
    use super::{apply_contrast, maybe_hflip, TransformPipeline};
    use crate::types::AugMode;
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};

    fn gradient_image(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 16) as u8, (y * 16) as u8, 100]);
        }
        img
    }

    #[test]
    fn hflip_twice_is_the_identity() {
        let original = gradient_image(8, 8);
        let mut img = original.clone();
        let mut rng = StdRng::seed_from_u64(7);
        maybe_hflip(&mut img, 1.0, &mut rng);
        assert_ne!(img, original, "flip with p=1 must change a gradient image");
        maybe_hflip(&mut img, 1.0, &mut rng);
        assert_eq!(img, original);
    }

    #[test]
    fn eval_mode_is_identity() {
        let original = gradient_image(8, 8);
        let mut img = original.clone();
        let pipeline = TransformPipeline {
            flip_horizontal_prob: 1.0,
            contrast_jitter: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(7);
        pipeline.apply(&mut img, AugMode::Eval, &mut rng);
        assert_eq!(img, original);
    }

    #[test]
    fn contrast_preserves_shape_and_clamps() {
        let mut img = gradient_image(8, 8);
        apply_contrast(&mut img, 1.5);
        assert_eq!(img.dimensions(), (8, 8));

        // Extreme pixels with a huge factor must saturate, not wrap.
        let mut extreme = RgbImage::new(2, 1);
        extreme.put_pixel(0, 0, Rgb([0, 0, 0]));
        extreme.put_pixel(1, 0, Rgb([255, 255, 255]));
        apply_contrast(&mut extreme, 10.0);
        assert_eq!(*extreme.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*extreme.get_pixel(1, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn contrast_fixed_point_is_uniform_image() {
        let original = RgbImage::from_pixel(4, 4, Rgb([90, 120, 150]));
        let mut img = original.clone();
        // Every pixel equals the mean, so any factor leaves it unchanged.
        apply_contrast(&mut img, 3.0);
        assert_eq!(img, original);
    }

    #[test]
    fn same_seed_same_decisions() {
        let pipeline = TransformPipeline {
            flip_horizontal_prob: 0.5,
            contrast_jitter: 0.5,
        };
        let run = |seed: u64| -> Vec<RgbImage> {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| {
                    let mut img = gradient_image(8, 8);
                    pipeline.apply(&mut img, AugMode::Train, &mut rng);
                    img
                })
                .collect()
        };
        assert_eq!(run(31415), run(31415));
    }
}
