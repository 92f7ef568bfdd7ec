//! The data-described augmentation policy.
//!
//! A policy is an ordered list of [AugmentStep] descriptors. Sampling a
//! policy draws every random parameter at once and yields a
//! [RealizedAugment], which is then applied to the image and to its boxes
//! alike.

use crate::{common::*, ratio::Ratio};
use image::imageops;

/// Blur kernels below this sigma leave the image unchanged.
const MIN_BLUR_SIGMA: f32 = 0.01;

/// One augmentation step and the distribution of its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AugmentStep {
    /// Mirror the image upside down with probability `prob`.
    VerticalFlip { prob: Ratio },
    /// Mirror the image left to right with probability `prob`.
    HorizontalFlip { prob: Ratio },
    /// Cut a fraction drawn from `[min_fraction, max_fraction]` off each side,
    /// independently per side.
    Crop {
        min_fraction: Ratio,
        max_fraction: Ratio,
    },
    /// Gaussian blur with probability `prob` and sigma drawn from
    /// `[min_sigma, max_sigma]`. Boxes are not moved.
    GaussianBlur {
        prob: Ratio,
        min_sigma: R64,
        max_sigma: R64,
    },
    /// Scale the distance of every channel value to 128 by a factor drawn
    /// from `[min_factor, max_factor]`. Boxes are not moved.
    ContrastNormalization { min_factor: R64, max_factor: R64 },
}

impl AugmentStep {
    fn validate(&self) -> Result<()> {
        match *self {
            Self::VerticalFlip { .. } | Self::HorizontalFlip { .. } => {}
            Self::Crop {
                min_fraction,
                max_fraction,
            } => {
                ensure!(
                    min_fraction <= max_fraction,
                    "crop min_fraction must not exceed max_fraction"
                );
                ensure!(
                    max_fraction.to_f64() < 0.5,
                    "crop max_fraction must be less than 0.5"
                );
            }
            Self::GaussianBlur {
                min_sigma,
                max_sigma,
                ..
            } => {
                ensure!(min_sigma >= 0.0, "blur min_sigma must be non-negative");
                ensure!(
                    min_sigma <= max_sigma,
                    "blur min_sigma must not exceed max_sigma"
                );
            }
            Self::ContrastNormalization {
                min_factor,
                max_factor,
            } => {
                ensure!(min_factor >= 0.0, "contrast min_factor must be non-negative");
                ensure!(
                    min_factor <= max_factor,
                    "contrast min_factor must not exceed max_factor"
                );
            }
        }
        Ok(())
    }
}

/// The ordered augmentation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentPolicy {
    pub steps: Vec<AugmentStep>,
}

impl Default for AugmentPolicy {
    /// Vertical flip, horizontal flip, crop, blur and contrast, in that order.
    fn default() -> Self {
        let half = Ratio::clamped(r64(0.5));

        Self {
            steps: vec![
                AugmentStep::VerticalFlip { prob: half },
                AugmentStep::HorizontalFlip { prob: half },
                AugmentStep::Crop {
                    min_fraction: Ratio::clamped(r64(0.0)),
                    max_fraction: Ratio::clamped(r64(0.1)),
                },
                AugmentStep::GaussianBlur {
                    prob: half,
                    min_sigma: r64(0.0),
                    max_sigma: r64(0.5),
                },
                AugmentStep::ContrastNormalization {
                    min_factor: r64(0.75),
                    max_factor: r64(1.5),
                },
            ],
        }
    }
}

impl AugmentPolicy {
    pub fn validate(&self) -> Result<()> {
        self.steps
            .iter()
            .enumerate()
            .try_for_each(|(index, step)| {
                step.validate()
                    .with_context(|| format!("invalid augmentation step {}", index))
            })
    }

    /// Draw the parameters of every step for an image of `width` x `height`.
    ///
    /// Steps whose gate fails are left out of the result.
    pub fn sample<R>(&self, rng: &mut R, width: u32, height: u32) -> RealizedAugment
    where
        R: Rng,
    {
        let (mut width, mut height) = (width, height);

        let steps: Vec<_> = self
            .steps
            .iter()
            .filter_map(|step| match *step {
                AugmentStep::VerticalFlip { prob } => {
                    rng.gen_bool(prob.to_f64()).then(|| RealizedStep::VerticalFlip)
                }
                AugmentStep::HorizontalFlip { prob } => rng
                    .gen_bool(prob.to_f64())
                    .then(|| RealizedStep::HorizontalFlip),
                AugmentStep::Crop {
                    min_fraction,
                    max_fraction,
                } => {
                    let range = min_fraction.to_f64()..=max_fraction.to_f64();
                    let top = rng.gen_range(range.clone());
                    let right = rng.gen_range(range.clone());
                    let bottom = rng.gen_range(range.clone());
                    let left = rng.gen_range(range);

                    let (top, bottom) = fit_crop(
                        (top * height as f64).round() as u32,
                        (bottom * height as f64).round() as u32,
                        height,
                    );
                    let (left, right) = fit_crop(
                        (left * width as f64).round() as u32,
                        (right * width as f64).round() as u32,
                        width,
                    );
                    width -= left + right;
                    height -= top + bottom;

                    Some(RealizedStep::Crop {
                        top,
                        right,
                        bottom,
                        left,
                    })
                }
                AugmentStep::GaussianBlur {
                    prob,
                    min_sigma,
                    max_sigma,
                } => rng.gen_bool(prob.to_f64()).then(|| {
                    let sigma = rng.gen_range(min_sigma.raw()..=max_sigma.raw());
                    RealizedStep::GaussianBlur {
                        sigma: sigma as f32,
                    }
                }),
                AugmentStep::ContrastNormalization {
                    min_factor,
                    max_factor,
                } => {
                    let factor = rng.gen_range(min_factor.raw()..=max_factor.raw());
                    Some(RealizedStep::ContrastNormalization {
                        factor: factor as f32,
                    })
                }
            })
            .collect();

        RealizedAugment { steps }
    }
}

/// An augmentation step with all of its random parameters fixed.
#[derive(Debug, Clone, PartialEq)]
pub enum RealizedStep {
    VerticalFlip,
    HorizontalFlip,
    /// Pixels removed from each side.
    Crop {
        top: u32,
        right: u32,
        bottom: u32,
        left: u32,
    },
    GaussianBlur {
        sigma: f32,
    },
    ContrastNormalization {
        factor: f32,
    },
}

impl RealizedStep {
    /// The transform this step applies to box coordinates of an image sized
    /// `width` x `height`, together with the output image size. Returns
    /// `None` for steps that leave pixel positions untouched.
    pub fn geometry(&self, width: u32, height: u32) -> Option<(Transform<f32>, [u32; 2])> {
        match *self {
            Self::VerticalFlip => Some((Transform::vertical_flip(height as f32), [width, height])),
            Self::HorizontalFlip => {
                Some((Transform::horizontal_flip(width as f32), [width, height]))
            }
            Self::Crop {
                top,
                right,
                bottom,
                left,
            } => {
                let transform = Transform::translation(-(top as f32), -(left as f32));
                Some((transform, [width - left - right, height - top - bottom]))
            }
            Self::GaussianBlur { .. } | Self::ContrastNormalization { .. } => None,
        }
    }

    pub fn apply_image(&self, image: &RgbImage) -> RgbImage {
        match *self {
            Self::VerticalFlip => imageops::flip_vertical(image),
            Self::HorizontalFlip => imageops::flip_horizontal(image),
            Self::Crop {
                top,
                right,
                bottom,
                left,
            } => {
                let (width, height) = image.dimensions();
                imageops::crop_imm(
                    image,
                    left,
                    top,
                    width - left - right,
                    height - top - bottom,
                )
                .to_image()
            }
            Self::GaussianBlur { sigma } => {
                if sigma < MIN_BLUR_SIGMA {
                    image.clone()
                } else {
                    imageops::blur(image, sigma)
                }
            }
            Self::ContrastNormalization { factor } => {
                let table: Vec<u8> = (0..=255u8)
                    .map(|value| {
                        (128.0 + factor * (value as f32 - 128.0))
                            .round()
                            .clamp(0.0, 255.0) as u8
                    })
                    .collect();
                let mut output = image.clone();
                for pixel in output.pixels_mut() {
                    for value in pixel.0.iter_mut() {
                        *value = table[*value as usize];
                    }
                }
                output
            }
        }
    }
}

/// The outcome of one random draw of an [AugmentPolicy].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RealizedAugment {
    pub steps: Vec<RealizedStep>,
}

/// Shrink a pair of opposite crop amounts so that at least one pixel of
/// `len` survives.
fn fit_crop(first: u32, second: u32, len: u32) -> (u32, u32) {
    let max_total = len.saturating_sub(1);
    let total = first + second;
    if total <= max_total {
        return (first, second);
    }
    let first = (first as u64 * max_total as u64 / total as u64) as u32;
    (first, max_total - first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let policy = AugmentPolicy::default();
        policy.validate().unwrap();
        assert!(matches!(policy.steps[0], AugmentStep::VerticalFlip { .. }));
        assert!(matches!(
            policy.steps[4],
            AugmentStep::ContrastNormalization { .. }
        ));
    }

    #[test]
    fn invalid_crop_range() {
        let policy = AugmentPolicy {
            steps: vec![AugmentStep::Crop {
                min_fraction: Ratio::try_from(0.2).unwrap(),
                max_fraction: Ratio::try_from(0.1).unwrap(),
            }],
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn same_seed_same_draw() {
        let policy = AugmentPolicy::default();
        let lhs = policy.sample(&mut StdRng::seed_from_u64(7), 500, 375);
        let rhs = policy.sample(&mut StdRng::seed_from_u64(7), 500, 375);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn sampled_crop_within_range() {
        let policy = AugmentPolicy::default();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let realized = policy.sample(&mut rng, 500, 375);
            let crop = realized.steps.iter().find_map(|step| match *step {
                RealizedStep::Crop {
                    top,
                    right,
                    bottom,
                    left,
                } => Some([top, right, bottom, left]),
                _ => None,
            });
            let [top, right, bottom, left] = crop.unwrap();
            assert!(top <= 38 && bottom <= 38);
            assert!(left <= 50 && right <= 50);
        }
    }

    #[test]
    fn policy_from_json5() {
        let text = r#"{
            steps: [
                { kind: "HorizontalFlip", prob: 1.0 },
                { kind: "GaussianBlur", prob: 0.0, min_sigma: 0.0, max_sigma: 0.5 },
            ]
        }"#;
        let policy: AugmentPolicy = json5::from_str(text).unwrap();
        let realized = policy.sample(&mut StdRng::seed_from_u64(0), 10, 10);
        assert_eq!(realized.steps, vec![RealizedStep::HorizontalFlip]);
    }

    #[test]
    fn crop_keeps_one_pixel() {
        assert_eq!(fit_crop(3, 2, 10), (3, 2));
        assert_eq!(fit_crop(5, 5, 10), (4, 5));
        assert_eq!(fit_crop(1, 1, 1), (0, 0));
    }

    #[test]
    fn contrast_identity_and_clamp() {
        let image = RgbImage::from_raw(2, 1, vec![0, 128, 255, 10, 20, 30]).unwrap();
        let same = RealizedStep::ContrastNormalization { factor: 1.0 }.apply_image(&image);
        assert_eq!(same, image);

        let strong = RealizedStep::ContrastNormalization { factor: 2.0 }.apply_image(&image);
        assert_eq!(strong.as_raw()[..3], [0, 128, 255]);
    }

    #[test]
    fn tiny_blur_is_noop() {
        let image = RgbImage::from_raw(2, 1, vec![0, 128, 255, 10, 20, 30]).unwrap();
        let blurred = RealizedStep::GaussianBlur { sigma: 0.001 }.apply_image(&image);
        assert_eq!(blurred, image);
    }
}
