//! Joint augmentation and resizing of an image and its boxes.

use super::{AugmentPolicy, RealizedAugment};
use crate::{
    common::*,
    config::{Config, DegeneratePolicy},
    dataset::DataRecord,
    DataError,
};
use image::imageops;

/// An image resized to the network input size with boxes in its pixel units.
#[derive(Debug, Clone)]
pub struct GeometryOutput {
    pub image: RgbImage,
    pub boxes: Vec<BoxLabel>,
}

/// Applies the optional augmentation and the mandatory resize.
///
/// The same [RealizedAugment] drives both the image and every box, so the
/// image content and the box coordinates always agree.
#[derive(Debug, Clone)]
pub struct GeometryPipeline {
    image_size: u32,
    policy: Option<AugmentPolicy>,
    degenerate_boxes: DegeneratePolicy,
}

impl GeometryPipeline {
    /// Build the pipeline from the dataset and augmentation sections.
    ///
    /// The augmentation policy is validated here since a deserialized
    /// [Config] may not have gone through [Config::validate].
    pub fn new(config: &Config) -> Result<Self> {
        let Config {
            dataset, augment, ..
        } = config;
        augment
            .policy
            .validate()
            .map_err(|err| DataError::Validation(format!("{:#}", err)))?;

        Ok(Self {
            image_size: dataset.image_size.get() as u32,
            policy: augment.enabled.then(|| augment.policy.clone()),
            degenerate_boxes: augment.degenerate_boxes,
        })
    }

    /// Run the pipeline on a decoded record with one random draw from `rng`.
    ///
    /// No random numbers are consumed when augmentation is disabled.
    pub fn process<R>(&self, record: &DataRecord, rng: &mut R) -> Result<GeometryOutput>
    where
        R: Rng,
    {
        let DataRecord {
            filename,
            image,
            boxes,
        } = record;

        let boxes = self.sanitize(filename, boxes)?;
        let (width, height) = image.dimensions();
        ensure!(
            width > 0 && height > 0,
            DataError::Format(format!("image '{}' is empty", filename))
        );
        let realized = self.sample(rng, width, height);
        trace!("realized augmentation for '{}': {:?}", filename, realized);

        let num_input = boxes.len();
        let output = self.apply(image, boxes, &realized)?;
        if output.boxes.len() < num_input {
            debug!(
                "{} of {} boxes in '{}' fell outside the image",
                num_input - output.boxes.len(),
                num_input,
                filename
            );
        }
        Ok(output)
    }

    /// Draw one realization of the augmentation policy.
    pub fn sample<R>(&self, rng: &mut R, width: u32, height: u32) -> RealizedAugment
    where
        R: Rng,
    {
        match &self.policy {
            Some(policy) => policy.sample(rng, width, height),
            None => RealizedAugment::default(),
        }
    }

    /// Apply a realized augmentation and then the resize.
    ///
    /// Boxes that fall fully outside the image after a geometric step are
    /// removed and the others are clipped to the image.
    pub fn apply(
        &self,
        image: &RgbImage,
        boxes: Vec<BoxLabel>,
        realized: &RealizedAugment,
    ) -> Result<GeometryOutput> {
        let mut image = image.clone();
        let mut boxes = boxes;

        for step in &realized.steps {
            let (width, height) = image.dimensions();
            if let Some((transform, [new_w, new_h])) = step.geometry(width, height) {
                boxes = boxes.iter().map(|label| &transform * label).collect();
                boxes = clip_boxes(&boxes, new_w, new_h)?;
            }
            image = step.apply_image(&image);
        }

        let (width, height) = image.dimensions();
        let size = self.image_size;
        let transform = Transform::from_sizes_exact(
            &HW::try_from_hw([height as f32, width as f32])?,
            &HW::try_from_hw([size as f32, size as f32])?,
        );
        let image = imageops::resize(&image, size, size, FilterType::CatmullRom);
        let boxes: Vec<_> = boxes.iter().map(|label| &transform * label).collect();
        let boxes = clip_boxes(&boxes, size, size)?;

        Ok(GeometryOutput { image, boxes })
    }

    /// Check raw boxes under the configured degenerate box policy.
    pub fn sanitize(&self, filename: &str, boxes: &[RawBoxLabel]) -> Result<Vec<BoxLabel>> {
        let mut output = Vec::with_capacity(boxes.len());

        for (index, raw) in boxes.iter().enumerate() {
            match TLBR::try_from(&raw.rect) {
                Ok(rect) => output.push(BoxLabel {
                    rect,
                    class: raw.class,
                }),
                Err(err) => match self.degenerate_boxes {
                    DegeneratePolicy::Drop => {
                        warn!(
                            "drop degenerate box {} {:?} in '{}': {}",
                            index, raw.rect, filename, err
                        );
                    }
                    DegeneratePolicy::Reject => {
                        bail!(DataError::DegenerateBox {
                            filename: filename.to_string(),
                            index,
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }

        Ok(output)
    }
}

fn clip_boxes(boxes: &[BoxLabel], width: u32, height: u32) -> Result<Vec<BoxLabel>> {
    let size = HW::try_from_hw([height as f32, width as f32])?;
    Ok(boxes.iter().filter_map(|label| label.clip(&size)).collect())
}
