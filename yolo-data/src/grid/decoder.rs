use super::{CLASS_OFFSET, CONFIDENCE};
use crate::{common::*, config::DatasetConfig, DataError};

/// Rebuilds boxes from a grid label.
///
/// Boxes that lost their cell at encoding time cannot be recovered.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    image_size: usize,
    grid_size: usize,
    num_classes: usize,
}

impl GridDecoder {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            image_size: config.image_size.get(),
            grid_size: config.grid_size.get(),
            num_classes: config.num_classes(),
        }
    }

    /// Decode the occupied cells in row-major order into boxes in pixel
    /// units of the `R x R` image.
    ///
    /// The class is the first class channel holding the largest value.
    pub fn decode(&self, label: ArrayView3<'_, f32>) -> Result<Vec<BoxLabel>> {
        let Self {
            image_size,
            grid_size,
            num_classes,
        } = *self;
        let expect = [grid_size, grid_size, CLASS_OFFSET + num_classes];
        ensure!(
            label.shape() == &expect[..],
            DataError::Format(format!(
                "expect grid label of shape {:?}, but get {:?}",
                expect,
                label.shape()
            ))
        );
        let image_size = image_size as f32;

        let mut boxes = vec![];

        for row in 0..grid_size {
            for col in 0..grid_size {
                let cell = label.slice(s![row, col, ..]);
                if cell[CONFIDENCE] != 1.0 {
                    continue;
                }

                let class = cell
                    .slice(s![CLASS_OFFSET..])
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best, max), (index, &value)| {
                        if value > max {
                            (index, value)
                        } else {
                            (best, max)
                        }
                    })
                    .0;

                let [cx, cy, w, h] = [cell[1], cell[2], cell[3], cell[4]].map(|v| v * image_size);
                let rect = TLBR::try_from_cycxhw([cy, cx, h, w]).with_context(|| {
                    format!("cell ({}, {}) holds an invalid box size", row, col)
                })?;
                boxes.push(BoxLabel { rect, class });
            }
        }

        Ok(boxes)
    }
}
