use super::{CLASS_OFFSET, CONFIDENCE};
use crate::{common::*, config::DatasetConfig, DataError};

/// The encoded grid label of one sample.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    /// The `[S, S, 5 + C]` label indexed by `[row, col, channel]`.
    pub label: Array3<f32>,
    /// The number of boxes dropped because an earlier box owns their cell.
    pub num_skipped: usize,
}

/// Maps boxes in the resized image to a grid label.
#[derive(Debug, Clone)]
pub struct GridEncoder {
    image_size: usize,
    grid_size: usize,
    num_classes: usize,
}

impl GridEncoder {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            image_size: config.image_size.get(),
            grid_size: config.grid_size.get(),
            num_classes: config.num_classes(),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        [
            self.grid_size,
            self.grid_size,
            CLASS_OFFSET + self.num_classes,
        ]
    }

    /// Encode boxes given in pixel units of the `R x R` image.
    ///
    /// Boxes are visited in list order. A box whose center falls into a cell
    /// that is already claimed is skipped.
    pub fn encode(&self, boxes: &[BoxLabel]) -> Result<EncodeOutput> {
        let Self {
            image_size,
            grid_size,
            num_classes,
        } = *self;
        let image_size = image_size as f32;
        let mut label = Array3::<f32>::zeros(self.shape());
        let mut num_skipped = 0;

        for (index, object) in boxes.iter().enumerate() {
            let BoxLabel { rect, class } = object;
            ensure!(
                *class < num_classes,
                DataError::Validation(format!(
                    "box {} has class id {}, but only {} classes are defined",
                    index, class, num_classes
                ))
            );

            let [cy, cx, h, w] = rect.cycxhw();
            let row = cell_index(cy / image_size, grid_size);
            let col = cell_index(cx / image_size, grid_size);

            let mut cell = label.slice_mut(s![row, col, ..]);
            if cell[CONFIDENCE] == 1.0 {
                trace!(
                    "skip box {} because cell ({}, {}) is already claimed",
                    index,
                    row,
                    col
                );
                num_skipped += 1;
                continue;
            }

            cell[CONFIDENCE] = 1.0;
            cell[1] = cx / image_size;
            cell[2] = cy / image_size;
            cell[3] = w / image_size;
            cell[4] = h / image_size;
            cell[CLASS_OFFSET + class] = 1.0;
        }

        if num_skipped > 0 {
            debug!(
                "{} of {} boxes lost their cell to an earlier box",
                num_skipped,
                boxes.len()
            );
        }

        Ok(EncodeOutput { label, num_skipped })
    }
}

/// `floor(ratio * grid_size)` clamped into `[0, grid_size - 1]`.
fn cell_index(ratio: f32, grid_size: usize) -> usize {
    let index = (ratio * grid_size as f32).floor();
    if index <= 0.0 {
        0
    } else {
        (index as usize).min(grid_size - 1)
    }
}
