use crate::{
    common::*,
    config::Config,
    grid::GridEncoder,
    processor::GeometryPipeline,
    record::{decode_record, SerializedRecord},
};

/// One training sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub filename: String,
    /// The `[R, R, 3]` RGB image.
    pub image: Array3<u8>,
    /// The `[S, S, 5 + C]` grid label.
    pub label: Array3<f32>,
}

impl Sample {
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let (height, width, _) = self.image.dim();
        let pixels: Vec<u8> = self.image.iter().copied().collect();
        RgbImage::from_raw(width as u32, height as u32, pixels)
            .ok_or_else(|| format_err!("the image of '{}' is not RGB", self.filename))
    }
}

/// A batch of samples stacked along a new leading axis.
#[derive(Debug, Clone)]
pub struct Batch {
    pub filenames: Vec<String>,
    /// The `[B, R, R, 3]` images.
    pub images: Array4<u8>,
    /// The `[B, S, S, 5 + C]` grid labels.
    pub labels: Array4<f32>,
}

impl Batch {
    pub fn from_samples(samples: &[Sample]) -> Result<Self> {
        ensure!(!samples.is_empty(), "cannot build a batch from zero samples");

        let filenames = samples
            .iter()
            .map(|sample| sample.filename.clone())
            .collect();
        let images = samples.iter().map(|sample| sample.image.view()).collect_vec();
        let labels = samples.iter().map(|sample| sample.label.view()).collect_vec();
        let images = ndarray::stack(Axis(0), &images)?;
        let labels = ndarray::stack(Axis(0), &labels)?;

        Ok(Self {
            filenames,
            images,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Copy the `index`-th sample out of the batch.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        let filename = self.filenames.get(index)?.clone();
        Some(Sample {
            filename,
            image: self.images.index_axis(Axis(0), index).to_owned(),
            label: self.labels.index_axis(Axis(0), index).to_owned(),
        })
    }
}

/// Turns a serialized record into a sample: decode, augment, resize and
/// encode.
#[derive(Debug, Clone)]
pub struct SampleProcessor {
    pipeline: GeometryPipeline,
    encoder: GridEncoder,
    seed: Option<u64>,
}

impl SampleProcessor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            pipeline: GeometryPipeline::new(config)?,
            encoder: GridEncoder::new(&config.dataset),
            seed: config.stream.seed,
        })
    }

    /// The random generator for the sample at `index` of the stream.
    pub fn rng(&self, index: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(mix_seed(seed, index)),
            None => StdRng::from_entropy(),
        }
    }

    pub fn process(&self, index: u64, record: &SerializedRecord) -> Result<Sample> {
        let record = decode_record(record)?;
        let mut rng = self.rng(index);
        let output = self
            .pipeline
            .process(&record, &mut rng)
            .with_context(|| format!("failed to process '{}'", record.filename))?;
        let encoded = self
            .encoder
            .encode(&output.boxes)
            .with_context(|| format!("failed to encode labels of '{}'", record.filename))?;

        let (width, height) = output.image.dimensions();
        let image = Array3::from_shape_vec(
            (height as usize, width as usize, 3),
            output.image.into_raw(),
        )?;

        Ok(Sample {
            filename: record.filename,
            image,
            label: encoded.label,
        })
    }
}

/// Combine a seed and a sample index into a new seed (splitmix64).
fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
