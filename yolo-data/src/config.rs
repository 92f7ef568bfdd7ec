//! Dataset pipeline configuration format.

use crate::{common::*, processor::AugmentPolicy};

pub use augment::*;
pub use dataset::*;
pub use stream::*;

/// The 20 Pascal VOC categories in class index order.
pub const VOC_CLASSES: [&str; 20] = [
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// The main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub augment: AugmentConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| crate::DataError::io(path, err))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.dataset.validate()?;
        self.augment.policy.validate()?;
        Ok(())
    }
}

mod dataset {
    use super::*;

    /// Class vocabulary and tensor geometry.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// Category names. The position of a name is its class index.
        #[serde(
            default = "default_classes",
            deserialize_with = "deserialize_classes"
        )]
        pub classes: IndexSet<String>,
        /// The side length R of the square network input in pixels.
        #[serde(default = "default_image_size")]
        pub image_size: NonZeroUsize,
        /// The number of grid cells S along each side.
        #[serde(default = "default_grid_size")]
        pub grid_size: NonZeroUsize,
    }

    impl DatasetConfig {
        pub fn num_classes(&self) -> usize {
            self.classes.len()
        }

        /// Per-cell depth of a grid label, `5 + C`.
        pub fn label_depth(&self) -> usize {
            5 + self.num_classes()
        }

        pub fn validate(&self) -> Result<()> {
            ensure!(!self.classes.is_empty(), "the class list must not be empty");
            ensure!(
                self.grid_size.get() <= self.image_size.get(),
                "grid_size {} must not exceed image_size {}",
                self.grid_size,
                self.image_size
            );
            Ok(())
        }
    }

    impl Default for DatasetConfig {
        fn default() -> Self {
            Self {
                classes: default_classes(),
                image_size: default_image_size(),
                grid_size: default_grid_size(),
            }
        }
    }

    fn default_classes() -> IndexSet<String> {
        VOC_CLASSES.iter().map(|name| name.to_string()).collect()
    }

    fn default_image_size() -> NonZeroUsize {
        NonZeroUsize::new(448).unwrap()
    }

    fn default_grid_size() -> NonZeroUsize {
        NonZeroUsize::new(7).unwrap()
    }

    fn deserialize_classes<'de, D>(deserializer: D) -> Result<IndexSet<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        let classes: IndexSet<_> = names.iter().cloned().collect();
        if classes.len() != names.len() {
            return Err(D::Error::custom("duplicated class names found"));
        }
        Ok(classes)
    }
}

mod augment {
    use super::*;

    /// What to do with boxes whose coordinates are inverted or non-finite.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DegeneratePolicy {
        /// Remove the box and keep the rest of the record.
        Drop,
        /// Fail the whole record.
        Reject,
    }

    impl Default for DegeneratePolicy {
        fn default() -> Self {
            Self::Drop
        }
    }

    /// Data augmentation options.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AugmentConfig {
        /// If set, apply the random augmentation policy before resizing.
        #[serde(default)]
        pub enabled: bool,
        #[serde(default)]
        pub degenerate_boxes: DegeneratePolicy,
        /// The ordered list of augmentation steps.
        #[serde(default)]
        pub policy: AugmentPolicy,
    }
}

mod stream {
    use super::*;

    /// Training sample stream options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StreamConfig {
        #[serde(default = "default_batch_size")]
        pub batch_size: NonZeroUsize,
        /// The capacity of the shuffle buffer.
        #[serde(default = "default_shuffle_buffer")]
        pub shuffle_buffer: NonZeroUsize,
        /// The number of preprocessing workers. It defaults to the number of CPUs.
        #[serde(default)]
        pub num_workers: Option<NonZeroUsize>,
        /// The capacity of the channels between stages. It defaults to twice
        /// the number of workers.
        #[serde(default)]
        pub channel_size: Option<NonZeroUsize>,
        /// If set, every sample's random draw is derived from this seed and
        /// the sample index.
        #[serde(default)]
        pub seed: Option<u64>,
    }

    impl StreamConfig {
        pub fn num_workers(&self) -> usize {
            self.num_workers
                .map(NonZeroUsize::get)
                .unwrap_or_else(num_cpus::get)
                .max(1)
        }

        pub fn channel_size(&self) -> usize {
            self.channel_size
                .map(NonZeroUsize::get)
                .unwrap_or_else(|| self.num_workers() * 2)
        }
    }

    impl Default for StreamConfig {
        fn default() -> Self {
            Self {
                batch_size: default_batch_size(),
                shuffle_buffer: default_shuffle_buffer(),
                num_workers: None,
                channel_size: None,
                seed: None,
            }
        }
    }

    fn default_batch_size() -> NonZeroUsize {
        NonZeroUsize::new(32).unwrap()
    }

    fn default_shuffle_buffer() -> NonZeroUsize {
        NonZeroUsize::new(100).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = json5::from_str("{}").unwrap();
        assert_eq!(config.dataset.num_classes(), 20);
        assert_eq!(config.dataset.label_depth(), 25);
        assert_eq!(config.dataset.image_size.get(), 448);
        assert_eq!(config.dataset.grid_size.get(), 7);
        assert!(!config.augment.enabled);
        assert_eq!(config.augment.degenerate_boxes, DegeneratePolicy::Drop);
        assert_eq!(config.augment.policy.steps.len(), 5);
        assert_eq!(config.stream.shuffle_buffer.get(), 100);
        config.validate().unwrap();
    }

    #[test]
    fn duplicated_classes_are_rejected() {
        let result = json5::from_str::<Config>(r#"{ dataset: { classes: ["cat", "cat"] } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn class_order_is_index_order() {
        let config: Config =
            json5::from_str(r#"{ dataset: { classes: ["dog", "cat"], grid_size: 4 } }"#).unwrap();
        assert_eq!(config.dataset.classes.get_index_of("cat"), Some(1));
        assert_eq!(config.dataset.label_depth(), 7);
        assert_eq!(config.dataset.grid_size.get(), 4);
    }
}
