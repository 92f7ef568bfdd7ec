use super::AnnotatedImage;
use crate::{common::*, config::DatasetConfig, DataError};

/// A split of a Pascal VOC dataset directory.
///
/// The split file `ImageSets/Main/<split>.txt` lists the image ids. Each id
/// has an image `JPEGImages/<id>.jpg` and an annotation `Annotations/<id>.xml`.
#[derive(Debug, Clone)]
pub struct VocDataset {
    classes: IndexSet<String>,
    dataset_dir: PathBuf,
    ids: Vec<String>,
}

impl VocDataset {
    pub fn open<P>(config: &DatasetConfig, dataset_dir: P, split: &str) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dataset_dir = dataset_dir.as_ref().to_owned();
        let split_file = dataset_dir
            .join("ImageSets")
            .join("Main")
            .join(format!("{}.txt", split));
        let text = std::fs::read_to_string(&split_file)
            .map_err(|err| DataError::io(&split_file, err))?;
        let ids: Vec<_> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        info!(
            "found {} images in split '{}' of '{}'",
            ids.len(),
            split,
            dataset_dir.display()
        );

        Ok(Self {
            classes: config.classes.clone(),
            dataset_dir,
            ids,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load the image bytes and the annotation of one image id.
    pub fn load(&self, id: &str) -> Result<AnnotatedImage> {
        let image_file = self
            .dataset_dir
            .join("JPEGImages")
            .join(format!("{}.jpg", id));
        let annotation_file = self
            .dataset_dir
            .join("Annotations")
            .join(format!("{}.xml", id));

        let image = std::fs::read(&image_file).map_err(|err| DataError::io(&image_file, err))?;
        let xml = std::fs::read_to_string(&annotation_file)
            .map_err(|err| DataError::io(&annotation_file, err))?;
        let boxes = parse_annotation(&xml, &self.classes).with_context(|| {
            format!(
                "failed to parse annotation file '{}'",
                annotation_file.display()
            )
        })?;

        Ok(AnnotatedImage {
            filename: image_file.display().to_string(),
            image,
            boxes,
        })
    }

    /// Iterate over the images of the split in split file order.
    pub fn iter(&self) -> impl Iterator<Item = Result<AnnotatedImage>> + '_ {
        self.ids.iter().map(move |id| self.load(id))
    }
}

/// Extract the boxes of a VOC annotation document.
///
/// Category names are lowercased and trimmed, then mapped to their index in
/// `classes`. Unknown names are a validation error.
pub fn parse_annotation(xml: &str, classes: &IndexSet<String>) -> Result<Vec<RawBoxLabel>> {
    let annotation: xml::Annotation = serde_xml_rs::from_str(xml)?;

    annotation
        .object
        .iter()
        .map(|object| -> Result<_> {
            let name = object.name.trim().to_lowercase();
            let class = classes
                .get_index_of(&name)
                .ok_or_else(|| DataError::Validation(format!("unknown category '{}'", name)))?;
            let xml::BndBox {
                xmin,
                ymin,
                xmax,
                ymax,
            } = object.bndbox;

            Ok(RawBoxLabel {
                rect: TLBR_ {
                    t: ymin,
                    l: xmin,
                    b: ymax,
                    r: xmax,
                },
                class,
            })
        })
        .collect()
}

mod xml {
    use super::*;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Annotation {
        #[serde(default)]
        pub object: Vec<Object>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Object {
        pub name: String,
        pub bndbox: BndBox,
    }

    #[derive(Debug, Clone, Copy, Deserialize)]
    pub struct BndBox {
        pub xmin: f32,
        pub ymin: f32,
        pub xmax: f32,
        pub ymax: f32,
    }
}
