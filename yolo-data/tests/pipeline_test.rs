use anyhow::Result;
use approx::assert_abs_diff_eq;
use bbox::prelude::*;
use image::{ImageOutputFormat, Rgb, RgbImage};
use std::{
    fs,
    io::Cursor,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use yolo_data::{
    config::Config,
    dataset::VocDataset,
    grid::GridDecoder,
    record::{decode_record, write_records, RecordStream, RecordWriter},
    stream::TrainingStream,
};

const ANNOTATION: &str = r#"
<annotation>
    <filename>000001.jpg</filename>
    <size><width>160</width><height>120</height><depth>3</depth></size>
    <object>
        <name>Dog</name>
        <bndbox><xmin>10</xmin><ymin>20</ymin><xmax>70</xmax><ymax>100</ymax></bndbox>
    </object>
    <object>
        <name>person</name>
        <bndbox><xmin>90</xmin><ymin>10</ymin><xmax>150</xmax><ymax>60</ymax></bndbox>
    </object>
</annotation>
"#;

/// Builds a one-image VOC tree under the system temp directory.
fn voc_dir(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("yolo-data-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("ImageSets").join("Main"))?;
    fs::create_dir_all(dir.join("JPEGImages"))?;
    fs::create_dir_all(dir.join("Annotations"))?;

    fs::write(dir.join("ImageSets").join("Main").join("train.txt"), "000001\n")?;
    fs::write(dir.join("Annotations").join("000001.xml"), ANNOTATION)?;
    RgbImage::from_pixel(160, 120, Rgb([90, 120, 150]))
        .save(dir.join("JPEGImages").join("000001.jpg"))?;
    Ok(dir)
}

fn plain_config() -> Config {
    let mut config: Config = json5::from_str("{ stream: { num_workers: 2, seed: 1 } }").unwrap();
    config.augment.enabled = false;
    config
}

#[test]
fn voc_to_grid_labels() -> Result<()> {
    let dir = voc_dir("voc-to-grid")?;
    let config = plain_config();

    let dataset = VocDataset::open(&config.dataset, &dir, "train")?;
    let record_file = dir.join("train.rec");
    let count = write_records(&record_file, dataset.iter())?;
    assert_eq!(count, 1);

    let records: Vec<_> = RecordStream::open(&record_file)?.collect::<Result<_>>()?;
    let record = decode_record(&records[0])?;
    assert_eq!(record.image.dimensions(), (160, 120));
    assert_eq!(record.boxes.len(), 2);
    assert_eq!(record.boxes[0].class, 11);
    assert_eq!(record.boxes[1].class, 14);

    let mut stream = TrainingStream::open(&config, &record_file)?;
    let sample = stream.next().unwrap()?;
    let boxes = GridDecoder::new(&config.dataset).decode(sample.label.view())?;
    assert_eq!(boxes.len(), 2);

    // 160x120 is stretched to 448x448
    let (sx, sy) = (448.0 / 160.0, 448.0 / 120.0);
    let dog = boxes.iter().find(|label| label.class == 11).unwrap();
    assert_abs_diff_eq!(dog.rect.l(), 10.0 * sx, epsilon = 1e-2);
    assert_abs_diff_eq!(dog.rect.t(), 20.0 * sy, epsilon = 1e-2);
    assert_abs_diff_eq!(dog.rect.r(), 70.0 * sx, epsilon = 1e-2);
    assert_abs_diff_eq!(dog.rect.b(), 100.0 * sy, epsilon = 1e-2);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn augmented_batches_from_memory() -> Result<()> {
    let mut config = plain_config();
    config.augment.enabled = true;

    let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 4, y as u8 * 5, 0]));
    let mut bytes = vec![];
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;

    let mut writer = RecordWriter::new(vec![])?;
    writer.write(&yolo_data::dataset::AnnotatedImage {
        filename: "memory.png".into(),
        image: bytes,
        boxes: yolo_data::record::decode_labels(&[8.0, 8.0, 40.0, 30.0, 3.0])?,
    })?;
    let stream_bytes = writer.finish()?;

    let records: Vec<_> = RecordStream::new(Cursor::new(stream_bytes))?.collect::<Result<_>>()?;
    let batches = TrainingStream::from_records(&config, records)?
        .batches(NonZeroUsize::new(4).unwrap());

    for batch in batches.take(2) {
        let batch = batch?;
        assert_eq!(batch.images.shape(), &[4, 448, 448, 3]);
        assert_eq!(batch.labels.shape(), &[4, 7, 7, 25]);

        // a single object claims at most one cell per sample
        let occupied = batch.labels.slice(ndarray::s![.., .., .., 0]).sum();
        assert!(occupied <= 4.0);
    }
    Ok(())
}

#[test]
fn missing_voc_split() {
    let result = VocDataset::open(
        &Config::default().dataset,
        Path::new("/nonexistent/VOC2012"),
        "train",
    );
    assert!(result.is_err());
}
