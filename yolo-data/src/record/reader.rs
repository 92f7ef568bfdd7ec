use super::{SerializedRecord, MAGIC};
use crate::{common::*, dataset::DataRecord, DataError};
use std::fs::File;

/// Iterates over the records of a record stream in stored order.
///
/// The iteration stops after the first error.
#[derive(Debug)]
pub struct RecordStream<R>
where
    R: Read,
{
    reader: R,
    done: bool,
}

impl RecordStream<BufReader<File>> {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| DataError::io(path, err))?;
        Self::new(BufReader::new(file))
            .with_context(|| format!("failed to open record file '{}'", path.display()))
    }
}

impl<R> RecordStream<R>
where
    R: Read,
{
    /// Wraps a reader positioned at the start of a record stream.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; MAGIC.len()];
        let len = read_up_to(&mut reader, &mut magic)?;
        ensure!(
            len == MAGIC.len() && magic == MAGIC,
            DataError::Format("not a record stream: the header does not match".into())
        );

        Ok(Self {
            reader,
            done: false,
        })
    }

    fn next_record(&mut self) -> Result<Option<SerializedRecord>> {
        let mut header = [0u8; 8];
        match read_up_to(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            8 => {}
            _ => bail!(DataError::Format("truncated record header".into())),
        }
        let payload_len = u64::from_le_bytes(header);

        // read through take() so that a corrupt length does not allocate
        let mut payload = vec![];
        (&mut self.reader)
            .take(payload_len)
            .read_to_end(&mut payload)
            .map_err(|err| DataError::io("<record stream>", err))?;
        ensure!(
            payload.len() as u64 == payload_len,
            DataError::Format(format!(
                "truncated record: expect {} bytes but found {}",
                payload_len,
                payload.len()
            ))
        );

        let record = SerializedRecord::decode_payload(&payload)?;
        Ok(Some(record))
    }
}

impl<R> Iterator for RecordStream<R>
where
    R: Read,
{
    type Item = Result<SerializedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
        }
        result
    }
}

/// Loads all records of a record file into memory.
pub fn load_records<P>(path: P) -> Result<Vec<SerializedRecord>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    RecordStream::open(path)?
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("failed to read record file '{}'", path.display()))
}

/// Decodes the image and the boxes of a serialized record.
pub fn decode_record(record: &SerializedRecord) -> Result<DataRecord> {
    let filename = record.filename_lossy();
    let boxes = decode_labels(&record.label)
        .with_context(|| format!("invalid labels in record '{}'", filename))?;
    let image = image::load_from_memory(&record.image)
        .map_err(|source| DataError::Decode {
            filename: filename.clone(),
            source,
        })?
        .to_rgb8();

    Ok(DataRecord {
        filename,
        image,
        boxes,
    })
}

/// Rebuilds boxes from flattened `(x1, y1, x2, y2, class)` rows.
///
/// The coordinate order is not checked here.
pub fn decode_labels(label: &[f32]) -> Result<Vec<RawBoxLabel>> {
    ensure!(
        label.len() % 5 == 0,
        DataError::Format(format!(
            "the label length {} is not a multiple of 5",
            label.len()
        ))
    );

    label
        .chunks_exact(5)
        .enumerate()
        .map(|(index, row)| {
            let (x1, y1, x2, y2, class) = (row[0], row[1], row[2], row[3], row[4]);
            ensure!(
                class.is_finite() && class >= 0.0 && class.fract() == 0.0,
                DataError::Format(format!("box {} has invalid class id {}", index, class))
            );

            Ok(RawBoxLabel {
                rect: TLBR_ {
                    t: y1,
                    l: x1,
                    b: y2,
                    r: x2,
                },
                class: class as usize,
            })
        })
        .collect()
}

/// Fills `buf` until it is full or the reader reaches EOF, and returns the
/// number of bytes read.
fn read_up_to<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: Read,
{
    let mut len = 0;
    while len < buf.len() {
        match reader.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(DataError::io("<record stream>", err).into()),
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::AnnotatedImage, record::RecordWriter};
    use image::DynamicImage;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut bytes = vec![];
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn raw_box(x1: f32, y1: f32, x2: f32, y2: f32, class: usize) -> RawBoxLabel {
        RawBoxLabel {
            rect: TLBR_ {
                t: y1,
                l: x1,
                b: y2,
                r: x2,
            },
            class,
        }
    }

    fn write_stream(images: &[AnnotatedImage]) -> Vec<u8> {
        let mut writer = RecordWriter::new(vec![]).unwrap();
        images.iter().for_each(|image| writer.write(image).unwrap());
        writer.finish().unwrap()
    }

    #[test]
    fn record_round_trip() {
        let images = vec![
            AnnotatedImage {
                filename: "a.png".into(),
                image: png_bytes(16, 8),
                boxes: vec![
                    raw_box(1.5, 2.25, 10.0, 7.0, 0),
                    raw_box(0.0, 0.0, 16.0, 8.0, 19),
                ],
            },
            AnnotatedImage {
                filename: "b.png".into(),
                image: png_bytes(4, 4),
                boxes: vec![],
            },
        ];
        let bytes = write_stream(&images);

        let records: Vec<_> = RecordStream::new(Cursor::new(bytes))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);

        for (record, expect) in records.iter().zip(&images) {
            let decoded = decode_record(record).unwrap();
            assert_eq!(decoded.filename, expect.filename);
            assert_eq!(decoded.boxes, expect.boxes);
        }

        let first = decode_record(&records[0]).unwrap();
        assert_eq!(first.image.dimensions(), (16, 8));
        assert_eq!(first.image.get_pixel(3, 3), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn label_length_not_multiple_of_five() {
        let err = decode_labels(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Format(_))
        ));
    }

    #[test]
    fn fractional_or_negative_class() {
        assert!(decode_labels(&[0.0, 0.0, 1.0, 1.0, 2.5]).is_err());
        assert!(decode_labels(&[0.0, 0.0, 1.0, 1.0, -1.0]).is_err());
        assert!(decode_labels(&[0.0, 0.0, 1.0, 1.0, f32::NAN]).is_err());
    }

    #[test]
    fn inverted_boxes_are_kept_raw() {
        let boxes = decode_labels(&[10.0, 10.0, 5.0, 5.0, 1.0]).unwrap();
        assert_eq!(boxes, vec![raw_box(10.0, 10.0, 5.0, 5.0, 1)]);
    }

    #[test]
    fn garbage_image_bytes() {
        let record = SerializedRecord {
            filename: b"broken.jpg".to_vec(),
            image: vec![1, 2, 3, 4, 5],
            label: vec![],
        };
        let err = decode_record(&record).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Decode { .. })
        ));
    }

    #[test]
    fn bad_magic() {
        let err = RecordStream::new(Cursor::new(b"notarecordfile".to_vec())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Format(_))
        ));
    }

    #[test]
    fn truncated_stream() {
        let images = vec![AnnotatedImage {
            filename: "a.png".into(),
            image: png_bytes(2, 2),
            boxes: vec![raw_box(0.0, 0.0, 1.0, 1.0, 0)],
        }];
        let mut bytes = write_stream(&images);
        bytes.truncate(bytes.len() - 3);

        let mut stream = RecordStream::new(Cursor::new(bytes)).unwrap();
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Format(_))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn empty_stream() {
        let bytes = write_stream(&[]);
        assert_eq!(RecordStream::new(Cursor::new(bytes)).unwrap().count(), 0);
    }

    #[test]
    fn missing_file() {
        let err = load_records("/nonexistent/records/train.rec").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Io { .. })
        ));
    }
}
