use super::{SerializedRecord, MAGIC};
use crate::{common::*, dataset::AnnotatedImage, DataError};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;

/// Appends records to a record stream.
///
/// The stream is flushed by [RecordWriter::finish]. If the writer is dropped
/// without calling `finish`, for example when an error is propagated by `?`,
/// the drop handler flushes it and logs any failure.
#[derive(Debug)]
pub struct RecordWriter<W>
where
    W: Write,
{
    path: PathBuf,
    writer: Option<BufWriter<W>>,
    count: usize,
}

impl RecordWriter<File> {
    /// Creates or truncates the file at `path` and writes the stream header.
    pub fn create<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| DataError::io(path, err))?;
        Self::with_path(file, path)
    }
}

impl<W> RecordWriter<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Result<Self> {
        Self::with_path(writer, "<stream>")
    }

    fn with_path(writer: W, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut writer = BufWriter::new(writer);
        writer
            .write_all(&MAGIC)
            .map_err(|err| DataError::io(&path, err))?;

        Ok(Self {
            path,
            writer: Some(writer),
            count: 0,
        })
    }

    /// The number of records written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn write(&mut self, image: &AnnotatedImage) -> Result<()> {
        self.write_record(&SerializedRecord::from(image))
    }

    pub fn write_record(&mut self, record: &SerializedRecord) -> Result<()> {
        let Self {
            path,
            writer,
            count,
        } = self;
        let writer = writer
            .as_mut()
            .ok_or_else(|| format_err!("the record writer is already closed"))?;

        let payload = record.encode_payload();
        writer
            .write_u64::<LittleEndian>(payload.len() as u64)
            .and_then(|()| writer.write_all(&payload))
            .map_err(|err| DataError::io(&*path, err))?;
        *count += 1;

        trace!(
            "wrote record '{}' with {} boxes to '{}'",
            record.filename_lossy(),
            record.num_boxes(),
            path.display()
        );
        Ok(())
    }

    /// Flushes the stream and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| format_err!("the record writer is already closed"))?;
        let inner = writer
            .into_inner()
            .map_err(|err| DataError::io(&self.path, err.into_error()))?;
        debug!(
            "closed record stream '{}' after {} records",
            self.path.display(),
            self.count
        );
        Ok(inner)
    }
}

impl<W> Drop for RecordWriter<W>
where
    W: Write,
{
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                warn!(
                    "failed to flush record stream '{}': {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}

/// Writes all images to a new record file at `path` and returns the number
/// of written records.
///
/// The first error stops the writing. Records written before the error are
/// flushed to the file.
pub fn write_records<P, I>(path: P, images: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Result<AnnotatedImage>>,
{
    let path = path.as_ref();
    let mut writer = RecordWriter::create(path)?;

    for image in images {
        let image = image?;
        writer
            .write(&image)
            .with_context(|| format!("failed to write record '{}'", image.filename))?;
    }

    let count = writer.count();
    writer.finish()?;
    info!("wrote {} records to '{}'", count, path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> AnnotatedImage {
        AnnotatedImage {
            filename: "000001.jpg".into(),
            image: vec![0xff, 0xd8, 0xff],
            boxes: vec![RawBoxLabel {
                rect: TLBR_ {
                    t: 10.0,
                    l: 20.0,
                    b: 30.0,
                    r: 40.0,
                },
                class: 3,
            }],
        }
    }

    #[test]
    fn header_then_length_prefixed_records() {
        let mut writer = RecordWriter::new(vec![]).unwrap();
        writer.write(&sample_image()).unwrap();
        writer.write(&sample_image()).unwrap();
        assert_eq!(writer.count(), 2);
        let bytes = writer.finish().unwrap();

        assert_eq!(&bytes[..8], &MAGIC);
        let payload_len = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 8 + 2 * (8 + payload_len));
    }

    #[test]
    fn unwritable_destination() {
        let path = Path::new("/nonexistent-dir/for/records/train.rec");
        let err = RecordWriter::create(path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Io { .. })
        ));
    }

    #[test]
    fn failing_sink_reports_io_error() {
        #[derive(Debug)]
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::Other, "broken"))
            }
        }

        // the header fits into the buffer, so the failure shows up on flush
        let writer = RecordWriter::new(Broken).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::Io { .. })
        ));
    }
}
