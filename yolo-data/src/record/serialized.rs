use crate::{common::*, dataset::AnnotatedImage, DataError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// One record as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedRecord {
    pub filename: Vec<u8>,
    pub image: Vec<u8>,
    /// Flattened `(x1, y1, x2, y2, class)` rows.
    pub label: Vec<f32>,
}

impl SerializedRecord {
    pub fn filename_lossy(&self) -> String {
        String::from_utf8_lossy(&self.filename).into_owned()
    }

    pub fn num_boxes(&self) -> usize {
        self.label.len() / 5
    }

    pub(crate) fn encode_payload(&self) -> Vec<u8> {
        let Self {
            filename,
            image,
            label,
        } = self;

        let mut payload =
            Vec::with_capacity(4 + filename.len() + 8 + image.len() + 4 + label.len() * 4);
        // writes into a Vec cannot fail
        let _ = payload.write_u32::<LittleEndian>(filename.len() as u32);
        payload.extend_from_slice(filename);
        let _ = payload.write_u64::<LittleEndian>(image.len() as u64);
        payload.extend_from_slice(image);
        let _ = payload.write_u32::<LittleEndian>(label.len() as u32);
        label.iter().for_each(|&value| {
            let _ = payload.write_f32::<LittleEndian>(value);
        });
        payload
    }

    pub(crate) fn decode_payload(payload: &[u8]) -> Result<Self> {
        let truncated = |_| DataError::Format("truncated record payload".into());
        let mut reader = payload;

        let filename_len = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let filename = take(&mut reader, filename_len)?;
        let image_len = reader.read_u64::<LittleEndian>().map_err(truncated)? as usize;
        let image = take(&mut reader, image_len)?;
        let label_len = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        ensure!(
            reader.len() == label_len * 4,
            DataError::Format(format!(
                "expect {} bytes of label data, but found {}",
                label_len * 4,
                reader.len()
            ))
        );
        let mut label = vec![0f32; label_len];
        reader
            .read_f32_into::<LittleEndian>(&mut label)
            .map_err(truncated)?;

        Ok(Self {
            filename,
            image,
            label,
        })
    }
}

impl From<&AnnotatedImage> for SerializedRecord {
    fn from(from: &AnnotatedImage) -> Self {
        let label = from
            .boxes
            .iter()
            .flat_map(|label| {
                let TLBR_ { t, l, b, r } = label.rect;
                [l, t, r, b, label.class as f32]
            })
            .collect();

        Self {
            filename: from.filename.as_bytes().to_vec(),
            image: from.image.clone(),
            label,
        }
    }
}

fn take(reader: &mut &[u8], len: usize) -> Result<Vec<u8>> {
    ensure!(
        reader.len() >= len,
        DataError::Format("truncated record payload".into())
    );
    let (head, tail) = reader.split_at(len);
    *reader = tail;
    Ok(head.to_vec())
}
