//! Decoding of the IDX files MNIST-like image datasets ship in.
//!
//! Every file starts with a big-endian magic number (`0x0000_08_NN`, `08` meaning unsigned
//! bytes and `NN` the amount of dimensions), followed by one big-endian `u32` per dimension and
//! the raw data.

use std::{fs, path::Path};

use log::{debug, info};

use super::Dataset;
use crate::{MlErr, Result};

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// A decoded IDX3 image file.
#[derive(Debug, Clone, PartialEq)]
pub struct Images {
    pub rows: usize,
    pub cols: usize,
    /// Pixel intensities scaled to `[0, 1]`, one flattened image after the other.
    pub pixels: Vec<f32>,
}

impl Images {
    /// Returns the amount of images.
    pub fn len(&self) -> usize {
        self.pixels.len() / self.pixel_count().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the amount of pixels in a single flattened image.
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Decodes an IDX3 image file.
///
/// # Arguments
/// * `name` - The file's name, used in error messages.
/// * `bytes` - The file's contents.
pub fn parse_images(name: &str, bytes: &[u8]) -> Result<Images> {
    let mut header = Header::new(name, bytes);
    header.expect_magic(IMAGES_MAGIC)?;
    let count = header.next_dim()?;
    let rows = header.next_dim()?;
    let cols = header.next_dim()?;

    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| header.invalid("image dimensions overflow".to_string()))?;

    let body = header.body(len)?;
    let pixels = body.iter().map(|&p| p as f32 / 255.).collect();

    Ok(Images { rows, cols, pixels })
}

/// Decodes an IDX1 label file.
///
/// # Arguments
/// * `name` - The file's name, used in error messages.
/// * `bytes` - The file's contents.
pub fn parse_labels(name: &str, bytes: &[u8]) -> Result<Vec<usize>> {
    let mut header = Header::new(name, bytes);
    header.expect_magic(LABELS_MAGIC)?;
    let count = header.next_dim()?;

    let body = header.body(count)?;
    Ok(body.iter().map(|&l| l as usize).collect())
}

/// Reads an image file and its label file into a classification `Dataset`. Each image is
/// flattened into `rows * cols` features and each label one-hot encoded into `classes` values.
///
/// # Arguments
/// * `images` - Path to the IDX3 image file.
/// * `labels` - Path to the IDX1 label file.
/// * `classes` - The amount of classes.
pub fn load<P, Q>(images: P, labels: Q, classes: usize) -> Result<Dataset>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (images, labels) = (images.as_ref(), labels.as_ref());

    let images_name = images.display().to_string();
    let decoded = parse_images(&images_name, &fs::read(images)?)?;
    let labels_name = labels.display().to_string();
    let decoded_labels = parse_labels(&labels_name, &fs::read(labels)?)?;

    if decoded.len() != decoded_labels.len() {
        return Err(MlErr::InvalidIdx {
            path: labels_name,
            reason: format!(
                "holds {} labels for {} images",
                decoded_labels.len(),
                decoded.len()
            ),
        });
    }

    debug!(
        "decoded {} images of {}x{} from {images_name}",
        decoded.len(),
        decoded.rows,
        decoded.cols
    );

    let dataset = Dataset::from_labels(
        &decoded.pixels,
        decoded.pixel_count(),
        &decoded_labels,
        classes,
    )?;
    info!(samples = dataset.len(); "loaded {images_name}");
    Ok(dataset)
}

struct Header<'a> {
    name: &'a str,
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Header<'a> {
    fn new(name: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            bytes,
            cursor: 0,
        }
    }

    fn next_u32(&mut self) -> Result<u32> {
        let end = self.cursor + 4;
        let Some(&[a, b, c, d]) = self.bytes.get(self.cursor..end) else {
            return Err(self.invalid("truncated header".to_string()));
        };

        self.cursor = end;
        Ok(u32::from_be_bytes([a, b, c, d]))
    }

    fn next_dim(&mut self) -> Result<usize> {
        Ok(self.next_u32()? as usize)
    }

    fn expect_magic(&mut self, expected: u32) -> Result<()> {
        let magic = self.next_u32()?;
        if magic != expected {
            return Err(self.invalid(format!(
                "magic number {magic:#010x}, expected {expected:#010x}"
            )));
        }

        Ok(())
    }

    fn body(&self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.bytes;
        let body = &bytes[self.cursor..];
        if body.len() != len {
            return Err(self.invalid(format!(
                "body holds {} bytes, the header announces {len}",
                body.len()
            )));
        }

        Ok(body)
    }

    fn invalid(&self, reason: String) -> MlErr {
        MlErr::InvalidIdx {
            path: self.name.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images_file(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for v in [IMAGES_MAGIC, count, rows, cols] {
            bytes.extend(v.to_be_bytes());
        }
        bytes.extend_from_slice(pixels);
        bytes
    }

    fn labels_file(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(LABELS_MAGIC.to_be_bytes());
        bytes.extend((labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    #[test]
    fn parses_images() {
        let bytes = images_file(2, 1, 2, &[0, 255, 51, 102]);
        let images = parse_images("images", &bytes).unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images.pixel_count(), 2);
        assert_eq!(images.pixels, [0., 1., 0.2, 0.4]);
    }

    #[test]
    fn parses_labels() {
        let labels = parse_labels("labels", &labels_file(&[3, 0, 9])).unwrap();
        assert_eq!(labels, [3, 0, 9]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let bytes = labels_file(&[1]);
        assert!(matches!(
            parse_images("labels", &bytes),
            Err(MlErr::InvalidIdx { .. })
        ));
    }

    #[test]
    fn rejects_truncated_files() {
        let bytes = images_file(2, 2, 2, &[0; 7]);
        assert!(parse_images("images", &bytes).is_err());
        assert!(parse_images("images", &bytes[..10]).is_err());
        assert!(parse_labels("labels", &[]).is_err());
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        let bytes = images_file(u32::MAX, u32::MAX, u32::MAX, &[0; 16]);

        assert!(matches!(
            parse_images("images", &bytes),
            Err(MlErr::InvalidIdx { .. })
        ));
    }

    #[test]
    fn loads_a_dataset_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images-idx3-ubyte");
        let labels = dir.path().join("labels-idx1-ubyte");
        fs::write(&images, images_file(3, 2, 2, &[255; 12])).unwrap();
        fs::write(&labels, labels_file(&[0, 2, 1])).unwrap();

        let dataset = load(&images, &labels, 3).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.x_size(), 4);
        assert_eq!(dataset.label(1), Some(2));

        fs::write(&labels, labels_file(&[0, 2])).unwrap();
        assert!(load(&images, &labels, 3).is_err());

        fs::write(&labels, labels_file(&[0, 2, 7])).unwrap();
        assert!(matches!(
            load(&images, &labels, 3),
            Err(MlErr::LabelOutOfRange { label: 7, .. })
        ));
    }
}
