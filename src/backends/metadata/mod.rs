//! Binary metadata extraction
//!
//! Decoding is isolated behind `MetadataExtractor` so the walker never depends
//! on a concrete format parser. The default `SignatureExtractor` recognizes
//! files by magic bytes and reads only the header it is given:
//! - images: PNG, GIF, BMP, JPEG, WebP
//! - audio: WAV, FLAC, MP3

use serde::Serialize;
use thiserror::Error;

mod audio;
mod image;

/// Image facts read from a header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub format: &'static str,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<String>,
}

/// Audio facts read from a header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
}

/// Kind-specific metadata for a recognized binary file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BinaryMetadata {
    Image(ImageInfo),
    Audio(AudioInfo),
}

impl BinaryMetadata {
    /// Ordered `(label, value)` pairs for rendering
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            BinaryMetadata::Image(info) => {
                let mut fields = vec![
                    ("Format", info.format.to_string()),
                    ("Width", info.width.to_string()),
                    ("Height", info.height.to_string()),
                ];
                if let Some(pixel_format) = &info.pixel_format {
                    fields.push(("Pixel format", pixel_format.clone()));
                }
                fields
            }
            BinaryMetadata::Audio(info) => {
                let mut fields = vec![("Format", info.format.to_string())];
                if let Some(duration) = info.duration_secs {
                    fields.push(("Duration", format!("{:.3} s", duration)));
                }
                if let Some(bitrate) = info.bitrate_kbps {
                    fields.push(("Bitrate", format!("{} kbps", bitrate)));
                }
                if let Some(rate) = info.sample_rate {
                    fields.push(("Sample rate", format!("{} Hz", rate)));
                }
                if let Some(channels) = info.channels {
                    fields.push(("Channels", channels.to_string()));
                }
                fields
            }
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            BinaryMetadata::Image(info) => info.format,
            BinaryMetadata::Audio(info) => info.format,
        }
    }
}

/// A recognized format whose header could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("{format} header is truncated")]
    Truncated { format: &'static str },

    #[error("{format} header is invalid: {message}")]
    Invalid {
        format: &'static str,
        message: String,
    },
}

impl MetadataError {
    pub(crate) fn invalid(format: &'static str, message: impl Into<String>) -> Self {
        MetadataError::Invalid {
            format,
            message: message.into(),
        }
    }
}

/// Capability interface for binary metadata extraction.
///
/// `Ok(None)` means the format is not recognized; `Err` means it was
/// recognized but its header is corrupt or an unsupported variant.
pub trait MetadataExtractor {
    fn extract(&self, header: &[u8], file_size: u64)
        -> Result<Option<BinaryMetadata>, MetadataError>;
}

/// Magic-byte based extractor for the formats listed in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureExtractor;

impl MetadataExtractor for SignatureExtractor {
    fn extract(
        &self,
        header: &[u8],
        file_size: u64,
    ) -> Result<Option<BinaryMetadata>, MetadataError> {
        if let Some(result) = image::probe(header) {
            return result.map(|info| Some(BinaryMetadata::Image(info)));
        }
        if let Some(result) = audio::probe(header, file_size) {
            return result.map(|info| Some(BinaryMetadata::Audio(info)));
        }
        Ok(None)
    }
}

/// Bounds-checked reads over a header buffer
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header<'a> {
    data: &'a [u8],
    format: &'static str,
}

impl<'a> Header<'a> {
    pub(crate) fn new(data: &'a [u8], format: &'static str) -> Self {
        Self { data, format }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], MetadataError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(MetadataError::Truncated {
                format: self.format,
            })
    }

    pub(crate) fn u8(&self, offset: usize) -> Result<u8, MetadataError> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub(crate) fn u16_le(&self, offset: usize) -> Result<u16, MetadataError> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u16_be(&self, offset: usize) -> Result<u16, MetadataError> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u24_le(&self, offset: usize) -> Result<u32, MetadataError> {
        let b = self.bytes(offset, 3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub(crate) fn u24_be(&self, offset: usize) -> Result<u32, MetadataError> {
        let b = self.bytes(offset, 3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub(crate) fn u32_le(&self, offset: usize) -> Result<u32, MetadataError> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u32_be(&self, offset: usize) -> Result<u32, MetadataError> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32_le(&self, offset: usize) -> Result<i32, MetadataError> {
        let b = self.bytes(offset, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> MetadataError {
        MetadataError::invalid(self.format, message)
    }
}
