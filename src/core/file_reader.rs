//! File classification and reading
//!
//! Provides consistent handling for:
//! - Binary detection (known extensions, NUL bytes, control-byte density)
//! - Non-UTF-8 files (BOM-selected encoding, lossy replacement)
//! - Binary headers (bounded read for metadata extraction)

use content_inspector::ContentType;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

use crate::backends::metadata::MetadataExtractor;
use crate::core::language::language_hint;
use crate::core::model::FileContent;
use crate::core::paths::extension_of;

/// Prefix sampled for binary detection (8 KB)
pub const DEFAULT_SAMPLE_SIZE: usize = 8 * 1024;

/// Header read from binary files for metadata (256 KB)
pub const DEFAULT_METADATA_READ_LIMIT: usize = 256 * 1024;

/// Share of control bytes above which a sample is binary
pub const DEFAULT_CONTROL_RATIO: f64 = 0.30;

/// Extensions treated as binary without sampling
#[rustfmt::skip]
pub const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "tif", "tiff", "psd", "heic", "avif",
    // audio / video
    "wav", "mp3", "flac", "ogg", "m4a", "aac", "wma", "mp4", "mkv", "mov", "avi", "webm",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "zst",
    // executables and objects
    "exe", "dll", "so", "dylib", "bin", "o", "a", "lib", "obj", "class", "jar", "wasm", "pyc", "pyo",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods",
    // databases
    "db", "sqlite", "sqlite3",
];

/// Configuration for file classification
#[derive(Debug, Clone)]
pub struct FileReadConfig {
    /// Bytes sampled for text/binary detection
    pub sample_size: usize,

    /// Maximum header bytes read from a binary file
    pub metadata_read_limit: usize,

    /// Control-byte share that marks a sample binary
    pub control_ratio: f64,

    pub binary_extensions: &'static [&'static str],
}

impl Default for FileReadConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            metadata_read_limit: DEFAULT_METADATA_READ_LIMIT,
            control_ratio: DEFAULT_CONTROL_RATIO,
            binary_extensions: BINARY_EXTENSIONS,
        }
    }
}

/// A classified file
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub size: u64,
    pub content: FileContent,
}

/// Outcome of sniffing a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    Binary,
    /// Text, with the encoding selected by a byte-order mark
    Text(Option<&'static Encoding>),
}

/// Classify a byte sample as text or binary
pub fn sniff(sample: &[u8], control_ratio: f64) -> Sniffed {
    if sample.is_empty() {
        return Sniffed::Text(None);
    }
    match content_inspector::inspect(sample) {
        ContentType::UTF_8_BOM => Sniffed::Text(Some(UTF_8)),
        ContentType::UTF_16LE => Sniffed::Text(Some(UTF_16LE)),
        ContentType::UTF_16BE => Sniffed::Text(Some(UTF_16BE)),
        ContentType::UTF_32LE | ContentType::UTF_32BE | ContentType::BINARY => Sniffed::Binary,
        ContentType::UTF_8 => {
            // inspect() only looks for NUL in the first kilobyte
            if sample.contains(&0) || control_share(sample) > control_ratio {
                Sniffed::Binary
            } else {
                Sniffed::Text(None)
            }
        }
    }
}

fn is_control(byte: u8) -> bool {
    match byte {
        b'\t' | b'\n' | b'\r' | 0x0C | 0x1B => false,
        0x00..=0x1F | 0x7F => true,
        _ => false,
    }
}

fn control_share(sample: &[u8]) -> f64 {
    let controls = sample.iter().filter(|b| is_control(**b)).count();
    controls as f64 / sample.len() as f64
}

/// Decode text bytes; `lossy` is set when replacement characters were inserted
pub fn decode_text(bytes: &[u8], encoding: Option<&'static Encoding>) -> (String, bool) {
    let (text, lossy) = encoding
        .unwrap_or(UTF_8)
        .decode_with_bom_removal(bytes);
    (text.into_owned(), lossy)
}

fn has_binary_extension(path: &Path, config: &FileReadConfig) -> bool {
    extension_of(&path.to_string_lossy())
        .map(|ext| config.binary_extensions.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Read and classify one file.
///
/// Only I/O failures are errors; undecodable bytes and unrecognized or corrupt
/// binary headers degrade into the returned content.
pub fn classify_file(
    path: &Path,
    config: &FileReadConfig,
    extractor: &dyn MetadataExtractor,
) -> io::Result<Classified> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut buffer = Vec::with_capacity(config.sample_size.min(size as usize));
    (&mut file)
        .take(config.sample_size as u64)
        .read_to_end(&mut buffer)?;

    let sniffed = if buffer.is_empty() {
        Sniffed::Text(None)
    } else if has_binary_extension(path, config) {
        Sniffed::Binary
    } else {
        sniff(&buffer, config.control_ratio)
    };

    let content = match sniffed {
        Sniffed::Binary => {
            let remaining = config.metadata_read_limit.saturating_sub(buffer.len());
            (&mut file)
                .take(remaining as u64)
                .read_to_end(&mut buffer)?;
            binary_content(path, &buffer, size, extractor)
        }
        Sniffed::Text(encoding) => {
            file.read_to_end(&mut buffer)?;
            let (body, lossy) = decode_text(&buffer, encoding);
            if lossy {
                debug!(path = %path.display(), "invalid byte sequences replaced");
            }
            FileContent::Text {
                body,
                language: language_hint(&path.to_string_lossy()),
                lossy,
            }
        }
    };

    Ok(Classified { size, content })
}

fn binary_content(
    path: &Path,
    header: &[u8],
    size: u64,
    extractor: &dyn MetadataExtractor,
) -> FileContent {
    match extractor.extract(header, size) {
        Ok(metadata) => FileContent::Binary {
            metadata,
            metadata_error: None,
        },
        Err(e) => {
            debug!(path = %path.display(), error = %e, "binary metadata unavailable");
            FileContent::Binary {
                metadata: None,
                metadata_error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::metadata::fixtures::PNG_1X1;
    use crate::backends::metadata::{BinaryMetadata, MetadataError, SignatureExtractor};
    use std::fs;
    use tempfile::TempDir;

    struct FailingExtractor;

    impl MetadataExtractor for FailingExtractor {
        fn extract(&self, _: &[u8], _: u64) -> Result<Option<BinaryMetadata>, MetadataError> {
            Err(MetadataError::Truncated { format: "PNG" })
        }
    }

    fn classify(dir: &TempDir, name: &str, bytes: &[u8]) -> Classified {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        classify_file(&path, &FileReadConfig::default(), &SignatureExtractor).unwrap()
    }

    #[test]
    fn test_file_read_config_default() {
        let config = FileReadConfig::default();
        assert_eq!(config.sample_size, DEFAULT_SAMPLE_SIZE);
        assert_eq!(config.metadata_read_limit, DEFAULT_METADATA_READ_LIMIT);
        assert!(config.binary_extensions.contains(&"png"));
        assert!(!config.binary_extensions.contains(&"svg"));
    }

    #[test]
    fn test_plain_text() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "a.py", b"print('hi')\n");
        assert_eq!(classified.size, 12);
        assert_eq!(
            classified.content,
            FileContent::Text {
                body: "print('hi')\n".to_string(),
                language: Some("python"),
                lossy: false,
            }
        );
    }

    #[test]
    fn test_zero_length_is_text() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "empty.png", b"");
        assert!(!classified.content.is_binary());
    }

    #[test]
    fn test_invalid_utf8_is_lossy_text() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "bad.txt", &[b'h', b'i', 0xFF, b'!', b'\n']);
        match classified.content {
            FileContent::Text { body, lossy, .. } => {
                assert!(lossy);
                assert_eq!(body, "hi\u{FFFD}!\n");
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_nul_byte_is_binary() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "blob.dat", &[0x01, 0x00, 0x02, 0x03]);
        assert_eq!(
            classified.content,
            FileContent::Binary {
                metadata: None,
                metadata_error: None,
            }
        );
    }

    #[test]
    fn test_control_bytes_are_binary() {
        let sample: Vec<u8> = (0..100).map(|i| if i % 2 == 0 { 0x01 } else { b'a' }).collect();
        assert_eq!(sniff(&sample, DEFAULT_CONTROL_RATIO), Sniffed::Binary);
        assert_eq!(
            sniff(b"line\tone\r\nline two\n", DEFAULT_CONTROL_RATIO),
            Sniffed::Text(None)
        );
    }

    #[test]
    fn test_utf16_bom_is_decoded() {
        let dir = TempDir::new().unwrap();
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hé".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let classified = classify(&dir, "wide.txt", &bytes);
        match classified.content {
            FileContent::Text { body, lossy, .. } => {
                assert_eq!(body, "hé");
                assert!(!lossy);
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "bom.md", b"\xEF\xBB\xBF# Title\n");
        match classified.content {
            FileContent::Text { body, language, .. } => {
                assert_eq!(body, "# Title\n");
                assert_eq!(language, Some("markdown"));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_png_metadata() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "b.png", PNG_1X1);
        match classified.content {
            FileContent::Binary { metadata, .. } => {
                let fields = metadata.expect("png metadata").fields();
                assert!(fields.contains(&("Width", "1".to_string())));
                assert!(fields.contains(&("Height", "1".to_string())));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_extension_skips_sniffing() {
        let dir = TempDir::new().unwrap();
        let classified = classify(&dir, "archive.zip", b"plain looking text");
        assert!(classified.content.is_binary());
    }

    #[test]
    fn test_metadata_failure_degrades() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.png");
        fs::write(&path, PNG_1X1).unwrap();
        let classified =
            classify_file(&path, &FileReadConfig::default(), &FailingExtractor).unwrap();
        assert_eq!(
            classified.content,
            FileContent::Binary {
                metadata: None,
                metadata_error: Some("PNG header is truncated".to_string()),
            }
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let bytes = [0x89, b'x', 0xC3, 0x28, b'\n'];
        let first = classify(&dir, "x.bin2", &bytes);
        let second = classify(&dir, "x.bin2", &bytes);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = classify_file(
            Path::new("/nonexistent/file.txt"),
            &FileReadConfig::default(),
            &SignatureExtractor,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_large_text_is_read_fully() {
        let dir = TempDir::new().unwrap();
        let content = "x".repeat(DEFAULT_SAMPLE_SIZE * 3);
        let classified = classify(&dir, "big.txt", content.as_bytes());
        match classified.content {
            FileContent::Text { body, .. } => assert_eq!(body.len(), content.len()),
            other => panic!("expected text, got {:?}", other),
        }
    }
}
