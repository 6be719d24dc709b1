//! Image header parsers

use super::{Header, ImageInfo, MetadataError};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SOI: &[u8] = &[0xFF, 0xD8, 0xFF];

/// `None` when no image signature matches
pub(super) fn probe(data: &[u8]) -> Option<Result<ImageInfo, MetadataError>> {
    if data.starts_with(PNG_SIGNATURE) {
        Some(png(Header::new(data, "PNG")))
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(gif(Header::new(data, "GIF")))
    } else if data.starts_with(JPEG_SOI) {
        Some(jpeg(Header::new(data, "JPEG")))
    } else if data.starts_with(b"BM") {
        Some(bmp(Header::new(data, "BMP")))
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(webp(Header::new(data, "WebP")))
    } else {
        None
    }
}

fn png(h: Header<'_>) -> Result<ImageInfo, MetadataError> {
    if h.bytes(12, 4)? != b"IHDR" {
        return Err(h.invalid("first chunk is not IHDR"));
    }
    let width = h.u32_be(16)?;
    let height = h.u32_be(20)?;
    let bit_depth = h.u8(24)?;
    let color = match h.u8(25)? {
        0 => "Grayscale",
        2 => "RGB",
        3 => "Indexed",
        4 => "GrayscaleAlpha",
        6 => "RGBA",
        other => return Err(h.invalid(format!("unknown color type {}", other))),
    };
    if width == 0 || height == 0 {
        return Err(h.invalid("zero dimension"));
    }
    Ok(ImageInfo {
        format: "PNG",
        width,
        height,
        pixel_format: Some(format!("{}, {}-bit", color, bit_depth)),
    })
}

fn gif(h: Header<'_>) -> Result<ImageInfo, MetadataError> {
    Ok(ImageInfo {
        format: "GIF",
        width: h.u16_le(6)? as u32,
        height: h.u16_le(8)? as u32,
        pixel_format: Some("Indexed".to_string()),
    })
}

fn bmp(h: Header<'_>) -> Result<ImageInfo, MetadataError> {
    let dib_size = h.u32_le(14)?;
    let (width, height, bpp) = match dib_size {
        // OS/2 BITMAPCOREHEADER
        12 => (
            h.u16_le(18)? as i64,
            h.u16_le(20)? as i64,
            h.u16_le(24)?,
        ),
        40.. => (
            h.i32_le(18)? as i64,
            // negative height marks a top-down bitmap
            (h.i32_le(22)? as i64).abs(),
            h.u16_le(28)?,
        ),
        other => return Err(h.invalid(format!("unsupported DIB header size {}", other))),
    };
    if width <= 0 || height == 0 {
        return Err(h.invalid("non-positive dimension"));
    }
    Ok(ImageInfo {
        format: "BMP",
        width: width as u32,
        height: height as u32,
        pixel_format: Some(format!("{}-bit", bpp)),
    })
}

fn is_start_of_frame(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn jpeg(h: Header<'_>) -> Result<ImageInfo, MetadataError> {
    let mut pos = 2;
    loop {
        if h.u8(pos)? != 0xFF {
            return Err(h.invalid(format!("expected marker at offset {}", pos)));
        }
        while h.u8(pos)? == 0xFF {
            pos += 1;
        }
        let marker = h.u8(pos)?;
        pos += 1;

        match marker {
            // standalone markers carry no length
            0x01 | 0xD0..=0xD8 => continue,
            0xD9 | 0xDA => return Err(h.invalid("no frame header before scan data")),
            _ => {}
        }

        let len = h.u16_be(pos)? as usize;
        if len < 2 {
            return Err(h.invalid(format!("segment length {} too small", len)));
        }
        if is_start_of_frame(marker) {
            let height = h.u16_be(pos + 3)? as u32;
            let width = h.u16_be(pos + 5)? as u32;
            let pixel_format = match h.u8(pos + 7)? {
                1 => "Grayscale".to_string(),
                3 => "YCbCr".to_string(),
                4 => "CMYK".to_string(),
                n => format!("{} components", n),
            };
            return Ok(ImageInfo {
                format: "JPEG",
                width,
                height,
                pixel_format: Some(pixel_format),
            });
        }
        pos += len;
    }
}

fn webp(h: Header<'_>) -> Result<ImageInfo, MetadataError> {
    let (width, height, alpha) = match h.bytes(12, 4)? {
        b"VP8X" => {
            let flags = h.u8(20)?;
            (
                h.u24_le(24)? + 1,
                h.u24_le(27)? + 1,
                flags & 0x10 != 0,
            )
        }
        b"VP8L" => {
            if h.u8(20)? != 0x2F {
                return Err(h.invalid("bad lossless signature"));
            }
            let bits = h.u32_le(21)?;
            (
                (bits & 0x3FFF) + 1,
                ((bits >> 14) & 0x3FFF) + 1,
                (bits >> 28) & 1 == 1,
            )
        }
        b"VP8 " => {
            if h.bytes(23, 3)? != [0x9D, 0x01, 0x2A] {
                return Err(h.invalid("bad keyframe start code"));
            }
            (
                (h.u16_le(26)? & 0x3FFF) as u32,
                (h.u16_le(28)? & 0x3FFF) as u32,
                false,
            )
        }
        other => {
            return Err(h.invalid(format!(
                "unknown chunk {}",
                String::from_utf8_lossy(other)
            )))
        }
    };
    Ok(ImageInfo {
        format: "WebP",
        width,
        height,
        pixel_format: Some(if alpha { "RGBA" } else { "RGB" }.to_string()),
    })
}
