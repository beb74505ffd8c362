//! PNG encoding for SnapCap
//!
//! Takes raw BGRA8 pixels and produces a PNG, either as bytes or written
//! to a file. The alpha channel is ignored on purpose: captured frames
//! carry no meaningful transparency, so output is an opaque RGB image.

use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("invalid image dimensions: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// 96 DPI expressed as the pHYs chunk's pixels per metre.
const PIXELS_PER_METRE_96DPI: u32 = 3780;

/// Encode tightly packed BGRA8 pixels as PNG bytes at 96 DPI.
pub fn encode_png(bgra: &[u8], width: u32, height: u32) -> EncodeResult<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || bgra.len() != expected {
        return Err(EncodeError::InvalidDimensions {
            width,
            height,
            len: bgra.len(),
        });
    }

    // Drop alpha, swap to RGB byte order.
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in bgra.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: PIXELS_PER_METRE_96DPI,
            yppu: PIXELS_PER_METRE_96DPI,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgb)?;
    }
    Ok(out)
}

/// Encode and write to `path`, creating missing parent directories and
/// replacing any existing file of the same name.
///
/// The bytes go to a sibling temp file first and are renamed into place,
/// so a failed write never leaves a truncated PNG at the target path.
pub fn write_png(bgra: &[u8], width: u32, height: u32, path: &Path) -> EncodeResult<()> {
    let bytes = encode_png(bgra, width, height)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, &bytes)?;
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn solid_bgra(b: u8, g: u8, r: u8, width: u32, height: u32) -> Vec<u8> {
        [b, g, r, 0xFF]
            .repeat(width as usize * height as usize)
    }

    #[test]
    fn output_starts_with_png_signature() {
        let bytes = encode_png(&solid_bgra(0, 0, 0, 4, 4), 4, 4).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn round_trip_preserves_dimensions_and_color() {
        // Orange-ish pixel in BGRA order; alpha intentionally not opaque
        // to prove it is ignored.
        let mut bgra = solid_bgra(0x20, 0x80, 0xE0, 7, 5);
        for px in bgra.chunks_exact_mut(4) {
            px[3] = 0x30;
        }
        let bytes = encode_png(&bgra, 7, 5).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (7, 5));
        for pixel in decoded.pixels() {
            assert_eq!(pixel.0, [0xE0, 0x80, 0x20]);
        }
    }

    #[test]
    fn phys_chunk_records_96_dpi() {
        let bytes = encode_png(&solid_bgra(1, 2, 3, 2, 2), 2, 2).unwrap();
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        let dims = reader.info().pixel_dims.unwrap();
        assert_eq!(dims.xppu, PIXELS_PER_METRE_96DPI);
        assert_eq!(dims.yppu, PIXELS_PER_METRE_96DPI);
        assert_eq!(dims.unit, png::Unit::Meter);
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            encode_png(&[], 0, 0),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn mismatched_buffer_rejected() {
        assert!(matches!(
            encode_png(&[0u8; 10], 4, 4),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn write_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("shot.png");
        write_png(&solid_bgra(9, 9, 9, 3, 3), 3, 3, &path).unwrap();
        let written = fs::read(&path).unwrap();
        assert!(!written.is_empty());
        assert_eq!(&written[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        fs::write(&path, b"not a png").unwrap();
        write_png(&solid_bgra(1, 2, 3, 2, 2), 2, 2, &path).unwrap();
        let written = fs::read(&path).unwrap();
        assert_eq!(&written[..8], &PNG_SIGNATURE);
        // No temp file left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
