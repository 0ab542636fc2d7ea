//! Still-image encoding.

use std::io::BufWriter;
use std::path::Path;

use hunyclip_common::error::{HunyclipError, HunyclipResult};

use crate::frame_source::Frame;

/// Write `frame` as an 8-bit RGB PNG.
pub fn write_png(frame: &Frame, path: &Path) -> HunyclipResult<()> {
    let file = std::fs::File::create(path)?;
    let w = &mut BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| HunyclipError::export(format!("PNG header for {}: {e}", path.display())))?;
    writer
        .write_image_data(&frame.pixels)
        .map_err(|e| HunyclipError::export(format!("PNG data for {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let pixels: Vec<u8> = (0..4 * 2 * 3).map(|v| v as u8).collect();
        let frame = Frame::new(4, 2, pixels.clone()).unwrap();
        write_png(&frame, &path).unwrap();

        let decoder = png::Decoder::new(std::fs::File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        assert_eq!(info.color_type, png::ColorType::Rgb);
        assert_eq!(&buf[..info.buffer_size()], pixels.as_slice());
    }
}
