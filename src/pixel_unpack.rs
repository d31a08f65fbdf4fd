//! Turning reconstructed scanline bytes into RGBA pixels.

use crate::{
  error::{PngError, PngResult},
  pixels::RGBA8888,
  png_header::{PngColorType, PngHeader},
  sample_source::SampleSource,
};

/// Converts one reconstructed byte line into `header.width` RGBA pixels,
/// appended to `out`.
///
/// Everything but indexed colour reads scaled samples; indexed colour reads
/// raw palette indices and looks them up. Alpha defaults to opaque wherever
/// the image has none.
pub(crate) fn unpack_pixel_line(
  line: &[u8], header: PngHeader, palette: &[[u8; 3]], out: &mut Vec<RGBA8888>,
) -> PngResult<()> {
  let scale_samples = header.color_type != PngColorType::INDEX;
  let mut samples = SampleSource::new(line, header.bit_depth, scale_samples);
  for _ in 0..header.width {
    let pixel = match header.color_type {
      PngColorType::Y => {
        let y = samples.next_sample()?;
        RGBA8888 { r: y, g: y, b: y, a: 255 }
      }
      PngColorType::RGB => {
        let r = samples.next_sample()?;
        let g = samples.next_sample()?;
        let b = samples.next_sample()?;
        RGBA8888 { r, g, b, a: 255 }
      }
      PngColorType::INDEX => {
        let index = usize::from(samples.next_sample()?);
        let [r, g, b] = *palette.get(index).ok_or(PngError::BadPaletteIndex)?;
        RGBA8888 { r, g, b, a: 255 }
      }
      PngColorType::YA => {
        let y = samples.next_sample()?;
        let a = samples.next_sample()?;
        RGBA8888 { r: y, g: y, b: y, a }
      }
      // RGBA, the only combination left after header validation.
      _ => {
        let r = samples.next_sample()?;
        let g = samples.next_sample()?;
        let b = samples.next_sample()?;
        let a = samples.next_sample()?;
        RGBA8888 { r, g, b, a }
      }
    };
    out.push(pixel);
  }
  Ok(())
}

#[cfg(test)]
fn unpack_header(width: u32, bit_depth: u8, color_type: PngColorType) -> PngHeader {
  use crate::png_header::{PngCompressionMethod, PngFilterMethod, PngInterlaceMethod};
  PngHeader {
    width,
    height: 1,
    bit_depth,
    color_type,
    compression_method: PngCompressionMethod::DEFLATE,
    filter_method: PngFilterMethod::ADAPTIVE,
    interlace_method: PngInterlaceMethod::NO_INTERLACE,
  }
}

#[test]
fn test_greyscale_expands_with_opaque_alpha() {
  let mut out = Vec::new();
  unpack_pixel_line(&[0b0110_0000], unpack_header(3, 1, PngColorType::Y), &[], &mut out).unwrap();
  let white = RGBA8888 { r: 255, g: 255, b: 255, a: 255 };
  let black = RGBA8888 { r: 0, g: 0, b: 0, a: 255 };
  assert_eq!(out, vec![black, white, white]);
}

#[test]
fn test_indexed_lookup_uses_raw_indices() {
  let palette = [[10, 20, 30], [40, 50, 60], [70, 80, 90], [100, 110, 120]];
  let mut out = Vec::new();
  unpack_pixel_line(&[0b00_01_10_11], unpack_header(4, 2, PngColorType::INDEX), &palette, &mut out)
    .unwrap();
  let expected: Vec<RGBA8888> =
    palette.iter().map(|&[r, g, b]| RGBA8888 { r, g, b, a: 255 }).collect();
  assert_eq!(out, expected);
}

#[test]
fn test_out_of_range_palette_index_fails() {
  let palette = [[1, 2, 3]];
  let mut out = Vec::new();
  let result =
    unpack_pixel_line(&[0b00_01_00_00], unpack_header(2, 2, PngColorType::INDEX), &palette, &mut out);
  assert_eq!(result, Err(PngError::BadPaletteIndex));
}

#[test]
fn test_greyscale_alpha_pairs() {
  let mut out = Vec::new();
  unpack_pixel_line(&[7, 200], unpack_header(1, 8, PngColorType::YA), &[], &mut out).unwrap();
  assert_eq!(out, vec![RGBA8888 { r: 7, g: 7, b: 7, a: 200 }]);
}
