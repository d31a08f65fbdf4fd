//! Reading and validating the `IHDR` chunk.

use crate::{
  chunk_source::{ChunkTy, PngChunkSource},
  error::{PngError, PngResult},
};
use tracing::debug;

/// The validated contents of an `IHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngHeader {
  /// Image width in pixels, never zero.
  pub width: u32,
  /// Image height in pixels, never zero.
  pub height: u32,
  /// Bits per sample: 1, 2, 4, 8, or 16, as allowed by the colour type.
  pub bit_depth: u8,
  /// How samples map to pixels.
  pub color_type: PngColorType,
  /// Always deflate.
  pub compression_method: PngCompressionMethod,
  /// Always adaptive (the five per-scanline filters).
  pub filter_method: PngFilterMethod,
  /// None or Adam7.
  pub interlace_method: PngInterlaceMethod,
}

impl PngHeader {
  /// Reads the `IHDR` chunk, which must be the chunk the source is about to
  /// produce, and validates every field.
  pub fn read_and_validate(chunks: &mut PngChunkSource<'_>) -> PngResult<Self> {
    let (length, ty) = chunks.read_chunk_header()?;
    if ty != ChunkTy::IHDR || length != 13 {
      return Err(PngError::BadIhdr);
    }
    let width = chunks.read_u32()?;
    let height = chunks.read_u32()?;
    let bit_depth = chunks.read_u8()?;
    let color_type = PngColorType(chunks.read_u8()?);
    let compression_method = PngCompressionMethod(chunks.read_u8()?);
    let filter_method = PngFilterMethod(chunks.read_u8()?);
    let interlace_method = PngInterlaceMethod(chunks.read_u8()?);
    chunks.finish_chunk()?;

    if width == 0 || height == 0 {
      return Err(PngError::ZeroImageDimension);
    }
    match (color_type, bit_depth) {
      (PngColorType::Y, 1 | 2 | 4 | 8 | 16) => (),
      (PngColorType::RGB, 8 | 16) => (),
      (PngColorType::INDEX, 1 | 2 | 4 | 8) => (),
      (PngColorType::YA, 8 | 16) => (),
      (PngColorType::RGBA, 8 | 16) => (),
      (
        PngColorType::Y | PngColorType::RGB | PngColorType::INDEX | PngColorType::YA
        | PngColorType::RGBA,
        _,
      ) => return Err(PngError::InvalidBitDepth),
      _ => return Err(PngError::InvalidColourType),
    }
    if compression_method != PngCompressionMethod::DEFLATE {
      return Err(PngError::InvalidCompressionMethod);
    }
    if filter_method != PngFilterMethod::ADAPTIVE {
      return Err(PngError::InvalidFilterMethod);
    }
    if interlace_method.0 > 1 {
      return Err(PngError::InvalidInterlaceMethod);
    }

    let header = Self {
      width,
      height,
      bit_depth,
      color_type,
      compression_method,
      filter_method,
      interlace_method,
    };
    debug!(
      width,
      height,
      color_type = ?color_type,
      bit_depth,
      interlaced = (interlace_method == PngInterlaceMethod::ADAM7),
      "image header"
    );
    Ok(header)
  }

  /// Samples per pixel for this colour type (an index counts as one sample).
  #[inline]
  #[must_use]
  pub const fn samples_per_pixel(self) -> usize {
    match self.color_type {
      PngColorType::YA => 2,
      PngColorType::RGB => 3,
      PngColorType::RGBA => 4,
      // Y and INDEX
      _ => 1,
    }
  }

  /// The distance (in bytes) from a byte to the corresponding byte of the
  /// pixel to its left, as the filters define it: 1 whenever a pixel is
  /// smaller than a byte.
  #[inline]
  #[must_use]
  pub const fn filter_offset(self) -> usize {
    let bytes_per_pixel = self.samples_per_pixel() * self.bit_depth as usize / 8;
    if bytes_per_pixel > 0 {
      bytes_per_pixel
    } else {
      1
    }
  }

  /// Bytes in one scanline's worth of samples (without the filter byte),
  /// with partial trailing bytes rounded up.
  pub fn bytes_per_scanline(self) -> PngResult<usize> {
    let bits_per_scanline = (self.width as usize)
      .checked_mul(self.samples_per_pixel())
      .and_then(|n| n.checked_mul(self.bit_depth as usize))
      .ok_or(PngError::OutputOverflow)?;
    Ok(bits_per_scanline / 8 + usize::from(bits_per_scanline % 8 != 0))
  }

  /// Total size of the filtered stream: `height` scanlines, each prefixed
  /// with its filter type byte. This is exactly what `IDAT` must inflate to.
  pub fn filtered_stream_len(self) -> PngResult<usize> {
    if self.interlace_method == PngInterlaceMethod::ADAM7 {
      // accepted at validation, but there's no Adam7 unpacking here.
      return Err(PngError::InterlaceNotSupported);
    }
    (self.bytes_per_scanline()? + 1)
      .checked_mul(self.height as usize)
      .ok_or(PngError::OutputOverflow)
  }
}

/// How the samples of a pixel are to be interpreted.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PngColorType(pub(crate) u8);
impl PngColorType {
  /// Greyscale.
  pub const Y: Self = Self(0);
  /// Red, green, blue.
  pub const RGB: Self = Self(2);
  /// Index into the `PLTE` palette.
  pub const INDEX: Self = Self(3);
  /// Greyscale plus alpha.
  pub const YA: Self = Self(4);
  /// Red, green, blue, alpha.
  pub const RGBA: Self = Self(6);
}
impl core::fmt::Debug for PngColorType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      PngColorType::Y => write!(f, "Y"),
      PngColorType::RGB => write!(f, "RGB"),
      PngColorType::INDEX => write!(f, "Index"),
      PngColorType::YA => write!(f, "YA"),
      PngColorType::RGBA => write!(f, "RGBA"),
      other => write!(f, "Illegal({})", other.0),
    }
  }
}

/// PNG only ever defined one compression method.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PngCompressionMethod(pub(crate) u8);
impl PngCompressionMethod {
  /// zlib-wrapped deflate.
  pub const DEFLATE: Self = Self(0);
}
impl core::fmt::Debug for PngCompressionMethod {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      PngCompressionMethod::DEFLATE => write!(f, "Deflate"),
      other => write!(f, "Illegal({})", other.0),
    }
  }
}

/// PNG only ever defined one filter method (holding the five filter types).
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PngFilterMethod(pub(crate) u8);
impl PngFilterMethod {
  /// One filter type byte per scanline.
  pub const ADAPTIVE: Self = Self(0);
}
impl core::fmt::Debug for PngFilterMethod {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      PngFilterMethod::ADAPTIVE => write!(f, "Adaptive"),
      other => write!(f, "Illegal({})", other.0),
    }
  }
}

/// Whether the scanlines are stored in one pass or seven.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PngInterlaceMethod(pub(crate) u8);
impl PngInterlaceMethod {
  /// Scanlines top to bottom.
  pub const NO_INTERLACE: Self = Self(0);
  /// The seven-pass interleave.
  pub const ADAM7: Self = Self(1);
}
impl core::fmt::Debug for PngInterlaceMethod {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      PngInterlaceMethod::NO_INTERLACE => write!(f, "NoInterlace"),
      PngInterlaceMethod::ADAM7 => write!(f, "Adam7"),
      other => write!(f, "Illegal({})", other.0),
    }
  }
}

#[cfg(test)]
fn header_for(width: u32, bit_depth: u8, color_type: PngColorType) -> PngHeader {
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
fn test_bytes_per_scanline_rounds_partial_bytes_up() {
  assert_eq!(header_for(1, 1, PngColorType::Y).bytes_per_scanline().unwrap(), 1);
  assert_eq!(header_for(8, 1, PngColorType::Y).bytes_per_scanline().unwrap(), 1);
  assert_eq!(header_for(9, 1, PngColorType::Y).bytes_per_scanline().unwrap(), 2);
  assert_eq!(header_for(3, 2, PngColorType::INDEX).bytes_per_scanline().unwrap(), 1);
  assert_eq!(header_for(5, 8, PngColorType::RGB).bytes_per_scanline().unwrap(), 15);
  assert_eq!(header_for(5, 16, PngColorType::RGBA).bytes_per_scanline().unwrap(), 40);
}

#[test]
fn test_filter_offset_is_at_least_one_byte() {
  assert_eq!(header_for(4, 1, PngColorType::Y).filter_offset(), 1);
  assert_eq!(header_for(4, 4, PngColorType::INDEX).filter_offset(), 1);
  assert_eq!(header_for(4, 8, PngColorType::YA).filter_offset(), 2);
  assert_eq!(header_for(4, 8, PngColorType::RGB).filter_offset(), 3);
  assert_eq!(header_for(4, 16, PngColorType::RGB).filter_offset(), 6);
  assert_eq!(header_for(4, 16, PngColorType::RGBA).filter_offset(), 8);
}
