//! The top-level decode: signature to pixels.

use crate::{
  chunk_source::{ChunkTy, PngChunkSource},
  error::{PngError, PngResult},
  filtering::reconstruct_scanline,
  image::Bitmap,
  inflate::decompress_idat,
  pixel_unpack::unpack_pixel_line,
  pixels::RGBA8888,
  png_header::{PngColorType, PngHeader},
};
use tracing::debug;

/// Decodes complete PNG bytes into an RGBA8 [Bitmap].
///
/// The pixel rows come out top-down. Ancillary chunks are skipped, critical
/// chunk CRCs are verified, and any malformed input fails the whole call
/// with the [PngError] naming the first problem found.
pub fn decode_png_to_bitmap(png: &[u8]) -> PngResult<Bitmap<RGBA8888>> {
  let mut chunks = PngChunkSource::from_png_bytes(png)?;
  let header = PngHeader::read_and_validate(&mut chunks)?;

  // geometry first: this is the cap on everything the stream may produce,
  // and it's also where interlaced images bow out.
  let filtered_len = header.filtered_stream_len()?;
  let bytes_per_scanline = header.bytes_per_scanline()?;
  let filter_offset = header.filter_offset();

  let mut palette: Vec<u8> = Vec::new();
  let (plte_length, mut ty) = chunks.read_next_critical_chunk_header()?;
  if ty == ChunkTy::PLTE {
    if plte_length % 3 != 0 || plte_length > 3 * (1 << header.bit_depth) {
      return Err(PngError::InvalidPaletteSize);
    }
    debug!(entries = plte_length / 3, "palette");
    palette.resize(plte_length as usize, 0);
    chunks.read(&mut palette)?;
    chunks.finish_chunk()?;
    ty = chunks.read_next_critical_chunk_header()?.1;
    if ty == ChunkTy::PLTE {
      return Err(PngError::TwoPaletteChunks);
    }
  }
  if ty == ChunkTy::IEND {
    return Err(PngError::MissingImageData);
  }
  if ty != ChunkTy::IDAT {
    return Err(PngError::UnknownCriticalChunk);
  }

  // the framer walks every IDAT chunk on its own; afterwards the last one
  // still needs its CRC closed out.
  let filtered = decompress_idat(&mut chunks, filtered_len)?;
  chunks.finish_chunk()?;

  let (_length, ty) = chunks.read_next_critical_chunk_header()?;
  if ty != ChunkTy::IEND {
    return Err(PngError::MissingEndChunk);
  }
  chunks.finish_chunk()?;

  if header.color_type == PngColorType::INDEX && palette.is_empty() {
    return Err(PngError::MissingPalette);
  }
  let palette: &[[u8; 3]] =
    bytemuck::try_cast_slice(&palette).map_err(|_| PngError::InvalidPaletteSize)?;

  if filtered.len() != filtered_len {
    return Err(PngError::FilteredBytesLengthMismatch);
  }

  let pixel_count = (header.width as usize)
    .checked_mul(header.height as usize)
    .ok_or(PngError::OutputOverflow)?;
  let mut pixels: Vec<RGBA8888> = Vec::with_capacity(pixel_count);
  let mut line = vec![0_u8; bytes_per_scanline];
  let mut prev_line = vec![0_u8; bytes_per_scanline];
  for filtered_line in filtered.chunks_exact(bytes_per_scanline + 1) {
    let (filter_type, data) = filtered_line.split_first().unwrap();
    line.copy_from_slice(data);
    reconstruct_scanline(*filter_type, filter_offset, &mut line, &prev_line)?;
    unpack_pixel_line(&line, header, palette, &mut pixels)?;
    core::mem::swap(&mut line, &mut prev_line);
  }

  debug!("image decoding finished successfully");
  Ok(Bitmap { width: header.width, height: header.height, pixels })
}
