//! The chunk framer: walks the length/type/data/CRC records of a PNG stream.

use crate::{
  crc32::Crc32,
  error::{PngError, PngResult},
};
use core::fmt::Write;
use tracing::trace;

/// The 4-byte type code of a chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkTy(pub(crate) [u8; 4]);
impl ChunkTy {
  /// Image header, always the first chunk.
  pub const IHDR: Self = Self(*b"IHDR");
  /// Palette, required for indexed colour.
  pub const PLTE: Self = Self(*b"PLTE");
  /// Image data, possibly split over several chunks.
  pub const IDAT: Self = Self(*b"IDAT");
  /// End of the image, always the last chunk.
  pub const IEND: Self = Self(*b"IEND");

  /// Ancillary chunks (bit 5 of the first type byte set) are safe to skip.
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    (self.0[0] & 32) != 0
  }
}
impl core::fmt::Debug for ChunkTy {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// Stateful reader for the chunk layer of a PNG stream.
///
/// At most one chunk is open at a time. While a chunk is open, data reads go
/// through a running CRC that started fresh at the chunk's type field, and
/// [`finish_chunk`](Self::finish_chunk) checks the stored CRC against it.
///
/// The `IDAT`-only entry points [`get`](Self::get) and [`read`](Self::read)
/// hide chunk boundaries: when one `IDAT` runs out they verify its CRC, open
/// the next chunk, demand that it's another `IDAT`, and keep going, so the
/// decompressor sees one unbroken byte stream.
pub struct PngChunkSource<'b> {
  bytes: &'b [u8],
  pos: usize,
  crc: Crc32,
  inside_chunk: bool,
  length: u32,
  bytes_read: u32,
}
impl core::fmt::Debug for PngChunkSource<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngChunkSource")
      .field("pos", &self.pos)
      .field("inside_chunk", &self.inside_chunk)
      .field("length", &self.length)
      .field("bytes_read", &self.bytes_read)
      .finish_non_exhaustive()
  }
}

impl<'b> PngChunkSource<'b> {
  /// Makes a source over bytes that *follow* the 8-byte PNG signature.
  #[inline]
  #[must_use]
  pub const fn new(bytes_after_signature: &'b [u8]) -> Self {
    Self {
      bytes: bytes_after_signature,
      pos: 0,
      crc: Crc32::new(),
      inside_chunk: false,
      length: 0,
      bytes_read: 0,
    }
  }

  /// Checks the signature of complete PNG bytes, then frames what follows.
  pub fn from_png_bytes(png: &'b [u8]) -> PngResult<Self> {
    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    if png.len() < 8 || png[..8] != PNG_SIGNATURE {
      return Err(PngError::BadSignature);
    }
    Ok(Self::new(&png[8..]))
  }

  #[inline]
  fn next_byte_raw(&mut self) -> PngResult<u8> {
    let b = *self.bytes.get(self.pos).ok_or(PngError::UnexpectedEndOfInput)?;
    self.pos += 1;
    Ok(b)
  }

  #[inline]
  fn next_byte_crc(&mut self) -> PngResult<u8> {
    let b = self.next_byte_raw()?;
    self.crc.update(b);
    Ok(b)
  }

  /// Forward seek within the input, used to pass over ancillary chunks.
  fn skip(&mut self, count: usize) -> PngResult<()> {
    if self.bytes.len() - self.pos < count {
      return Err(PngError::UnexpectedEndOfInput);
    }
    self.pos += count;
    Ok(())
  }

  /// Opens the next chunk: 4 length bytes (outside the CRC), then 4 type
  /// bytes (the first input to this chunk's CRC).
  pub fn read_chunk_header(&mut self) -> PngResult<(u32, ChunkTy)> {
    if self.inside_chunk {
      return Err(PngError::ChunkAlreadyOpen);
    }
    let mut length = 0_u32;
    for _ in 0..4 {
      length = (length << 8) | u32::from(self.next_byte_raw()?);
    }
    self.crc.reset();
    let mut ty = [0_u8; 4];
    for t in ty.iter_mut() {
      *t = self.next_byte_crc()?;
    }
    self.inside_chunk = true;
    self.length = length;
    self.bytes_read = 0;
    Ok((length, ChunkTy(ty)))
  }

  /// Opens the next *critical* chunk, skipping any ancillary chunks on the
  /// way (data and CRC alike, unverified).
  pub fn read_next_critical_chunk_header(&mut self) -> PngResult<(u32, ChunkTy)> {
    loop {
      let (length, ty) = self.read_chunk_header()?;
      if ty.is_ancillary() {
        trace!(ty = ?ty, length, "skipping ancillary chunk");
        self.skip(length as usize + 4)?;
        self.crc.reset();
        self.inside_chunk = false;
        continue;
      }
      return Ok((length, ty));
    }
  }

  /// Reads one byte of the open chunk's data.
  ///
  /// Unlike [`get`](Self::get) this never crosses a chunk boundary: running
  /// off the end of the chunk is an error.
  pub fn read_u8(&mut self) -> PngResult<u8> {
    debug_assert!(self.inside_chunk);
    if self.bytes_read >= self.length {
      return Err(PngError::UnexpectedEndOfInput);
    }
    let b = self.next_byte_crc()?;
    self.bytes_read += 1;
    Ok(b)
  }

  /// Reads a big-endian `u32` from the open chunk's data.
  pub fn read_u32(&mut self) -> PngResult<u32> {
    let mut out = 0_u32;
    for _ in 0..4 {
      out = (out << 8) | u32::from(self.read_u8()?);
    }
    Ok(out)
  }

  /// Reads one byte of the `IDAT` logical stream.
  ///
  /// When the open chunk is exhausted this verifies its CRC and walks into
  /// the next `IDAT` chunk (skipping zero-length ones) before producing the
  /// byte.
  pub fn get(&mut self) -> PngResult<u8> {
    if self.bytes_read == self.length {
      self.advance_idat()?;
    }
    let b = self.next_byte_crc()?;
    self.bytes_read += 1;
    Ok(b)
  }

  /// Fills `dest` from the `IDAT` logical stream, crossing chunk boundaries
  /// as needed. Reading a non-`IDAT` critical chunk mid-fill is an error.
  pub fn read(&mut self, mut dest: &mut [u8]) -> PngResult<()> {
    while !dest.is_empty() {
      if self.bytes_read == self.length {
        self.advance_idat()?;
      }
      let available = (self.length - self.bytes_read) as usize;
      let (now, later) = dest.split_at_mut(available.min(dest.len()));
      for d in now.iter_mut() {
        *d = self.next_byte_crc()?;
      }
      self.bytes_read += now.len() as u32;
      dest = later;
    }
    Ok(())
  }

  /// Closes out the exhausted chunk and opens the next non-empty `IDAT`.
  fn advance_idat(&mut self) -> PngResult<()> {
    loop {
      self.finish_chunk()?;
      let (length, ty) = self.read_chunk_header()?;
      if ty != ChunkTy::IDAT {
        return Err(PngError::UnexpectedEndOfImageData);
      }
      trace!(length, "continuing into next IDAT chunk");
      if length != 0 {
        return Ok(());
      }
    }
  }

  /// Reads the open chunk's trailing CRC and checks it against the running
  /// CRC, then marks the chunk closed.
  pub fn finish_chunk(&mut self) -> PngResult<()> {
    debug_assert!(self.inside_chunk);
    let mut stored = 0_u32;
    for _ in 0..4 {
      stored = (stored << 8) | u32::from(self.next_byte_raw()?);
    }
    if self.crc.finished() != stored {
      return Err(PngError::CrcMismatch);
    }
    self.crc.reset();
    self.inside_chunk = false;
    self.bytes_read = 0;
    Ok(())
  }
}

#[cfg(test)]
fn test_chunk(ty: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  let mut ty_and_data = ty.to_vec();
  ty_and_data.extend_from_slice(data);
  out.extend_from_slice(&crate::png_crc32(&ty_and_data).to_be_bytes());
  out
}

#[test]
fn test_read_chunk_header_and_finish() {
  let bytes = test_chunk(b"IEND", &[]);
  let mut source = PngChunkSource::new(&bytes);
  let (length, ty) = source.read_chunk_header().unwrap();
  assert_eq!(length, 0);
  assert_eq!(ty, ChunkTy::IEND);
  source.finish_chunk().unwrap();
}

#[test]
fn test_crc_mismatch_is_detected() {
  let mut bytes = test_chunk(b"IEND", &[]);
  let crc_byte = bytes.len() - 1;
  bytes[crc_byte] ^= 1;
  let mut source = PngChunkSource::new(&bytes);
  source.read_chunk_header().unwrap();
  assert_eq!(source.finish_chunk(), Err(PngError::CrcMismatch));
}

#[test]
fn test_ancillary_chunks_are_skipped() {
  let mut bytes = test_chunk(b"tIME", &[0, 0, 0, 0, 0, 0, 0]);
  bytes.extend_from_slice(&test_chunk(b"pHYs", &[1; 9]));
  bytes.extend_from_slice(&test_chunk(b"IEND", &[]));
  let mut source = PngChunkSource::new(&bytes);
  let (length, ty) = source.read_next_critical_chunk_header().unwrap();
  assert_eq!((length, ty), (0, ChunkTy::IEND));
  source.finish_chunk().unwrap();
}

#[test]
fn test_idat_seam_is_invisible() {
  // data split over three IDAT chunks, one of them empty.
  let mut bytes = test_chunk(b"IDAT", &[1, 2, 3]);
  bytes.extend_from_slice(&test_chunk(b"IDAT", &[]));
  bytes.extend_from_slice(&test_chunk(b"IDAT", &[4, 5]));
  bytes.extend_from_slice(&test_chunk(b"IEND", &[]));
  let mut source = PngChunkSource::new(&bytes);
  let (_, ty) = source.read_chunk_header().unwrap();
  assert_eq!(ty, ChunkTy::IDAT);
  let mut dest = [0_u8; 5];
  source.read(&mut dest).unwrap();
  assert_eq!(dest, [1, 2, 3, 4, 5]);
  source.finish_chunk().unwrap();
  let (_, ty) = source.read_next_critical_chunk_header().unwrap();
  assert_eq!(ty, ChunkTy::IEND);
}

#[test]
fn test_idat_seam_rejects_other_chunks() {
  let mut bytes = test_chunk(b"IDAT", &[1, 2]);
  bytes.extend_from_slice(&test_chunk(b"IEND", &[]));
  let mut source = PngChunkSource::new(&bytes);
  source.read_chunk_header().unwrap();
  let mut dest = [0_u8; 4];
  assert_eq!(source.read(&mut dest), Err(PngError::UnexpectedEndOfImageData));
}

#[test]
fn test_double_open_is_an_error() {
  let bytes = test_chunk(b"IDAT", &[1]);
  let mut source = PngChunkSource::new(&bytes);
  source.read_chunk_header().unwrap();
  assert_eq!(source.read_chunk_header(), Err(PngError::ChunkAlreadyOpen));
}
