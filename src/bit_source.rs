//! Bit-level access to the `IDAT` logical stream, for the inflate loop.

use crate::{chunk_source::PngChunkSource, error::PngResult};

/// Reads the deflate stream bit by bit, least significant bit first.
///
/// Multi-bit *integers* in deflate arrive LSB-first
/// ([`next_bits_lsb`](Self::next_bits_lsb)), while Huffman *codes* arrive
/// with their own most significant bit first
/// ([`next_bits_msb`](Self::next_bits_msb)). This reader refills one byte at
/// a time from the chunk framer, so it naturally follows the stream across
/// `IDAT` boundaries.
pub(crate) struct BitSource<'s, 'b> {
  chunks: &'s mut PngChunkSource<'b>,
  temp_byte: u8,
  remaining_bits: u32,
}
impl core::fmt::Debug for BitSource<'_, '_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    if self.remaining_bits > 0 {
      write!(
        f,
        "BitSource {{ bits: {bits:0width$b} }}",
        bits = self.temp_byte,
        width = self.remaining_bits as usize
      )
    } else {
      write!(f, "BitSource {{ bits: || }}")
    }
  }
}

impl<'s, 'b> BitSource<'s, 'b> {
  #[inline]
  pub fn new(chunks: &'s mut PngChunkSource<'b>) -> Self {
    Self { chunks, temp_byte: 0, remaining_bits: 0 }
  }

  pub fn next_one_bit(&mut self) -> PngResult<bool> {
    if self.remaining_bits == 0 {
      self.temp_byte = self.chunks.get()?;
      self.remaining_bits = 8;
    }
    let bit = (self.temp_byte & 1) != 0;
    self.temp_byte >>= 1;
    self.remaining_bits -= 1;
    Ok(bit)
  }

  /// The next `count` bits as an integer, first bit in the lowest position.
  /// Straddles byte boundaries as needed (`count` up to 16 can touch three
  /// bytes).
  pub fn next_bits_lsb(&mut self, count: u32) -> PngResult<u32> {
    debug_assert!(count <= 16);
    let mut out = 0_u32;
    for position in 0..count {
      out |= u32::from(self.next_one_bit()?) << position;
    }
    Ok(out)
  }

  /// The next `count` bits as an integer, first bit in the highest position.
  /// This is the orientation Huffman code bits use.
  pub fn next_bits_msb(&mut self, count: u32) -> PngResult<u32> {
    debug_assert!(count <= 16);
    let mut out = 0_u32;
    for _ in 0..count {
      out = (out << 1) | u32::from(self.next_one_bit()?);
    }
    Ok(out)
  }

  /// Throws away whatever is left of the current byte. Stored blocks start
  /// at a byte boundary.
  #[inline]
  pub fn align_to_byte(&mut self) {
    self.remaining_bits = 0;
  }

  pub fn get_bfinal(&mut self) -> PngResult<bool> {
    self.next_one_bit()
  }

  pub fn get_btype(&mut self) -> PngResult<u32> {
    self.next_bits_lsb(2)
  }

  /// Byte-aligned bulk read straight from the chunk framer, bypassing the
  /// bit buffer. Only valid right after [`align_to_byte`](Self::align_to_byte).
  pub fn read_aligned(&mut self, dest: &mut [u8]) -> PngResult<()> {
    debug_assert_eq!(self.remaining_bits, 0);
    self.chunks.read(dest)
  }
}

#[cfg(test)]
fn idat_bit_source(payload: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
  out.extend_from_slice(b"IDAT");
  out.extend_from_slice(payload);
  let mut ty_and_data = b"IDAT".to_vec();
  ty_and_data.extend_from_slice(payload);
  out.extend_from_slice(&crate::png_crc32(&ty_and_data).to_be_bytes());
  out
}

#[test]
fn test_bits_come_out_lsb_first() {
  let bytes = idat_bit_source(&[0b1010_0110, 0b0000_1111]);
  let mut chunks = PngChunkSource::new(&bytes);
  chunks.read_chunk_header().unwrap();
  let mut bits = BitSource::new(&mut chunks);
  assert!(!bits.next_one_bit().unwrap());
  assert!(bits.next_one_bit().unwrap());
  assert!(bits.next_one_bit().unwrap());
  // the remaining five bits of byte 0 arrive in stream order 0,0,1,0,1,
  // and LSB-first packing puts the first bit lowest: 0b10100.
  assert_eq!(bits.next_bits_lsb(5).unwrap(), 0b10100);
  assert_eq!(bits.next_bits_lsb(8).unwrap(), 0b0000_1111);
}

#[test]
fn test_msb_reads_reverse_the_bit_order() {
  let bytes = idat_bit_source(&[0b0000_0110]);
  let mut chunks = PngChunkSource::new(&bytes);
  chunks.read_chunk_header().unwrap();
  let mut bits = BitSource::new(&mut chunks);
  // stream order is 0,1,1,0..., packed MSB-first that's 0b0110.
  assert_eq!(bits.next_bits_msb(4).unwrap(), 0b0110);
}

#[test]
fn test_align_to_byte_discards_partial_bits() {
  let bytes = idat_bit_source(&[0xFF, 0x21]);
  let mut chunks = PngChunkSource::new(&bytes);
  chunks.read_chunk_header().unwrap();
  let mut bits = BitSource::new(&mut chunks);
  bits.next_one_bit().unwrap();
  bits.align_to_byte();
  assert_eq!(bits.next_bits_lsb(8).unwrap(), 0x21);
}
