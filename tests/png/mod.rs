use unpng::{decode_png_to_bitmap, png_crc32, Bitmap, PngError, RGBA8888};
use walkdir::WalkDir;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

fn chunk(ty: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  let mut ty_and_data = ty.to_vec();
  ty_and_data.extend_from_slice(data);
  out.extend_from_slice(&png_crc32(&ty_and_data).to_be_bytes());
  out
}

fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
  ihdr_full(width, height, bit_depth, color_type, 0, 0, 0)
}

fn ihdr_full(
  width: u32, height: u32, bit_depth: u8, color_type: u8, compression: u8, filter: u8,
  interlace: u8,
) -> Vec<u8> {
  let mut data = Vec::new();
  data.extend_from_slice(&width.to_be_bytes());
  data.extend_from_slice(&height.to_be_bytes());
  data.extend_from_slice(&[bit_depth, color_type, compression, filter, interlace]);
  chunk(b"IHDR", &data)
}

fn png_file(chunks: &[Vec<u8>]) -> Vec<u8> {
  let mut out = SIGNATURE.to_vec();
  for c in chunks {
    out.extend_from_slice(c);
  }
  out
}

/// Compresses filtered scanline bytes the way an encoder would.
fn zlib(filtered: &[u8]) -> Vec<u8> {
  miniz_oxide::deflate::compress_to_vec_zlib(filtered, 6)
}

fn rgba(r: u8, g: u8, b: u8, a: u8) -> RGBA8888 {
  RGBA8888 { r, g, b, a }
}

/// Writes deflate elements LSB-first, for the hand-made streams.
struct BitWriter {
  bytes: Vec<u8>,
  bit: u32,
}
impl BitWriter {
  fn new() -> Self {
    Self { bytes: Vec::new(), bit: 8 }
  }
  fn push_bits_lsb(&mut self, count: u32, value: u32) {
    for i in 0..count {
      if self.bit == 8 {
        self.bytes.push(0);
        self.bit = 0;
      }
      let last = self.bytes.last_mut().unwrap();
      *last |= (((value >> i) & 1) as u8) << self.bit;
      self.bit += 1;
    }
  }
  fn push_code_msb(&mut self, count: u32, code: u32) {
    for i in (0..count).rev() {
      self.push_bits_lsb(1, (code >> i) & 1);
    }
  }
  /// Wraps the written deflate body into a zlib stream.
  fn into_zlib(self) -> Vec<u8> {
    let mut out = vec![0x78, 0x01];
    out.extend_from_slice(&self.bytes);
    out.extend_from_slice(&[0, 0, 0, 0]); // adler-32 goes unchecked
    out
  }
}

#[test]
fn test_one_red_truecolour_pixel() {
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    chunk(b"IDAT", &zlib(&[0, 255, 0, 0])),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(bitmap.width, 1);
  assert_eq!(bitmap.height, 1);
  assert_eq!(bitmap.pixels, vec![rgba(255, 0, 0, 255)]);
}

#[test]
fn test_two_by_two_one_bit_greyscale() {
  // pixels (0,1,1,0) in raster order, one filter-0 scanline per row.
  let filtered = [0, 0b0100_0000, 0, 0b1000_0000];
  let png = png_file(&[
    ihdr(2, 2, 1, 0),
    chunk(b"IDAT", &zlib(&filtered)),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  let black = rgba(0, 0, 0, 255);
  let white = rgba(255, 255, 255, 255);
  assert_eq!(bitmap.pixels, vec![black, white, white, black]);
}

#[test]
fn test_indexed_two_bit_palette_lookup() {
  let palette = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
  let png = png_file(&[
    ihdr(4, 1, 2, 3),
    chunk(b"PLTE", &palette),
    chunk(b"IDAT", &zlib(&[0, 0b00_01_10_11])),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(
    bitmap.pixels,
    vec![
      rgba(10, 20, 30, 255),
      rgba(40, 50, 60, 255),
      rgba(70, 80, 90, 255),
      rgba(100, 110, 120, 255)
    ]
  );
}

#[test]
fn test_stored_deflate_block_only() {
  // a hand-written zlib stream holding one uncompressed block.
  let filtered = [0, 10, 20, 30, 40, 50, 60];
  let mut zlib_bytes = vec![0x78, 0x01, 0x01]; // CMF, FLG, then BFINAL=1 BTYPE=00
  zlib_bytes.extend_from_slice(&(filtered.len() as u16).to_le_bytes());
  zlib_bytes.extend_from_slice(&(!(filtered.len() as u16)).to_le_bytes());
  zlib_bytes.extend_from_slice(&filtered);
  zlib_bytes.extend_from_slice(&[0, 0, 0, 0]);
  let png = png_file(&[
    ihdr(2, 1, 8, 2),
    chunk(b"IDAT", &zlib_bytes),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(bitmap.pixels, vec![rgba(10, 20, 30, 255), rgba(40, 50, 60, 255)]);
}

#[test]
fn test_fixed_huffman_with_258_byte_repeat() {
  // 259 greyscale pixels in one scanline: the filter byte, one literal, and
  // then a maximum-length copy at distance 1.
  let mut w = BitWriter::new();
  w.push_bits_lsb(1, 1); // BFINAL
  w.push_bits_lsb(2, 0b01); // fixed huffman
  w.push_code_msb(8, 0b00110000); // literal 0: the filter type byte
  w.push_code_msb(8, 0b00110000 + 97); // literal 97
  w.push_code_msb(8, 0b11000101); // symbol 285: length 258
  w.push_code_msb(5, 0); // distance symbol 0: distance 1
  w.push_code_msb(7, 0); // end of block
  let png = png_file(&[
    ihdr(259, 1, 8, 0),
    chunk(b"IDAT", &w.into_zlib()),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(bitmap.pixels.len(), 259);
  assert!(bitmap.pixels.iter().all(|&p| p == rgba(97, 97, 97, 255)));
}

#[test]
fn test_multiple_idat_chunks_decode_like_one() {
  let mut filtered = Vec::new();
  for y in 0..4_u8 {
    filtered.push(0);
    for x in 0..4_u8 {
      filtered.extend_from_slice(&[x * 16, y * 16, x * y, 255 - x]);
    }
  }
  let zlib_bytes = zlib(&filtered);
  let single = png_file(&[
    ihdr(4, 4, 8, 6),
    chunk(b"IDAT", &zlib_bytes),
    chunk(b"IEND", &[]),
  ]);
  // the same stream over three IDAT chunks with a zero-length one at a seam.
  let split = png_file(&[
    ihdr(4, 4, 8, 6),
    chunk(b"IDAT", &zlib_bytes[..5]),
    chunk(b"IDAT", &[]),
    chunk(b"IDAT", &zlib_bytes[5..]),
    chunk(b"IEND", &[]),
  ]);
  let from_single = decode_png_to_bitmap(&single).unwrap();
  let from_split = decode_png_to_bitmap(&split).unwrap();
  assert_eq!(from_single, from_split);
  assert_eq!(from_single.pixels.len(), 16);
}

#[test]
fn test_up_filter_carries_the_previous_row() {
  // row 0 stored plain, row 1 as deltas against row 0.
  let filtered = [0, 10, 20, 2, 5, 7];
  let png = png_file(&[
    ihdr(2, 2, 8, 0),
    chunk(b"IDAT", &zlib(&filtered)),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  let grey = |y| rgba(y, y, y, 255);
  assert_eq!(bitmap.pixels, vec![grey(10), grey(20), grey(15), grey(27)]);
}

#[test]
fn test_sixteen_bit_greyscale_keeps_the_high_bytes() {
  let filtered = [0, 0x12, 0x34, 0xAB, 0xCD];
  let png = png_file(&[
    ihdr(2, 1, 16, 0),
    chunk(b"IDAT", &zlib(&filtered)),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(bitmap.pixels, vec![rgba(0x12, 0x12, 0x12, 255), rgba(0xAB, 0xAB, 0xAB, 255)]);
}

#[test]
fn test_ancillary_chunks_are_skipped_even_with_bad_crcs() {
  let mut text = chunk(b"tEXt", b"Comment\0not checked");
  let crc_byte = text.len() - 2;
  text[crc_byte] ^= 0xFF; // ancillary CRCs aren't verified
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    text,
    chunk(b"IDAT", &zlib(&[0, 1, 2, 3])),
    chunk(b"sRGB", &[0]),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = decode_png_to_bitmap(&png).unwrap();
  assert_eq!(bitmap.pixels, vec![rgba(1, 2, 3, 255)]);
}

#[test]
fn test_output_length_always_matches_the_dimensions() {
  for (width, height) in [(1_u32, 1_u32), (7, 5), (13, 2), (40, 11)] {
    let line = width as usize; // greyscale, 8-bit
    let mut filtered = Vec::new();
    for y in 0..height {
      filtered.push(0);
      filtered.extend((0..line).map(|x| (x as u8).wrapping_mul(y as u8 + 1)));
    }
    let png = png_file(&[
      ihdr(width, height, 8, 0),
      chunk(b"IDAT", &zlib(&filtered)),
      chunk(b"IEND", &[]),
    ]);
    let bitmap = decode_png_to_bitmap(&png).unwrap();
    assert_eq!(bitmap.pixels.len(), (width * height) as usize);
  }
}

#[test]
fn test_every_critical_chunk_crc_in_a_built_file_verifies() {
  // the decoder verifies CRCs as it goes; this re-walks the container and
  // checks the stored values independently.
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    chunk(b"IDAT", &zlib(&[0, 255, 0, 0])),
    chunk(b"IEND", &[]),
  ]);
  let mut rest = &png[8..];
  while !rest.is_empty() {
    let length = u32::from_be_bytes(rest[0..4].try_into().unwrap()) as usize;
    let ty_and_data = &rest[4..8 + length];
    let stored = u32::from_be_bytes(rest[8 + length..12 + length].try_into().unwrap());
    assert_eq!(png_crc32(ty_and_data), stored);
    rest = &rest[12 + length..];
  }
}

#[test]
fn test_negative_truncated_signature() {
  assert_eq!(decode_png_to_bitmap(&SIGNATURE[..5]), Err(PngError::BadSignature));
  let mut wrong = SIGNATURE;
  wrong[0] = b'G';
  assert_eq!(decode_png_to_bitmap(&wrong), Err(PngError::BadSignature));
}

#[test]
fn test_negative_wrong_ihdr_length() {
  let short_ihdr = chunk(b"IHDR", &[0; 12]);
  let png = png_file(&[short_ihdr, chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::BadIhdr));
}

#[test]
fn test_negative_bad_header_fields() {
  let cases = [
    (ihdr_full(1, 1, 8, 5, 0, 0, 0), PngError::InvalidColourType),
    (ihdr_full(1, 1, 3, 0, 0, 0, 0), PngError::InvalidBitDepth),
    (ihdr_full(1, 1, 16, 3, 0, 0, 0), PngError::InvalidBitDepth),
    (ihdr_full(0, 1, 8, 2, 0, 0, 0), PngError::ZeroImageDimension),
    (ihdr_full(1, 0, 8, 2, 0, 0, 0), PngError::ZeroImageDimension),
    (ihdr_full(1, 1, 8, 2, 1, 0, 0), PngError::InvalidCompressionMethod),
    (ihdr_full(1, 1, 8, 2, 0, 1, 0), PngError::InvalidFilterMethod),
    (ihdr_full(1, 1, 8, 2, 0, 0, 2), PngError::InvalidInterlaceMethod),
  ];
  for (bad_ihdr, expected) in cases {
    let png = png_file(&[bad_ihdr, chunk(b"IEND", &[])]);
    assert_eq!(decode_png_to_bitmap(&png), Err(expected));
  }
}

#[test]
fn test_negative_interlaced_images_are_refused() {
  let png = png_file(&[
    ihdr_full(2, 2, 8, 0, 0, 0, 1),
    chunk(b"IDAT", &zlib(&[0, 1, 2, 0, 3, 4])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::InterlaceNotSupported));
}

#[test]
fn test_negative_two_palettes() {
  let plte = chunk(b"PLTE", &[1, 2, 3]);
  let png = png_file(&[
    ihdr(1, 1, 8, 3),
    plte.clone(),
    plte,
    chunk(b"IDAT", &zlib(&[0, 0])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::TwoPaletteChunks));
}

#[test]
fn test_negative_palette_problems() {
  // size not a multiple of three
  let png = png_file(&[
    ihdr(1, 1, 8, 3),
    chunk(b"PLTE", &[1, 2, 3, 4]),
    chunk(b"IDAT", &zlib(&[0, 0])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::InvalidPaletteSize));

  // indexed colour with no palette at all
  let png = png_file(&[
    ihdr(1, 1, 8, 3),
    chunk(b"IDAT", &zlib(&[0, 0])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::MissingPalette));

  // index past the end of the palette
  let png = png_file(&[
    ihdr(1, 1, 8, 3),
    chunk(b"PLTE", &[1, 2, 3, 4, 5, 6]),
    chunk(b"IDAT", &zlib(&[0, 5])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::BadPaletteIndex));
}

#[test]
fn test_negative_iend_before_idat() {
  let png = png_file(&[ihdr(1, 1, 8, 2), chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::MissingImageData));
}

#[test]
fn test_negative_crc_corrupted_idat() {
  // a wrong stored CRC is found when the chunk closes.
  let mut idat = chunk(b"IDAT", &zlib(&[0, 255, 0, 0]));
  let stored_crc_byte = idat.len() - 1;
  idat[stored_crc_byte] ^= 0xFF;
  let png = png_file(&[ihdr(1, 1, 8, 2), idat.clone(), chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::CrcMismatch));

  // flipping payload bytes instead may trip the inflater first, but it must
  // still fail.
  for i in 8..idat.len() - 4 {
    let mut idat = chunk(b"IDAT", &zlib(&[0, 255, 0, 0]));
    idat[i] ^= 0xFF;
    let png = png_file(&[ihdr(1, 1, 8, 2), idat, chunk(b"IEND", &[])]);
    assert!(decode_png_to_bitmap(&png).is_err(), "corrupt byte {i} slipped through");
  }
}

#[test]
fn test_negative_reserved_block_type() {
  let zlib_bytes = vec![0x78, 0x01, 0b0000_0111]; // BFINAL=1, BTYPE=11
  let png = png_file(&[ihdr(1, 1, 8, 2), chunk(b"IDAT", &zlib_bytes), chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::ReservedBlockType));
}

#[test]
fn test_negative_preset_dictionary_flag() {
  let zlib_bytes = vec![0x78, 0x20];
  let png = png_file(&[ihdr(1, 1, 8, 2), chunk(b"IDAT", &zlib_bytes), chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::PresetDictionaryNotSupported));
}

#[test]
fn test_negative_distance_larger_than_output() {
  let mut w = BitWriter::new();
  w.push_bits_lsb(1, 1);
  w.push_bits_lsb(2, 0b01);
  w.push_code_msb(7, 0b0000001); // symbol 257: length 3
  w.push_code_msb(5, 0); // distance 1 into an empty output
  let png = png_file(&[ihdr(1, 1, 8, 0), chunk(b"IDAT", &w.into_zlib()), chunk(b"IEND", &[])]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::InvalidDistance));
}

#[test]
fn test_negative_bad_filter_type_byte() {
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    chunk(b"IDAT", &zlib(&[5, 255, 0, 0])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::IllegalFilterType));
}

#[test]
fn test_negative_missing_iend() {
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    chunk(b"IDAT", &zlib(&[0, 255, 0, 0])),
    chunk(b"IBCD", &[1, 2]),
  ]);
  assert_eq!(decode_png_to_bitmap(&png), Err(PngError::MissingEndChunk));
}

#[test]
fn test_arbitrary_files_never_panic_the_decoder() {
  // every file in the test tree, valid PNG or not, must fail cleanly at
  // worst.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(_) => continue,
    };
    let _ = decode_png_to_bitmap(&v);
  }
  // and so must random garbage.
  for _ in 0..10 {
    let v = super::rand_bytes(1024);
    let _ = decode_png_to_bitmap(&v);
  }
}

#[test]
fn test_decoded_bitmap_casts_to_raw_rgba_bytes() {
  let png = png_file(&[
    ihdr(1, 1, 8, 2),
    chunk(b"IDAT", &zlib(&[0, 9, 8, 7])),
    chunk(b"IEND", &[]),
  ]);
  let bitmap: Bitmap<RGBA8888> = decode_png_to_bitmap(&png).unwrap();
  let raw: &[u8] = bytemuck::cast_slice(&bitmap.pixels);
  assert_eq!(raw, &[9, 8, 7, 255]);
}
