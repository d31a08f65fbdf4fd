//! Inflates the zlib stream held in the `IDAT` chunks.

use crate::{
  bit_source::BitSource,
  chunk_source::PngChunkSource,
  code_length_alphabet::CodeLengthAlphabet,
  dist_alphabet::DistAlphabet,
  error::{PngError, PngResult},
  lit_len_alphabet::LitLenAlphabet,
};
use tracing::{debug, trace};

/// Decompresses the `IDAT` logical stream into the filtered scanline bytes.
///
/// `chunks` must have the first `IDAT` chunk open; the framer walks across
/// any further `IDAT` chunks on its own. The caller still closes the final
/// chunk afterwards.
///
/// `max_output` is the byte count the image geometry calls for; producing
/// more than that is an error, so a hostile stream can't balloon memory
/// past the declared dimensions.
pub fn decompress_idat(chunks: &mut PngChunkSource<'_>, max_output: usize) -> PngResult<Vec<u8>> {
  let cmf = chunks.get()?;
  let flg = chunks.get()?;
  trace!(cmf, flg, "zlib stream header");
  if (flg & 0b10_0000) != 0 {
    return Err(PngError::PresetDictionaryNotSupported);
  }

  let fixed_lit_len = LitLenAlphabet::fixed()?;
  let mut out: Vec<u8> = Vec::with_capacity(max_output);
  let mut bits = BitSource::new(chunks);

  loop {
    let bfinal = bits.get_bfinal()?;
    match bits.get_btype()? {
      0 => {
        // stored: byte-aligned LEN then the raw payload, no coding at all.
        bits.align_to_byte();
        let len = bits.next_bits_lsb(16)? as usize;
        let _nlen = bits.next_bits_lsb(16)?;
        trace!(len, "stored block");
        let start = out.len();
        if max_output - start < len {
          return Err(PngError::OutputOverflow);
        }
        out.resize(start + len, 0);
        bits.read_aligned(&mut out[start..])?;
      }
      1 => {
        trace!("fixed huffman block");
        inflate_block(&mut bits, &fixed_lit_len, None, &mut out, max_output)?;
      }
      2 => {
        trace!("dynamic huffman block");
        let (lit_len, dist) = read_dynamic_alphabets(&mut bits)?;
        inflate_block(&mut bits, &lit_len, Some(&dist), &mut out, max_output)?;
      }
      _ => return Err(PngError::ReservedBlockType),
    }
    if bfinal {
      break;
    }
  }

  // the Adler-32 trailer is consumed, but not checked.
  bits.align_to_byte();
  bits.read_aligned(&mut [0_u8; 4])?;

  debug!(len = out.len(), "inflated image data");
  Ok(out)
}

/// Reads a dynamic block's embedded code descriptions (RFC 1951 section
/// 3.2.7) and builds its two alphabets.
fn read_dynamic_alphabets(
  bits: &mut BitSource<'_, '_>,
) -> PngResult<(LitLenAlphabet, DistAlphabet)> {
  let hlit = bits.next_bits_lsb(5)? as usize + 257;
  let hdist = bits.next_bits_lsb(5)? as usize + 1;
  let hclen = bits.next_bits_lsb(4)? as usize + 4;

  // the order the code-length code's own lengths are stored in.
  const CODE_LENGTH_ORDER: [usize; 19] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];
  let mut code_lengths = CodeLengthAlphabet::default();
  for &symbol in CODE_LENGTH_ORDER.iter().take(hclen) {
    code_lengths.tree[symbol].code_len = bits.next_bits_lsb(3)? as u16;
  }
  code_lengths.refresh()?;

  // both alphabets' lengths form one sequence, so repeats may span the
  // boundary between them.
  let mut lengths = [0_u16; LitLenAlphabet::COUNT + DistAlphabet::COUNT];
  code_lengths.fill_code_lengths(&mut lengths[..hlit + hdist], bits)?;

  let mut lit_len = LitLenAlphabet::default();
  for (te, len) in lit_len.tree.iter_mut().zip(lengths[..hlit].iter()) {
    te.code_len = *len;
  }
  lit_len.refresh()?;

  let mut dist = DistAlphabet::default();
  for (te, len) in dist.tree.iter_mut().zip(lengths[hlit..hlit + hdist].iter()) {
    te.code_len = *len;
  }
  dist.refresh()?;

  Ok((lit_len, dist))
}

/// Runs one Huffman-coded block to its end-of-block symbol.
///
/// `dist` is `None` in fixed mode, where distance codes are plain 5-bit
/// values read in stream order rather than a Huffman code.
fn inflate_block(
  bits: &mut BitSource<'_, '_>, lit_len: &LitLenAlphabet, dist: Option<&DistAlphabet>,
  out: &mut Vec<u8>, max_output: usize,
) -> PngResult<()> {
  loop {
    let symbol = lit_len.pull_and_match(bits)?;
    if symbol < 256 {
      if out.len() == max_output {
        return Err(PngError::OutputOverflow);
      }
      out.push(symbol as u8);
    } else if symbol == 256 {
      return Ok(());
    } else {
      let length = decode_length(bits, symbol)?;
      let dist_symbol = match dist {
        Some(alphabet) => alphabet.pull_and_match(bits)?,
        None => bits.next_bits_msb(5)? as usize,
      };
      let distance = decode_distance(bits, dist_symbol)?;
      if distance > out.len() {
        return Err(PngError::InvalidDistance);
      }
      if max_output - out.len() < length {
        return Err(PngError::OutputOverflow);
      }
      // copy out of the output as it grows: with length > distance the
      // source overlaps the destination and the pattern repeats with
      // period `distance`, down to distance == 1 repeating one byte.
      let start = out.len() - distance;
      for i in start..start + length {
        let b = out[i];
        out.push(b);
      }
    }
  }
}

/// Base lengths and extra bits for symbols 257..=285 (RFC 1951 section
/// 3.2.5).
fn decode_length(bits: &mut BitSource<'_, '_>, symbol: usize) -> PngResult<usize> {
  Ok(match symbol {
    257..=264 => symbol - 254,
    265..=268 => 11 + (symbol - 265) * 2 + bits.next_bits_lsb(1)? as usize,
    269..=272 => 19 + (symbol - 269) * 4 + bits.next_bits_lsb(2)? as usize,
    273..=276 => 35 + (symbol - 273) * 8 + bits.next_bits_lsb(3)? as usize,
    277..=280 => 67 + (symbol - 277) * 16 + bits.next_bits_lsb(4)? as usize,
    281..=284 => 131 + (symbol - 281) * 32 + bits.next_bits_lsb(5)? as usize,
    285 => 258,
    _ => return Err(PngError::BadLengthSymbol),
  })
}

/// Base distances and extra bits for symbols 0..=29. Past symbol 3 the
/// bases double every two symbols, which is where the `symbol / 2 - 1`
/// extra-bit count comes from.
fn decode_distance(bits: &mut BitSource<'_, '_>, symbol: usize) -> PngResult<usize> {
  Ok(match symbol {
    0..=3 => 1 + symbol,
    4..=29 => {
      let extra_bits = symbol / 2 - 1;
      let base = (1_usize << extra_bits) * (symbol - extra_bits * 2) + 1;
      base + bits.next_bits_lsb(extra_bits as u32)? as usize
    }
    _ => return Err(PngError::BadDistanceSymbol),
  })
}
