//! The code-length alphabet a dynamic block uses to describe its real codes.

use crate::{
  bit_source::BitSource,
  error::{PngError, PngResult},
  tree_entry::TreeEntry,
};

/// The 19-symbol alphabet of RFC 1951 section 3.2.7: literal lengths 0–15,
/// plus the three repeat instructions 16/17/18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct CodeLengthAlphabet {
  pub(crate) tree: [TreeEntry; Self::COUNT],
  min_code_len: u16,
  max_code_len: u16,
}
impl CodeLengthAlphabet {
  pub(crate) const COUNT: usize = 19;

  /// Recomputes the codes (and the min/max match bounds) after the
  /// `code_len`s have been set.
  pub fn refresh(&mut self) -> PngResult<()> {
    TreeEntry::assign_codes(&mut self.tree)?;

    self.min_code_len = 0;
    self.max_code_len = 0;
    for te in self.tree.iter().copied() {
      if te.code_len == 0 {
        continue;
      }
      if self.min_code_len == 0 {
        self.min_code_len = te.code_len;
      }
      self.min_code_len = self.min_code_len.min(te.code_len);
      self.max_code_len = self.max_code_len.max(te.code_len);
    }
    Ok(())
  }

  /// Reads code bits MSB-first until they match a symbol, and returns that
  /// symbol's index.
  fn pull_and_match(&self, bits: &mut BitSource<'_, '_>) -> PngResult<usize> {
    if self.max_code_len == 0 {
      return Err(PngError::CouldNotFindCodeLengthSymbol);
    }
    let mut key = TreeEntry {
      code: bits.next_bits_msb(u32::from(self.min_code_len))? as u16,
      code_len: self.min_code_len,
    };
    loop {
      if let Some(pos) = self.tree.iter().position(|&te| te == key) {
        return Ok(pos);
      }
      // longer candidate codes grow from the bottom, the same way
      // `next_bits_msb` reads.
      key.code = (key.code << 1) | bits.next_one_bit()? as u16;
      key.code_len += 1;
      if key.code_len > self.max_code_len {
        return Err(PngError::CouldNotFindCodeLengthSymbol);
      }
    }
  }

  /// Decodes `lengths.len()` code lengths into `lengths`, expanding the
  /// repeat instructions.
  ///
  /// The caller hands in one buffer covering HLIT + HDIST entries, so a
  /// repeat may legally carry from the last literal/length code into the
  /// distance codes.
  pub fn fill_code_lengths(
    &self, lengths: &mut [u16], bits: &mut BitSource<'_, '_>,
  ) -> PngResult<()> {
    let mut acquired = 0_usize;
    while acquired < lengths.len() {
      let symbol = self.pull_and_match(bits)? as u16;
      match symbol {
        0..=15 => {
          lengths[acquired] = symbol;
          acquired += 1;
        }
        16 => {
          if acquired == 0 {
            return Err(PngError::BadDynamicHuffmanTreeData);
          }
          let repeat = 3 + bits.next_bits_lsb(2)? as usize;
          let copied = lengths[acquired - 1];
          if acquired + repeat > lengths.len() {
            return Err(PngError::BadDynamicHuffmanTreeData);
          }
          lengths[acquired..acquired + repeat].fill(copied);
          acquired += repeat;
        }
        17 => {
          let repeat = 3 + bits.next_bits_lsb(3)? as usize;
          if acquired + repeat > lengths.len() {
            return Err(PngError::BadDynamicHuffmanTreeData);
          }
          lengths[acquired..acquired + repeat].fill(0);
          acquired += repeat;
        }
        18 => {
          let repeat = 11 + bits.next_bits_lsb(7)? as usize;
          if acquired + repeat > lengths.len() {
            return Err(PngError::BadDynamicHuffmanTreeData);
          }
          lengths[acquired..acquired + repeat].fill(0);
          acquired += repeat;
        }
        _ => return Err(PngError::CouldNotFindCodeLengthSymbol),
      }
    }
    Ok(())
  }
}
