//! The literal/length alphabet of a deflate block.

use crate::{
  bit_source::BitSource,
  error::{PngError, PngResult},
  tree_entry::TreeEntry,
};

/// Symbols 0–255 are literal bytes, 256 ends the block, 257–285 start a
/// back-reference. 286 and 287 exist only so the fixed code is complete.
#[derive(Clone, Copy)]
pub(crate) struct LitLenAlphabet {
  pub(crate) tree: [TreeEntry; Self::COUNT],
  min_code_len: u16,
  max_code_len: u16,
}
impl core::fmt::Debug for LitLenAlphabet {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    write!(f, "LitLenAlphabet {{ tree: {:?} }}", &self.tree[..])
  }
}
impl Default for LitLenAlphabet {
  fn default() -> Self {
    Self { tree: [TreeEntry::default(); Self::COUNT], min_code_len: 0, max_code_len: 0 }
  }
}

impl LitLenAlphabet {
  pub(crate) const COUNT: usize = 288;

  /// The fixed code of RFC 1951 section 3.2.6, used by block type 01.
  pub fn fixed() -> PngResult<Self> {
    let mut out = Self::default();
    for (symbol, te) in out.tree.iter_mut().enumerate() {
      te.code_len = match symbol {
        0..=143 => 8,
        144..=255 => 9,
        256..=279 => 7,
        _ => 8,
      };
    }
    out.refresh()?;
    Ok(out)
  }

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
  pub fn pull_and_match(&self, bits: &mut BitSource<'_, '_>) -> PngResult<usize> {
    if self.max_code_len == 0 {
      return Err(PngError::CouldNotFindLitLenSymbol);
    }
    let mut key = TreeEntry {
      code: bits.next_bits_msb(u32::from(self.min_code_len))? as u16,
      code_len: self.min_code_len,
    };
    loop {
      if let Some(pos) = self.tree.iter().position(|&te| te == key) {
        return Ok(pos);
      }
      key.code = (key.code << 1) | bits.next_one_bit()? as u16;
      key.code_len += 1;
      if key.code_len > self.max_code_len {
        return Err(PngError::CouldNotFindLitLenSymbol);
      }
    }
  }
}

#[test]
fn test_fixed_code_matches_the_rfc_table() {
  /* Compressed with fixed Huffman codes:

      Lit Value     Bits    Codes
      ---------     ----    ----
      0 - 143       8       00110000 through 10111111
      144 - 255     9       110010000 through 111111111
      256 - 279     7       0000000 through 0010111
      280 - 287     8       11000000 through 11000111
  */
  let fixed = LitLenAlphabet::fixed().unwrap();
  assert_eq!(fixed.tree[0].code, 0b00110000);
  assert_eq!(fixed.tree[143].code, 0b10111111);
  assert_eq!(fixed.tree[144].code, 0b110010000);
  assert_eq!(fixed.tree[255].code, 0b111111111);
  assert_eq!(fixed.tree[256].code, 0b0000000);
  assert_eq!(fixed.tree[279].code, 0b0010111);
  assert_eq!(fixed.tree[280].code, 0b11000000);
  assert_eq!(fixed.tree[287].code, 0b11000111);
}
