//! The distance alphabet of a dynamic deflate block.

use crate::{
  bit_source::BitSource,
  error::{PngError, PngResult},
  tree_entry::TreeEntry,
};

/// Distance symbols 0–29; 30 and 31 can be declared by a dynamic header but
/// never legally decoded. An all-absent table is allowed, for blocks that
/// contain no back-references at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DistAlphabet {
  pub(crate) tree: [TreeEntry; Self::COUNT],
  min_code_len: u16,
  max_code_len: u16,
}
impl Default for DistAlphabet {
  fn default() -> Self {
    Self { tree: [TreeEntry::default(); Self::COUNT], min_code_len: 0, max_code_len: 0 }
  }
}

impl DistAlphabet {
  pub(crate) const COUNT: usize = 32;

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
  /// symbol's index. Fails immediately on an all-absent table: such a block
  /// promised it had no back-references.
  pub fn pull_and_match(&self, bits: &mut BitSource<'_, '_>) -> PngResult<usize> {
    if self.max_code_len == 0 {
      return Err(PngError::CouldNotFindDistSymbol);
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
        return Err(PngError::CouldNotFindDistSymbol);
      }
    }
  }
}
