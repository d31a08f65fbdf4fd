//! One slot of a canonical Huffman table.

use crate::error::{PngError, PngResult};

/// A symbol's code within a canonical Huffman table.
///
/// Tables are just arrays of these, indexed by symbol. A `code_len` of zero
/// means the symbol doesn't participate in the code at all.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TreeEntry {
  pub(crate) code: u16,
  pub(crate) code_len: u16,
}
impl core::fmt::Debug for TreeEntry {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    if self.code_len == 0 {
      write!(f, "TE {{ absent }}")
    } else {
      let full = format!("{:016b}", self.code);
      write!(f, "TE {{ \"{}\" }}", &full[(16 - self.code_len) as usize..])
    }
  }
}

impl TreeEntry {
  /// Fills in every entry's `code` from the already-set `code_len`s,
  /// following RFC 1951 section 3.2.2.
  ///
  /// Entries with `code_len == 0` are left untouched. Fails when the lengths
  /// describe an oversubscribed code (a code would run past its own length).
  pub(crate) fn assign_codes(tree: &mut [TreeEntry]) -> PngResult<()> {
    assert!(!tree.is_empty(), "it's a programmer error to assign codes in an empty tree");

    // 1) count how many codes exist at each length.
    let mut length_counts = [0_u16; 16];
    for te in tree.iter() {
      if let Some(count) = length_counts.get_mut(usize::from(te.code_len)) {
        *count += 1;
      }
    }
    length_counts[0] = 0;

    // 2) the smallest code at each length follows from the counts below it.
    let mut next_code = [0_u16; 16];
    let mut code = 0_u16;
    for bits in 1..16 {
      code = (code + length_counts[bits - 1]) << 1;
      next_code[bits] = code;
    }

    // 3) hand out consecutive codes in symbol order within each length.
    for te in tree.iter_mut() {
      let len = usize::from(te.code_len);
      if len != 0 {
        if next_code[len] & !((1 << len) - 1) != 0 {
          return Err(PngError::BadDynamicHuffmanTreeData);
        }
        te.code = next_code[len];
        next_code[len] += 1;
      }
    }

    Ok(())
  }
}

#[test]
fn test_assign_codes_small_rfc_example() {
  let mut tree = [
    TreeEntry { code_len: 2, code: 0 },
    TreeEntry { code_len: 1, code: 0 },
    TreeEntry { code_len: 3, code: 0 },
    TreeEntry { code_len: 3, code: 0 },
  ];
  TreeEntry::assign_codes(&mut tree).unwrap();
  let expected = [
    TreeEntry { code_len: 2, code: 0b10 },
    TreeEntry { code_len: 1, code: 0b0 },
    TreeEntry { code_len: 3, code: 0b110 },
    TreeEntry { code_len: 3, code: 0b111 },
  ];
  assert_eq!(tree, expected);
}

#[test]
fn test_assign_codes_abcdefgh_rfc_example() {
  let mut tree = [3, 3, 3, 3, 3, 2, 4, 4].map(|code_len| TreeEntry { code_len, code: 0 });
  TreeEntry::assign_codes(&mut tree).unwrap();
  let expected_codes = [0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111];
  for (te, expected) in tree.iter().zip(expected_codes) {
    assert_eq!(te.code, expected);
  }
}

#[test]
fn test_assign_codes_rejects_oversubscribed_lengths() {
  // five 2-bit codes can't exist.
  let mut tree = [2, 2, 2, 2, 2].map(|code_len| TreeEntry { code_len, code: 0 });
  assert_eq!(TreeEntry::assign_codes(&mut tree), Err(PngError::BadDynamicHuffmanTreeData));
}
