//! Undoing the per-scanline filters.
//!
//! From the PNG spec:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.

use crate::error::{PngError, PngResult};

/// Reconstructs one filtered scanline in place.
///
/// `prev_line` is the already-reconstructed line above; for the first
/// scanline the caller passes a zeroed buffer of the same length, which is
/// what the spec's "treat missing neighbours as zero" rule amounts to.
/// `filter_offset` is the byte distance to the pixel on the left (1 for
/// sub-byte depths).
pub(crate) fn reconstruct_scanline(
  filter_type: u8, filter_offset: usize, line: &mut [u8], prev_line: &[u8],
) -> PngResult<()> {
  debug_assert_eq!(line.len(), prev_line.len());
  match filter_type {
    0 => (),
    1 => {
      // Sub: the first `filter_offset` bytes have no left neighbour.
      for i in 0..line.len() {
        let a = if i >= filter_offset { line[i - filter_offset] } else { 0 };
        line[i] = reconstruct_sub(line[i], a);
      }
    }
    2 => {
      // Up
      for (x, b) in line.iter_mut().zip(prev_line.iter()) {
        *x = reconstruct_up(*x, *b);
      }
    }
    3 => {
      // Average
      for i in 0..line.len() {
        let a = if i >= filter_offset { line[i - filter_offset] } else { 0 };
        line[i] = reconstruct_average(line[i], a, prev_line[i]);
      }
    }
    4 => {
      // Paeth
      for i in 0..line.len() {
        let (a, c) = if i >= filter_offset {
          (line[i - filter_offset], prev_line[i - filter_offset])
        } else {
          (0, 0)
        };
        line[i] = reconstruct_paeth(line[i], a, prev_line[i], c);
      }
    }
    _ => return Err(PngError::IllegalFilterType),
  }
  Ok(())
}

/// Reconstruct filter type 1, with `ra` the reconstructed byte to the left.
const fn reconstruct_sub(fx: u8, ra: u8) -> u8 {
  fx.wrapping_add(ra)
}

/// Reconstruct filter type 2, with `rb` the reconstructed byte above.
const fn reconstruct_up(fx: u8, rb: u8) -> u8 {
  fx.wrapping_add(rb)
}

/// Reconstruct filter type 3. The mean of `ra` and `rb` is taken exactly
/// (the sum can't be allowed to wrap) and floored.
const fn reconstruct_average(fx: u8, ra: u8, rb: u8) -> u8 {
  fx.wrapping_add(((ra as u16 + rb as u16) / 2) as u8)
}

/// Reconstruct filter type 4, with `rc` the reconstructed byte up-left.
const fn reconstruct_paeth(fx: u8, ra: u8, rb: u8, rc: u8) -> u8 {
  fx.wrapping_add(paeth_predictor(ra, rb, rc))
}

/// Picks whichever of left `a`, above `b`, up-left `c` is closest to
/// `a + b - c`, ties going to `a` then `b`.
///
/// The spec requires this exact evaluation order, and requires the
/// intermediate arithmetic not to overflow, hence the i32 math.
pub(crate) const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Applies a filter to `line` (the inverse of reconstruction), for tests.
#[cfg(test)]
fn filter_scanline(filter_type: u8, filter_offset: usize, line: &mut [u8], prev_line: &[u8]) {
  for i in (0..line.len()).rev() {
    let a = if i >= filter_offset { line[i - filter_offset] } else { 0 };
    let b = prev_line[i];
    let c = if i >= filter_offset { prev_line[i - filter_offset] } else { 0 };
    line[i] = match filter_type {
      0 => line[i],
      1 => line[i].wrapping_sub(a),
      2 => line[i].wrapping_sub(b),
      3 => line[i].wrapping_sub(((a as u16 + b as u16) / 2) as u8),
      _ => line[i].wrapping_sub(paeth_predictor(a, b, c)),
    };
  }
}

#[test]
fn test_paeth_predictor_properties() {
  let mut abc = vec![0_u8; 3 * 1024];
  getrandom::getrandom(&mut abc).unwrap();
  for triple in abc.chunks_exact(3) {
    let [a, b, c] = [triple[0], triple[1], triple[2]];
    let p = paeth_predictor(a, b, c);
    assert!(p == a || p == b || p == c, "paeth({a},{b},{c}) gave {p}");
    assert_eq!(paeth_predictor(a, a, a), a);
  }
  // ties prefer a, then b.
  assert_eq!(paeth_predictor(5, 5, 5), 5);
  assert_eq!(paeth_predictor(7, 7, 3), 7);
  assert_eq!(paeth_predictor(3, 9, 3), 9);
}

#[test]
fn test_every_filter_reconstructs_what_it_filtered() {
  let mut noise = vec![0_u8; 2 * 24];
  getrandom::getrandom(&mut noise).unwrap();
  let (prev_line, original) = noise.split_at(24);
  for filter_type in 0..=4 {
    for filter_offset in [1, 3, 4] {
      let mut line = original.to_vec();
      filter_scanline(filter_type, filter_offset, &mut line, prev_line);
      reconstruct_scanline(filter_type, filter_offset, &mut line, prev_line).unwrap();
      assert_eq!(line, original, "filter {filter_type} offset {filter_offset}");
    }
  }
}

#[test]
fn test_filter_types_past_four_are_rejected() {
  let mut line = [0_u8; 4];
  let prev_line = [0_u8; 4];
  assert_eq!(
    reconstruct_scanline(5, 1, &mut line, &prev_line),
    Err(PngError::IllegalFilterType)
  );
}
