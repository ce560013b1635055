//! The five PNG row filters.
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! Each filter predicts a byte from its neighbors and stores the difference,
//! all math being wrapping `u8` math:
//! * `a`: the byte one filter unit to the left (0 for the first unit).
//! * `b`: the byte directly above, in the previous row.
//! * `c`: the byte above `a`.
//!
//! The first row of each pass uses an all zero previous row.

use alloc::{vec, vec::Vec};
use core::fmt::Debug;

use crate::{config::Heuristic, FilterChoice, PngColorType, PngError, PngResult, IHDR};

/// The filter type byte that starts each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FilterType {
  None = 0,
  Sub = 1,
  Up = 2,
  Average = 3,
  Paeth = 4,
}
impl FilterType {
  /// All filter types, in tie-break order.
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];
}
impl TryFrom<u8> for FilterType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      other => return Err(PngError::IllegalFilterType(other)),
    })
  }
}

/// Picks whichever of `a`, `b`, or `c` is closest to `a + b - c`.
#[inline]
#[must_use]
pub const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note(Lokathor): The PNG spec is extremely specific that you shall not,
  // under any circumstances, alter the order of evaluation of this
  // expression's tests.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

#[inline]
#[must_use]
const fn average(a: u8, b: u8) -> u8 {
  ((a as u16 + b as u16) / 2) as u8
}

/// An implementation of the filter math.
///
/// Kernels are called only with valid input: `row`, `prev`, and `out` all have
/// the same length, that length is a multiple of `bpp`, and `bpp` is 1 through
/// 8. Every kernel must give the same bytes as [`ScalarKernel`].
pub trait RowFilterKernel: Sync + Debug {
  /// Reverses filter `ft` on `row`, in place.
  fn unfilter_row(&self, ft: FilterType, row: &mut [u8], prev: &[u8], bpp: usize);

  /// Applies filter `ft` to `row`, writing into `out`.
  fn filter_row(&self, ft: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]);
}

/// Byte at a time. This is the reference kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;
impl RowFilterKernel for ScalarKernel {
  fn unfilter_row(&self, ft: FilterType, row: &mut [u8], prev: &[u8], bpp: usize) {
    match ft {
      FilterType::None => (),
      FilterType::Sub => {
        for i in bpp..row.len() {
          row[i] = row[i].wrapping_add(row[i - bpp]);
        }
      }
      FilterType::Up => {
        row.iter_mut().zip(prev.iter()).for_each(|(x, b)| *x = x.wrapping_add(*b));
      }
      FilterType::Average => {
        for i in 0..row.len() {
          let a = if i >= bpp { row[i - bpp] } else { 0 };
          row[i] = row[i].wrapping_add(average(a, prev[i]));
        }
      }
      FilterType::Paeth => {
        for i in 0..row.len() {
          let (a, c) = if i >= bpp { (row[i - bpp], prev[i - bpp]) } else { (0, 0) };
          row[i] = row[i].wrapping_add(paeth_predict(a, prev[i], c));
        }
      }
    }
  }

  fn filter_row(&self, ft: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
    match ft {
      FilterType::None => out.copy_from_slice(row),
      FilterType::Sub => {
        for i in 0..row.len() {
          let a = if i >= bpp { row[i - bpp] } else { 0 };
          out[i] = row[i].wrapping_sub(a);
        }
      }
      FilterType::Up => {
        for i in 0..row.len() {
          out[i] = row[i].wrapping_sub(prev[i]);
        }
      }
      FilterType::Average => {
        for i in 0..row.len() {
          let a = if i >= bpp { row[i - bpp] } else { 0 };
          out[i] = row[i].wrapping_sub(average(a, prev[i]));
        }
      }
      FilterType::Paeth => {
        for i in 0..row.len() {
          let (a, c) = if i >= bpp { (row[i - bpp], prev[i - bpp]) } else { (0, 0) };
          out[i] = row[i].wrapping_sub(paeth_predict(a, prev[i], c));
        }
      }
    }
  }
}

/// Works a whole pixel (filter unit) at a time, without per-byte index math.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelKernel;
impl RowFilterKernel for PixelKernel {
  fn unfilter_row(&self, ft: FilterType, row: &mut [u8], prev: &[u8], bpp: usize) {
    match ft {
      FilterType::None => (),
      FilterType::Sub => {
        let mut it = row.chunks_exact_mut(bpp);
        if let Some(mut a_bytes) = it.next() {
          for x_bytes in it {
            x_bytes.iter_mut().zip(a_bytes.iter()).for_each(|(x, a)| *x = x.wrapping_add(*a));
            a_bytes = x_bytes;
          }
        }
      }
      FilterType::Up => {
        row.iter_mut().zip(prev.iter()).for_each(|(x, b)| *x = x.wrapping_add(*b));
      }
      FilterType::Average => {
        // the first pixel has no left neighbor, so `a` starts as all 0s.
        let mut a_bytes = &[0; 8][..bpp];
        for (x_bytes, b_bytes) in row.chunks_exact_mut(bpp).zip(prev.chunks_exact(bpp)) {
          for ((x, a), b) in x_bytes.iter_mut().zip(a_bytes.iter()).zip(b_bytes.iter()) {
            *x = x.wrapping_add(average(*a, *b));
          }
          a_bytes = x_bytes;
        }
      }
      FilterType::Paeth => {
        let mut a_bytes = &[0; 8][..bpp];
        let mut c_bytes = &[0; 8][..bpp];
        for (x_bytes, b_bytes) in row.chunks_exact_mut(bpp).zip(prev.chunks_exact(bpp)) {
          for ((x, a), (b, c)) in
            x_bytes.iter_mut().zip(a_bytes.iter()).zip(b_bytes.iter().zip(c_bytes.iter()))
          {
            *x = x.wrapping_add(paeth_predict(*a, *b, *c));
          }
          a_bytes = x_bytes;
          c_bytes = b_bytes;
        }
      }
    }
  }

  fn filter_row(&self, ft: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
    let zeros = &[0; 8][..bpp];
    let mut a_bytes = zeros;
    let mut c_bytes = zeros;
    let units = row.chunks_exact(bpp).zip(prev.chunks_exact(bpp)).zip(out.chunks_exact_mut(bpp));
    for ((x_bytes, b_bytes), o_bytes) in units {
      for i in 0..bpp {
        let (x, a, b, c) = (x_bytes[i], a_bytes[i], b_bytes[i], c_bytes[i]);
        o_bytes[i] = match ft {
          FilterType::None => x,
          FilterType::Sub => x.wrapping_sub(a),
          FilterType::Up => x.wrapping_sub(b),
          FilterType::Average => x.wrapping_sub(average(a, b)),
          FilterType::Paeth => x.wrapping_sub(paeth_predict(a, b, c)),
        };
      }
      a_bytes = x_bytes;
      c_bytes = b_bytes;
    }
  }
}

fn check_row(row_len: usize, other_len: usize, bpp: usize) -> PngResult<()> {
  if other_len != row_len {
    return Err(PngError::RowLengthMismatch { expected: row_len, given: other_len });
  }
  if bpp == 0 || bpp > 8 || row_len % bpp != 0 {
    return Err(PngError::RowLengthMismatch {
      expected: row_len - row_len % bpp.max(1),
      given: row_len,
    });
  }
  Ok(())
}

/// Reverses filter `ft` on `row` with the given kernel.
///
/// `prev` is the previous row after its own unfiltering (all 0s for the first
/// row of a pass) and must be the same length as `row`.
pub fn unfilter_with(
  kernel: &dyn RowFilterKernel, ft: FilterType, row: &mut [u8], prev: &[u8], bpp: usize,
) -> PngResult<()> {
  check_row(row.len(), prev.len(), bpp)?;
  kernel.unfilter_row(ft, row, prev, bpp);
  Ok(())
}

/// Applies filter `ft` to `row` with the given kernel, writing into `out`.
pub fn filter_with(
  kernel: &dyn RowFilterKernel, ft: FilterType, row: &[u8], prev: &[u8], bpp: usize,
  out: &mut [u8],
) -> PngResult<()> {
  check_row(row.len(), prev.len(), bpp)?;
  check_row(row.len(), out.len(), bpp)?;
  kernel.filter_row(ft, row, prev, bpp, out);
  Ok(())
}

/// [`unfilter_with`] using [`ScalarKernel`].
#[inline]
pub fn unfilter(ft: FilterType, row: &mut [u8], prev: &[u8], bpp: usize) -> PngResult<()> {
  unfilter_with(&ScalarKernel, ft, row, prev, bpp)
}

/// [`filter_with`] using [`ScalarKernel`].
#[inline]
pub fn filter(ft: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) -> PngResult<()> {
  filter_with(&ScalarKernel, ft, row, prev, bpp, out)
}

/// The default filter heuristic: treat each byte as `i8` and sum the magnitudes.
#[inline]
#[must_use]
pub fn min_sum_abs(filtered: &[u8]) -> u64 {
  filtered.iter().map(|&b| u64::from((b as i8).unsigned_abs())).sum()
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
  Fixed(FilterType),
  Adaptive(fn(&[u8]) -> u64),
}

/// Picks and applies a filter to each row of an encode session.
#[derive(Debug)]
pub struct FilterSelector {
  strategy: Strategy,
  kernel: &'static dyn RowFilterKernel,
  best: Vec<u8>,
  scratch: Vec<u8>,
}
impl FilterSelector {
  /// Resolves `choice` against the image being written.
  ///
  /// `FilterChoice::Auto` picks `None` for palette images and sub-byte
  /// pixels, since prediction rarely helps those, and adaptive selection
  /// otherwise.
  #[must_use]
  pub fn new(choice: FilterChoice, ihdr: &IHDR, kernel: &'static dyn RowFilterKernel) -> Self {
    let strategy = match choice {
      FilterChoice::Auto => {
        if ihdr.color_type == PngColorType::Index || ihdr.bit_depth < 8 {
          Strategy::Fixed(FilterType::None)
        } else {
          Strategy::Adaptive(min_sum_abs)
        }
      }
      FilterChoice::Fixed(ft) => Strategy::Fixed(ft),
      FilterChoice::Adaptive(Heuristic::MinSumAbs) => Strategy::Adaptive(min_sum_abs),
      FilterChoice::Adaptive(Heuristic::Custom(f)) => Strategy::Adaptive(f),
    };
    let row_len = ihdr.bytes_per_row(ihdr.width);
    Self { strategy, kernel, best: vec![0; row_len], scratch: vec![0; row_len] }
  }

  /// If every row gets the same filter, this is it.
  #[inline]
  #[must_use]
  pub fn fixed_filter(&self) -> Option<FilterType> {
    match self.strategy {
      Strategy::Fixed(ft) => Some(ft),
      Strategy::Adaptive(_) => None,
    }
  }

  /// Filters `row` and gives back the chosen type and the filtered bytes.
  ///
  /// With an adaptive heuristic every type is tried and the lowest score
  /// wins, ties going to the earlier type.
  pub fn choose_and_apply(
    &mut self, row: &[u8], prev: &[u8], bpp: usize,
  ) -> PngResult<(FilterType, &[u8])> {
    let len = row.len();
    if self.best.len() < len {
      self.best.resize(len, 0);
      self.scratch.resize(len, 0);
    }
    match self.strategy {
      Strategy::Fixed(ft) => {
        filter_with(self.kernel, ft, row, prev, bpp, &mut self.best[..len])?;
        Ok((ft, &self.best[..len]))
      }
      Strategy::Adaptive(score) => {
        let mut best: Option<(FilterType, u64)> = None;
        for ft in FilterType::ALL {
          filter_with(self.kernel, ft, row, prev, bpp, &mut self.scratch[..len])?;
          let s = score(&self.scratch[..len]);
          if best.map_or(true, |(_, b)| s < b) {
            best = Some((ft, s));
            core::mem::swap(&mut self.best, &mut self.scratch);
          }
        }
        let best_type = best.map_or(FilterType::None, |(ft, _)| ft);
        Ok((best_type, &self.best[..len]))
      }
    }
  }
}
