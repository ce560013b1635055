//! Adam7 interlacing.
//!
//! An interlaced image is stored as 7 "reduced images" (passes). Each pass
//! takes every `x_step`-th pixel of every `y_step`-th row, starting at
//! `(x_start, y_start)`. Within each 8x8 block the pass numbers look like
//! this (counting from 1):
//!
//! ```txt
//! 1 6 4 6 2 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! 3 6 4 6 3 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! ```
//!
//! A non-interlaced image is handled as a single pass with all steps 1.

use crate::{PngError, PngResult};

/// Geometry of one reduced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassGeometry {
  pub x_start: u32,
  pub y_start: u32,
  pub x_step: u32,
  pub y_step: u32,
}

/// The 7 Adam7 passes, in storage order.
pub const ADAM7: [PassGeometry; 7] = [
  PassGeometry { x_start: 0, y_start: 0, x_step: 8, y_step: 8 },
  PassGeometry { x_start: 4, y_start: 0, x_step: 8, y_step: 8 },
  PassGeometry { x_start: 0, y_start: 4, x_step: 4, y_step: 8 },
  PassGeometry { x_start: 2, y_start: 0, x_step: 4, y_step: 4 },
  PassGeometry { x_start: 0, y_start: 2, x_step: 2, y_step: 4 },
  PassGeometry { x_start: 1, y_start: 0, x_step: 2, y_step: 2 },
  PassGeometry { x_start: 0, y_start: 1, x_step: 1, y_step: 2 },
];

/// The "pass" of a non-interlaced image.
pub const FULL_IMAGE: PassGeometry = PassGeometry { x_start: 0, y_start: 0, x_step: 1, y_step: 1 };

impl PassGeometry {
  /// Columns in this pass for an image `full_width` wide.
  #[inline]
  #[must_use]
  pub const fn width(&self, full_width: u32) -> u32 {
    if full_width <= self.x_start {
      0
    } else {
      (full_width - self.x_start + self.x_step - 1) / self.x_step
    }
  }

  /// Rows in this pass for an image `full_height` tall.
  #[inline]
  #[must_use]
  pub const fn height(&self, full_height: u32) -> u32 {
    if full_height <= self.y_start {
      0
    } else {
      (full_height - self.y_start + self.y_step - 1) / self.y_step
    }
  }

  /// The full image column of a pass column.
  #[inline]
  #[must_use]
  pub const fn full_x(&self, reduced_x: u32) -> u32 {
    self.x_start + reduced_x * self.x_step
  }

  /// The full image row of a pass row.
  #[inline]
  #[must_use]
  pub const fn full_y(&self, reduced_y: u32) -> u32 {
    self.y_start + reduced_y * self.y_step
  }

  /// If the full image row `y` has any pixels in this pass.
  #[inline]
  #[must_use]
  pub const fn contains_row(&self, y: u32) -> bool {
    y >= self.y_start && (y - self.y_start) % self.y_step == 0
  }

  /// How wide a block each pixel of this pass covers in a progressive display.
  #[inline]
  #[must_use]
  pub const fn block_width(&self) -> u32 {
    self.x_step - self.x_start
  }

  /// How tall a block each pixel of this pass covers in a progressive display.
  #[inline]
  #[must_use]
  pub const fn block_height(&self) -> u32 {
    self.y_step - self.y_start
  }
}

/// Given the dimensions of the full PNG image, computes the size of each
/// reduced image.
///
/// Either dimension of a reduced image can be 0 for small images. Those passes
/// have no rows at all, not even a filter byte.
#[inline]
#[must_use]
pub const fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 7] {
  let mut out = [(0, 0); 7];
  let mut i = 0;
  while i < 7 {
    out[i] = (ADAM7[i].width(full_width), ADAM7[i].height(full_height));
    i += 1;
  }
  out
}

/// Converts a reduced image location into the full image location.
///
/// ## Panics
/// * If the pass given exceeds 6.
#[inline]
#[must_use]
pub const fn interlaced_pos_to_full_pos(pass: usize, reduced_x: u32, reduced_y: u32) -> (u32, u32) {
  let p = &ADAM7[pass];
  (p.full_x(reduced_x), p.full_y(reduced_y))
}

#[inline]
#[must_use]
fn bytes_for(width: u32, bits_per_pixel: usize) -> usize {
  (width as usize * bits_per_pixel + 7) / 8
}

#[inline]
#[must_use]
fn get_packed(row: &[u8], x: usize, bits: usize) -> u8 {
  let bit = x * bits;
  let shift = 8 - bits - (bit % 8);
  (row[bit / 8] >> shift) & ((1 << bits) - 1)
}

#[inline]
fn set_packed(row: &mut [u8], x: usize, bits: usize, value: u8) {
  let bit = x * bits;
  let shift = 8 - bits - (bit % 8);
  let mask = (((1_u16 << bits) - 1) as u8) << shift;
  let b = &mut row[bit / 8];
  *b = (*b & !mask) | ((value << shift) & mask);
}

fn check_len(given: usize, expected: usize) -> PngResult<()> {
  if given < expected {
    Err(PngError::RowLengthMismatch { expected, given })
  } else {
    Ok(())
  }
}

/// Scatters one decoded pass row into its full resolution row.
///
/// * `pass_row` is the unfiltered row of pass `pass` (0 through 6).
/// * `dest` is the full image row, `width` pixels wide.
/// * When `replicate` is set, each pixel also fills the positions to its right
///   that later passes haven't delivered yet (the "rectangle" progressive
///   display). Otherwise positions outside the pass are left untouched.
///
/// ## Panics
/// * If the pass given exceeds 6.
pub fn expand_row(
  pass_row: &[u8], pass: usize, width: u32, bits_per_pixel: usize, dest: &mut [u8],
  replicate: bool,
) -> PngResult<()> {
  let p = ADAM7[pass];
  let reduced_width = p.width(width);
  check_len(pass_row.len(), bytes_for(reduced_width, bits_per_pixel))?;
  check_len(dest.len(), bytes_for(width, bits_per_pixel))?;
  let span = if replicate { p.block_width() } else { 1 };
  if bits_per_pixel >= 8 {
    let bytes = bits_per_pixel / 8;
    for (reduced_x, src) in pass_row.chunks_exact(bytes).take(reduced_width as usize).enumerate() {
      let full_x = p.full_x(reduced_x as u32);
      for x in full_x..(full_x + span).min(width) {
        dest[x as usize * bytes..][..bytes].copy_from_slice(src);
      }
    }
  } else {
    for reduced_x in 0..reduced_width as usize {
      let v = get_packed(pass_row, reduced_x, bits_per_pixel);
      let full_x = p.full_x(reduced_x as u32);
      for x in full_x..(full_x + span).min(width) {
        set_packed(dest, x as usize, bits_per_pixel, v);
      }
    }
  }
  Ok(())
}

/// Gathers the pixels of pass `pass` out of a full resolution row.
///
/// Returns the number of bytes of `out` that were used. Any unused low bits in
/// the final byte are zeroed.
///
/// ## Panics
/// * If the pass given exceeds 6.
pub fn extract_row(
  full_row: &[u8], pass: usize, width: u32, bits_per_pixel: usize, out: &mut [u8],
) -> PngResult<usize> {
  let p = ADAM7[pass];
  let reduced_width = p.width(width);
  let out_len = bytes_for(reduced_width, bits_per_pixel);
  check_len(full_row.len(), bytes_for(width, bits_per_pixel))?;
  check_len(out.len(), out_len)?;
  if bits_per_pixel >= 8 {
    let bytes = bits_per_pixel / 8;
    for (reduced_x, dst) in out[..out_len].chunks_exact_mut(bytes).enumerate() {
      let x = p.full_x(reduced_x as u32) as usize;
      dst.copy_from_slice(&full_row[x * bytes..][..bytes]);
    }
  } else {
    out[..out_len].fill(0);
    for reduced_x in 0..reduced_width as usize {
      let x = p.full_x(reduced_x as u32) as usize;
      set_packed(out, reduced_x, bits_per_pixel, get_packed(full_row, x, bits_per_pixel));
    }
  }
  Ok(out_len)
}

/// Expands a pass row straight into a whole image buffer.
///
/// `image` holds `height` rows of `bytes_per_row(width)` bytes each, and
/// `reduced_y` is the row within the pass. With `replicate` the row is also
/// copied down over the rows that later passes will fill in.
///
/// ## Panics
/// * If the pass given exceeds 6.
#[allow(clippy::too_many_arguments)]
pub fn expand_into_image(
  pass_row: &[u8], pass: usize, reduced_y: u32, width: u32, height: u32, bits_per_pixel: usize,
  image: &mut [u8], replicate: bool,
) -> PngResult<()> {
  let p = ADAM7[pass];
  let stride = bytes_for(width, bits_per_pixel);
  check_len(image.len(), stride * height as usize)?;
  let y = p.full_y(reduced_y) as usize;
  if y >= height as usize {
    return Err(PngError::TooManyRows);
  }
  expand_row(pass_row, pass, width, bits_per_pixel, &mut image[y * stride..][..stride], replicate)?;
  if replicate {
    let rows = (p.block_height() as usize).min(height as usize - y);
    for dy in 1..rows {
      image.copy_within(y * stride..(y + 1) * stride, (y + dy) * stride);
    }
  }
  Ok(())
}
