use crate::{Limits, PngError, PngResult};

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// The bit depths allowed with this color type.
  #[inline]
  #[must_use]
  pub const fn allowed_bit_depths(self) -> &'static [u8] {
    match self {
      Self::Y => &[1, 2, 4, 8, 16],
      Self::Index => &[1, 2, 4, 8],
      Self::RGB | Self::YA | Self::RGBA => &[8, 16],
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(PngError::IllegalColorTypeBitDepth),
    })
  }
}

/// Image Header
///
/// This is the image descriptor: it's set once from the first chunk of a PNG,
/// and every later chunk and row is checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IHDR {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// if the image data is stored interlaced (Adam7).
  pub is_interlaced: bool,
}
impl IHDR {
  /// Bits used by one pixel.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// The filter unit: bytes per complete pixel, rounded up to at least 1.
  #[inline]
  #[must_use]
  pub const fn filter_bpp(&self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// The row stride for a row of `width` pixels, without the filter byte.
  ///
  /// Pixels smaller than a byte are packed, so partial bytes get rounded up.
  #[inline]
  #[must_use]
  pub const fn bytes_per_row(&self, width: u32) -> usize {
    ((self.bits_per_pixel() * (width as usize)) + 7) / 8
  }

  /// Checks everything that isn't already guaranteed by the types.
  pub fn validate(&self, limits: &Limits) -> PngResult<()> {
    if self.width == 0 || self.height == 0 {
      return Err(PngError::ImageDimensionsZero);
    }
    // the format caps both at 2^31-1 no matter what the user limits are.
    if self.width > limits.width_max.min(i32::MAX as u32)
      || self.height > limits.height_max.min(i32::MAX as u32)
    {
      return Err(PngError::ImageTooLarge);
    }
    if !self.color_type.allowed_bit_depths().contains(&self.bit_depth) {
      return Err(PngError::IllegalColorTypeBitDepth);
    }
    // a row plus its filter byte has to be addressable.
    if (self.width as u64) * (self.bits_per_pixel() as u64) / 8 + 2 > (isize::MAX as u64) {
      return Err(PngError::ImageTooLarge);
    }
    Ok(())
  }

  /// The 13 payload bytes of this header.
  #[must_use]
  pub fn to_bytes(&self) -> [u8; 13] {
    let mut out = [0; 13];
    out[0..4].copy_from_slice(&self.width.to_be_bytes());
    out[4..8].copy_from_slice(&self.height.to_be_bytes());
    out[8] = self.bit_depth;
    out[9] = self.color_type as u8;
    // compression and filter methods are both always 0
    out[12] = self.is_interlaced as u8;
    out
  }
}
impl TryFrom<&[u8]> for IHDR {
  type Error = PngError;
  /// Parses the payload. Doesn't check the [`Limits`].
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        if *compression_method != 0 {
          return Err(PngError::IllegalCompressionMethod);
        }
        if *filter_method != 0 {
          return Err(PngError::IllegalFilterMethod);
        }
        let color_type = PngColorType::try_from(*color_type)?;
        if !color_type.allowed_bit_depths().contains(bit_depth) {
          return Err(PngError::IllegalColorTypeBitDepth);
        }
        Ok(Self {
          width: u32::from_be_bytes([*w0, *w1, *w2, *w3]),
          height: u32::from_be_bytes([*h0, *h1, *h2, *h3]),
          bit_depth: *bit_depth,
          color_type,
          is_interlaced: match interlace_method {
            0 => false,
            1 => true,
            _ => return Err(PngError::IllegalInterlaceMethod),
          },
        })
      }
      _ => Err(PngError::BadHeaderLength),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(bit_depth: u8, color_type: PngColorType, width: u32) -> IHDR {
    IHDR { width, height: 1, bit_depth, color_type, is_interlaced: false }
  }

  #[test]
  fn test_parse_round_trip() {
    let h = IHDR {
      width: 300,
      height: 7,
      bit_depth: 16,
      color_type: PngColorType::RGBA,
      is_interlaced: true,
    };
    assert_eq!(IHDR::try_from(&h.to_bytes()[..]), Ok(h));
  }

  #[test]
  fn test_parse_rejects_bad_fields() {
    let good = header(8, PngColorType::RGB, 1).to_bytes();
    assert_eq!(IHDR::try_from(&good[..12]), Err(PngError::BadHeaderLength));
    let mut b = good;
    b[8] = 4;
    assert_eq!(IHDR::try_from(&b[..]), Err(PngError::IllegalColorTypeBitDepth));
    let mut b = good;
    b[9] = 1;
    assert_eq!(IHDR::try_from(&b[..]), Err(PngError::IllegalColorTypeBitDepth));
    let mut b = good;
    b[10] = 1;
    assert_eq!(IHDR::try_from(&b[..]), Err(PngError::IllegalCompressionMethod));
    let mut b = good;
    b[11] = 1;
    assert_eq!(IHDR::try_from(&b[..]), Err(PngError::IllegalFilterMethod));
    let mut b = good;
    b[12] = 2;
    assert_eq!(IHDR::try_from(&b[..]), Err(PngError::IllegalInterlaceMethod));
  }

  #[test]
  fn test_validate_limits() {
    let limits = Limits::default();
    assert_eq!(header(8, PngColorType::Y, 0).validate(&limits), Err(PngError::ImageDimensionsZero));
    assert_eq!(
      header(8, PngColorType::Y, 1_000_001).validate(&limits),
      Err(PngError::ImageTooLarge)
    );
    assert_eq!(header(8, PngColorType::Y, 1_000_000).validate(&limits), Ok(()));
    assert_eq!(
      header(16, PngColorType::Index, 5).validate(&limits),
      Err(PngError::IllegalColorTypeBitDepth)
    );
  }

  #[test]
  fn test_row_geometry() {
    assert_eq!(header(1, PngColorType::Y, 9).bytes_per_row(9), 2);
    assert_eq!(header(1, PngColorType::Y, 9).filter_bpp(), 1);
    assert_eq!(header(4, PngColorType::Index, 3).bytes_per_row(3), 2);
    assert_eq!(header(16, PngColorType::RGB, 2).bytes_per_row(2), 12);
    assert_eq!(header(16, PngColorType::RGB, 2).filter_bpp(), 6);
    assert_eq!(header(8, PngColorType::YA, 2).filter_bpp(), 2);
  }
}
