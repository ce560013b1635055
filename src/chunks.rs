//! Parsed forms of the chunks this library understands.
//!
//! Parsing here only looks at one chunk's own bytes. Rules that depend on the
//! rest of the image (like a `tRNS` length versus the palette) are checked by
//! the decoder.

use crate::{ChunkType, RawChunk, IHDR};

/// Rendering intent of an `sRGB` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum SrgbIntent {
  Perceptual = 0,
  RelativeColorimetric = 1,
  Saturation = 2,
  AbsoluteColorimetric = 3,
}
impl TryFrom<&[u8]> for SrgbIntent {
  type Error = ();
  #[inline]
  fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
    Ok(match slice {
      [0] => Self::Perceptual,
      [1] => Self::RelativeColorimetric,
      [2] => Self::Saturation,
      [3] => Self::AbsoluteColorimetric,
      _ => return Err(()),
    })
  }
}

/// Intended pixel size or aspect ratio, from `pHYs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalDims {
  pub pixels_per_unit_x: u32,
  pub pixels_per_unit_y: u32,
  /// Otherwise the unit is unknown and only the ratio matters.
  pub unit_is_meter: bool,
}
impl TryFrom<&[u8]> for PhysicalDims {
  type Error = ();
  #[inline]
  fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
    match slice {
      [x0, x1, x2, x3, y0, y1, y2, y3, unit @ (0 | 1)] => Ok(Self {
        pixels_per_unit_x: u32::from_be_bytes([*x0, *x1, *x2, *x3]),
        pixels_per_unit_y: u32::from_be_bytes([*y0, *y1, *y2, *y3]),
        unit_is_meter: *unit == 1,
      }),
      _ => Err(()),
    }
  }
}

/// Last modification time (UTC), from `tIME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub struct ModTime {
  pub year: u16,
  pub month: u8,
  pub day: u8,
  pub hour: u8,
  pub minute: u8,
  /// up to 60, for leap seconds
  pub second: u8,
}
impl TryFrom<&[u8]> for ModTime {
  type Error = ();
  #[inline]
  fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
    match slice {
      [y0, y1, month @ 1..=12, day @ 1..=31, hour @ 0..=23, minute @ 0..=59, second @ 0..=60] => {
        Ok(Self {
          year: u16::from_be_bytes([*y0, *y1]),
          month: *month,
          day: *day,
          hour: *hour,
          minute: *minute,
          second: *second,
        })
      }
      _ => Err(()),
    }
  }
}

/// Background color.
///
/// RGB and Greyscale colors are always given as `u16` values. The actual color
/// selected should stay within the bit depth range of the rest of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Background {
  Greyscale { y: u16 },
  RGB { r: u16, g: u16, b: u16 },
  Index { i: u8 },
}
impl TryFrom<&[u8]> for Background {
  type Error = ();
  #[inline]
  fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
    Ok(match slice {
      [y0, y1] => Background::Greyscale { y: u16::from_be_bytes([*y0, *y1]) },
      [r0, r1, g0, g1, b0, b1] => Background::RGB {
        r: u16::from_be_bytes([*r0, *r1]),
        g: u16::from_be_bytes([*g0, *g1]),
        b: u16::from_be_bytes([*b0, *b1]),
      },
      [i] => Background::Index { i: *i },
      _ => return Err(()),
    })
  }
}

/// Latin-1 text with a keyword, from `tEXt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Text<'b> {
  /// 1 to 79 bytes, no nulls.
  pub keyword: &'b [u8],
  pub text: &'b [u8],
}
impl<'b> TryFrom<&'b [u8]> for Text<'b> {
  type Error = ();
  #[inline]
  fn try_from(slice: &'b [u8]) -> Result<Self, Self::Error> {
    let null = slice.iter().position(|&b| b == 0).ok_or(())?;
    let (keyword, rest) = slice.split_at(null);
    if keyword.is_empty() || keyword.len() > 79 {
      return Err(());
    }
    Ok(Self { keyword, text: &rest[1..] })
  }
}

/// Gamma value times 100,000, from `gAMA`.
#[inline]
pub(crate) fn parse_gamma(slice: &[u8]) -> Result<u32, ()> {
  match slice {
    [a, b, c, d] => match u32::from_be_bytes([*a, *b, *c, *d]) {
      0 => Err(()),
      g => Ok(g),
    },
    _ => Err(()),
  }
}

/// A parsed PNG chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(nonstandard_style)]
pub enum PngChunk<'b> {
  /// Image Header
  IHDR(IHDR),
  /// Palette
  PLTE(&'b [[u8; 3]]),
  /// Image Data
  IDAT(&'b [u8]),
  /// Image End
  IEND,
  /// Transparency, the format depends on the color type.
  tRNS(&'b [u8]),
  /// Gamma value times 100,000.
  gAMA(u32),
  /// sRGB Info
  sRGB(SrgbIntent),
  /// Physical pixel dimensions
  pHYs(PhysicalDims),
  /// Modification time
  tIME(ModTime),
  /// Background color
  bKGD(Background),
  /// Text
  tEXt(Text<'b>),
  /// Any other ancillary chunk, known or not.
  Ancillary(RawChunk<'b>),
  /// A critical chunk that isn't part of the format.
  UnknownCritical(RawChunk<'b>),
}
impl<'b> TryFrom<RawChunk<'b>> for PngChunk<'b> {
  type Error = RawChunk<'b>;
  /// Fails when a known chunk type has a malformed payload.
  #[inline]
  fn try_from(raw: RawChunk<'b>) -> Result<Self, Self::Error> {
    let data = raw.data;
    Ok(match raw.ty {
      ChunkType::IHDR => {
        // this can fail, so use `return` to avoid the outer Ok()
        return IHDR::try_from(data).map(PngChunk::IHDR).map_err(|_| raw);
      }
      ChunkType::PLTE => match bytemuck::try_cast_slice::<u8, [u8; 3]>(data) {
        Ok(entries) if !entries.is_empty() && entries.len() <= 256 => PngChunk::PLTE(entries),
        _ => return Err(raw),
      },
      ChunkType::IDAT => PngChunk::IDAT(data),
      ChunkType::IEND if data.is_empty() => PngChunk::IEND,
      ChunkType::tRNS => PngChunk::tRNS(data),
      ChunkType::gAMA => PngChunk::gAMA(parse_gamma(data).map_err(|_| raw)?),
      ChunkType::sRGB => PngChunk::sRGB(SrgbIntent::try_from(data).map_err(|_| raw)?),
      ChunkType::pHYs => PngChunk::pHYs(PhysicalDims::try_from(data).map_err(|_| raw)?),
      ChunkType::tIME => PngChunk::tIME(ModTime::try_from(data).map_err(|_| raw)?),
      ChunkType::bKGD => PngChunk::bKGD(Background::try_from(data).map_err(|_| raw)?),
      ChunkType::tEXt => PngChunk::tEXt(Text::try_from(data).map_err(|_| raw)?),
      ty if ty.is_critical() => match ty {
        ChunkType::IEND => return Err(raw),
        _ => PngChunk::UnknownCritical(raw),
      },
      _ => PngChunk::Ancillary(raw),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(ty: ChunkType, data: &[u8]) -> RawChunk<'_> {
    RawChunk { ty, data, declared_crc: 0 }
  }

  #[test]
  fn test_parse_known() {
    assert_eq!(
      PngChunk::try_from(raw(ChunkType::PLTE, &[1, 2, 3, 4, 5, 6])),
      Ok(PngChunk::PLTE(&[[1, 2, 3], [4, 5, 6]]))
    );
    assert!(PngChunk::try_from(raw(ChunkType::PLTE, &[1, 2])).is_err());
    assert!(PngChunk::try_from(raw(ChunkType::PLTE, &[])).is_err());
    assert_eq!(PngChunk::try_from(raw(ChunkType::gAMA, &[0, 0, 0xB1, 0x8F])), Ok(PngChunk::gAMA(45455)));
    assert!(PngChunk::try_from(raw(ChunkType::gAMA, &[0, 0, 0, 0])).is_err());
    assert_eq!(
      PngChunk::try_from(raw(ChunkType::sRGB, &[2])),
      Ok(PngChunk::sRGB(SrgbIntent::Saturation))
    );
    assert!(PngChunk::try_from(raw(ChunkType::sRGB, &[4])).is_err());
    assert_eq!(
      PngChunk::try_from(raw(ChunkType::pHYs, &[0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 1])),
      Ok(PngChunk::pHYs(PhysicalDims {
        pixels_per_unit_x: 2835,
        pixels_per_unit_y: 2835,
        unit_is_meter: true
      }))
    );
    assert!(PngChunk::try_from(raw(ChunkType::tIME, &[7, 0xE8, 13, 1, 0, 0, 0])).is_err());
    assert_eq!(
      PngChunk::try_from(raw(ChunkType::bKGD, &[9])),
      Ok(PngChunk::bKGD(Background::Index { i: 9 }))
    );
    assert!(PngChunk::try_from(raw(ChunkType::IEND, &[0])).is_err());
  }

  #[test]
  fn test_parse_text() {
    assert_eq!(
      Text::try_from(&b"Title\0hello"[..]),
      Ok(Text { keyword: b"Title", text: b"hello" })
    );
    assert_eq!(Text::try_from(&b"\0hello"[..]), Err(()));
    assert_eq!(Text::try_from(&b"no null"[..]), Err(()));
    assert_eq!(Text::try_from(&[b'k'; 80][..]), Err(()));
  }

  #[test]
  fn test_parse_other() {
    let private = raw(ChunkType(*b"prVt"), &[1, 2, 3]);
    assert_eq!(PngChunk::try_from(private), Ok(PngChunk::Ancillary(private)));
    let critical = raw(ChunkType(*b"CRIT"), &[]);
    assert_eq!(PngChunk::try_from(critical), Ok(PngChunk::UnknownCritical(critical)));
  }
}
