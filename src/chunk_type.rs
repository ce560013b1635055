use core::fmt::{Debug, Write};

/// The 4-byte type tag of a chunk.
///
/// Each byte is an ASCII letter, and bit 5 of each byte (the lowercase bit) is
/// a property flag:
/// * byte 0: lowercase means **ancillary**, uppercase means **critical**.
/// * byte 1: lowercase means **private**, uppercase means **public**.
/// * byte 2: reserved, must be uppercase.
/// * byte 3: lowercase means **safe to copy** even when an editor doesn't
///   understand the chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const cHRM: Self = Self(*b"cHRM");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const iCCP: Self = Self(*b"iCCP");
  pub const sBIT: Self = Self(*b"sBIT");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const cICP: Self = Self(*b"cICP");
  pub const bKGD: Self = Self(*b"bKGD");
  pub const hIST: Self = Self(*b"hIST");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const sPLT: Self = Self(*b"sPLT");
  pub const oFFs: Self = Self(*b"oFFs");
  pub const tIME: Self = Self(*b"tIME");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const zTXt: Self = Self(*b"zTXt");
  pub const iTXt: Self = Self(*b"iTXt");
  pub const eXIf: Self = Self(*b"eXIf");

  /// Gets the tag bytes.
  #[inline]
  #[must_use]
  pub const fn as_bytes(&self) -> &[u8; 4] {
    &self.0
  }

  /// If every byte of the tag is an ASCII letter.
  #[inline]
  #[must_use]
  pub const fn is_valid(self) -> bool {
    self.0[0].is_ascii_alphabetic()
      && self.0[1].is_ascii_alphabetic()
      && self.0[2].is_ascii_alphabetic()
      && self.0[3].is_ascii_alphabetic()
  }

  /// Critical chunks must be understood to display the image.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0x20) == 0
  }

  /// Public chunks are registered by the format's maintainers.
  #[inline]
  #[must_use]
  pub const fn is_public(self) -> bool {
    (self.0[1] & 0x20) == 0
  }

  /// The reserved bit must be uppercase in this version of the format.
  #[inline]
  #[must_use]
  pub const fn is_reserved_valid(self) -> bool {
    (self.0[2] & 0x20) == 0
  }

  /// Safe-to-copy chunks can be passed along by editors that change the image
  /// data without understanding the chunk.
  #[inline]
  #[must_use]
  pub const fn is_safe_to_copy(self) -> bool {
    (self.0[3] & 0x20) != 0
  }

  /// Where a known chunk type is allowed to appear, or `None` for a type this
  /// library doesn't know.
  #[must_use]
  pub const fn placement(self) -> Option<Placement> {
    Some(match &self.0 {
      b"IHDR" | b"PLTE" | b"IDAT" | b"IEND" => Placement::Critical,
      b"cHRM" | b"gAMA" | b"iCCP" | b"sBIT" | b"sRGB" | b"cICP" => Placement::BeforePLTE,
      b"bKGD" | b"hIST" | b"tRNS" => Placement::AfterPLTE,
      b"pHYs" | b"sPLT" | b"oFFs" => Placement::BeforeIDAT,
      b"tIME" | b"tEXt" | b"zTXt" | b"iTXt" | b"eXIf" => Placement::Anywhere,
      _ => return None,
    })
  }

  /// If a known chunk type may appear only once per image.
  #[inline]
  #[must_use]
  pub const fn is_single_instance(self) -> bool {
    !matches!(&self.0, b"sPLT" | b"tEXt" | b"zTXt" | b"iTXt" | b"IDAT")
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      if b.is_ascii_graphic() {
        f.write_char(b as char)?;
      } else {
        write!(f, "\\x{b:02X}")?;
      }
    }
    Ok(())
  }
}
impl From<[u8; 4]> for ChunkType {
  #[inline]
  #[must_use]
  fn from(bytes: [u8; 4]) -> Self {
    Self(bytes)
  }
}

/// Ordering rule for a known chunk type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
  /// `IHDR`, `PLTE`, `IDAT`, `IEND` have their own rules.
  Critical,
  /// Must come before `PLTE` and `IDAT`.
  BeforePLTE,
  /// Must come before `IDAT`, and after `PLTE` when there is one.
  AfterPLTE,
  /// Must come before `IDAT`.
  BeforeIDAT,
  /// Can come anywhere between `IHDR` and `IEND`.
  Anywhere,
}
