//! Ancillary chunk storage.
//!
//! Ancillary chunks are kept as their raw payload bytes plus where they were
//! found, so a decoded image can be written back out with them in the same
//! places. The typed getters parse on demand.

use alloc::vec::Vec;

use crate::{
  chunks::{parse_gamma, Background, ModTime, PhysicalDims, SrgbIntent, Text},
  ChunkType, Placement,
};

/// Where in the chunk sequence an ancillary chunk goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkLocation {
  /// After `IHDR`, before `PLTE`.
  BeforePLTE,
  /// After `PLTE` (if any), before the first `IDAT`.
  BeforeIDAT,
  /// After the last `IDAT`, before `IEND`.
  AfterIDAT,
}
impl ChunkLocation {
  /// Moves a requested location to one the format allows for this type.
  ///
  /// Types this library doesn't know are left where they were asked to go.
  #[must_use]
  pub const fn legal_for(self, ty: ChunkType) -> Self {
    match ty.placement() {
      Some(Placement::BeforePLTE) => Self::BeforePLTE,
      Some(Placement::AfterPLTE) => Self::BeforeIDAT,
      Some(Placement::BeforeIDAT) => match self {
        Self::AfterIDAT => Self::BeforeIDAT,
        other => other,
      },
      _ => self,
    }
  }
}

/// One stored ancillary chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AncillaryChunk {
  pub ty: ChunkType,
  pub data: Vec<u8>,
  pub location: ChunkLocation,
}

/// Every ancillary chunk kept by a decoder, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Metadata {
  chunks: Vec<AncillaryChunk>,
}
impl Metadata {
  #[inline]
  #[must_use]
  pub fn chunks(&self) -> &[AncillaryChunk] {
    &self.chunks
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  /// The first stored chunk of the given type.
  #[inline]
  #[must_use]
  pub fn get(&self, ty: ChunkType) -> Option<&AncillaryChunk> {
    self.chunks.iter().find(|c| c.ty == ty)
  }

  /// Every stored chunk of the given type.
  #[inline]
  pub fn all(&self, ty: ChunkType) -> impl Iterator<Item = &AncillaryChunk> {
    self.chunks.iter().filter(move |c| c.ty == ty)
  }

  pub(crate) fn push(&mut self, chunk: AncillaryChunk) {
    self.chunks.push(chunk);
  }

  fn payload(&self, ty: ChunkType) -> Option<&[u8]> {
    self.get(ty).map(|c| c.data.as_slice())
  }

  /// Raw `tRNS` bytes. The layout depends on the color type.
  #[inline]
  #[must_use]
  pub fn transparency(&self) -> Option<&[u8]> {
    self.payload(ChunkType::tRNS)
  }

  /// Gamma times 100,000.
  #[inline]
  #[must_use]
  pub fn gamma(&self) -> Option<u32> {
    self.payload(ChunkType::gAMA).and_then(|d| parse_gamma(d).ok())
  }

  #[inline]
  #[must_use]
  pub fn srgb(&self) -> Option<SrgbIntent> {
    self.payload(ChunkType::sRGB).and_then(|d| SrgbIntent::try_from(d).ok())
  }

  #[inline]
  #[must_use]
  pub fn physical_dims(&self) -> Option<PhysicalDims> {
    self.payload(ChunkType::pHYs).and_then(|d| PhysicalDims::try_from(d).ok())
  }

  #[inline]
  #[must_use]
  pub fn mod_time(&self) -> Option<ModTime> {
    self.payload(ChunkType::tIME).and_then(|d| ModTime::try_from(d).ok())
  }

  #[inline]
  #[must_use]
  pub fn background(&self) -> Option<Background> {
    self.payload(ChunkType::bKGD).and_then(|d| Background::try_from(d).ok())
  }

  /// All `tEXt` entries.
  #[inline]
  pub fn texts(&self) -> impl Iterator<Item = Text<'_>> {
    self.all(ChunkType::tEXt).filter_map(|c| Text::try_from(c.data.as_slice()).ok())
  }
}
