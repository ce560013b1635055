//! Settings for decode and encode sessions.

use alloc::vec::Vec;

use crate::{
  filter::{FilterType, RowFilterKernel, ScalarKernel},
  BenignPolicy, ChunkType,
};

/// Resource limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
  /// Largest accepted image width.
  pub width_max: u32,
  /// Largest accepted image height.
  pub height_max: u32,
  /// Largest payload accepted for any chunk other than `IDAT`.
  ///
  /// Checked before anything gets allocated for the chunk.
  pub chunk_length_max: u32,
  /// How many ancillary chunks a session will store.
  pub ancillary_chunk_max: usize,
}
impl Default for Limits {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self {
      width_max: 1_000_000,
      height_max: 1_000_000,
      chunk_length_max: 8_000_000,
      ancillary_chunk_max: 1000,
    }
  }
}

/// What to do when a chunk's CRC doesn't match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrcAction {
  /// Fail the session.
  Error,
  /// Warn and drop the chunk. For critical chunks this acts like `WarnUse`.
  WarnDiscard,
  /// Warn and use the chunk anyway.
  WarnUse,
  /// Use the chunk without saying anything.
  QuietUse,
  /// Don't check the CRC. The bytes are still read, but a mismatch is never
  /// reported.
  Skip,
}

/// CRC handling, split by chunk criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrcPolicy {
  pub critical: CrcAction,
  pub ancillary: CrcAction,
}
impl Default for CrcPolicy {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self { critical: CrcAction::Error, ancillary: CrcAction::WarnDiscard }
  }
}
impl CrcPolicy {
  /// The action that applies to a chunk of type `ty`.
  #[inline]
  #[must_use]
  pub const fn action_for(&self, ty: ChunkType) -> CrcAction {
    if ty.is_critical() {
      match self.critical {
        CrcAction::WarnDiscard => CrcAction::WarnUse,
        other => other,
      }
    } else {
      self.ancillary
    }
  }
}

/// Which unknown ancillary chunks a decoder stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChunkKeep {
  /// Drop them.
  #[default]
  Never,
  /// Keep the ones marked safe to copy.
  IfSafe,
  /// Keep all of them.
  Always,
}
impl ChunkKeep {
  #[inline]
  #[must_use]
  pub const fn keeps(self, ty: ChunkType) -> bool {
    match self {
      Self::Never => false,
      Self::IfSafe => ty.is_safe_to_copy(),
      Self::Always => true,
    }
  }
}

/// Settings for a decode session.
#[derive(Debug, Clone)]
pub struct DecodeConfig {
  pub limits: Limits,
  pub crc: CrcPolicy,
  /// Policy for ancillary chunks this library doesn't know.
  pub keep_unknown: ChunkKeep,
  /// Per-type policy, checked before `keep_unknown`.
  pub keep_overrides: Vec<(ChunkType, ChunkKeep)>,
  pub benign: BenignPolicy,
  /// Size of the buffer compressed data is read into.
  pub zbuf_size: usize,
  pub kernel: &'static dyn RowFilterKernel,
}
impl Default for DecodeConfig {
  #[inline]
  fn default() -> Self {
    Self {
      limits: Limits::default(),
      crc: CrcPolicy::default(),
      keep_unknown: ChunkKeep::Never,
      keep_overrides: Vec::new(),
      benign: BenignPolicy::Warn,
      zbuf_size: 8192,
      kernel: &ScalarKernel,
    }
  }
}
impl DecodeConfig {
  /// Every benign problem is fatal, and every CRC mismatch is an error.
  #[inline]
  #[must_use]
  pub fn strict() -> Self {
    Self {
      crc: CrcPolicy { critical: CrcAction::Error, ancillary: CrcAction::Error },
      benign: BenignPolicy::Error,
      ..Self::default()
    }
  }

  /// Sets the keep policy for one chunk type.
  #[inline]
  #[must_use]
  pub fn keep_chunk(mut self, ty: ChunkType, keep: ChunkKeep) -> Self {
    self.keep_overrides.retain(|(t, _)| *t != ty);
    self.keep_overrides.push((ty, keep));
    self
  }

  /// If an unknown ancillary chunk of this type should be stored.
  #[must_use]
  pub fn keeps_unknown(&self, ty: ChunkType) -> bool {
    match self.keep_overrides.iter().find(|(t, _)| *t == ty) {
      Some((_, keep)) => keep.keeps(ty),
      None => self.keep_unknown.keeps(ty),
    }
  }
}

/// Scores a filtered row. Lower is better.
pub type RowScore = fn(&[u8]) -> u64;

/// How the encoder scores candidate filters.
#[derive(Debug, Clone, Copy)]
pub enum Heuristic {
  /// Sum of each byte's absolute value when read as an `i8`.
  MinSumAbs,
  /// A caller's scoring function.
  Custom(RowScore),
}

/// How the encoder picks each row's filter.
#[derive(Debug, Clone, Copy, Default)]
pub enum FilterChoice {
  /// `None` for palette and sub-byte images, `Adaptive(MinSumAbs)` otherwise.
  #[default]
  Auto,
  /// Always use this filter.
  Fixed(FilterType),
  /// Try all five filters per row, keep the best scoring one.
  Adaptive(Heuristic),
}

/// Settings for an encode session.
#[derive(Debug, Clone)]
pub struct EncodeConfig {
  pub filter: FilterChoice,
  /// zlib level, 0 (store) through 10 (slowest).
  pub compression_level: u8,
  /// Size of the compressed output buffer, and so the size of each full `IDAT`.
  ///
  /// Capped at `chunk_length_max`.
  pub zbuf_size: usize,
  /// Largest payload of any chunk written, caller supplied or `IDAT`.
  pub chunk_length_max: u32,
  pub kernel: &'static dyn RowFilterKernel,
}
impl Default for EncodeConfig {
  #[inline]
  fn default() -> Self {
    Self {
      filter: FilterChoice::Auto,
      compression_level: 6,
      zbuf_size: 8192,
      chunk_length_max: Limits::default().chunk_length_max,
      kernel: &ScalarKernel,
    }
  }
}
