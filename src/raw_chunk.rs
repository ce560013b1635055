use core::fmt::Debug;

use crate::{crc32::chunk_crc, ChunkType, PNG_SIGNATURE};

/// An unparsed chunk borrowed from in-memory PNG bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  pub ty: ChunkType,
  pub data: &'b [u8],
  pub declared_crc: u32,
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("ty", &self.ty)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl RawChunk<'_> {
  /// The CRC computed from the type and data.
  #[inline]
  #[must_use]
  pub fn actual_crc(&self) -> u32 {
    chunk_crc(self.ty, self.data)
  }

  /// If the declared CRC is correct.
  #[inline]
  #[must_use]
  pub fn crc_ok(&self) -> bool {
    self.actual_crc() == self.declared_crc
  }
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// This doesn't check anything beyond the framing: the iterator just stops
/// when there aren't enough bytes left for the next whole chunk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RawChunkIter<'b>(&'b [u8]);
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, it will remove the signature automatically.
  ///
  /// If the signature is wrong the iterator is empty.
  #[inline]
  #[must_use]
  pub fn new(bytes: &'b [u8]) -> Self {
    match bytes.split_first_chunk::<8>() {
      Some((sig, rest)) if *sig == PNG_SIGNATURE => Self(rest),
      _ => Self(&[]),
    }
  }

  /// Bytes that haven't been turned into chunks yet.
  #[inline]
  #[must_use]
  pub fn remaining(&self) -> &'b [u8] {
    self.0
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = RawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let (len_bytes, rest) = self.0.split_first_chunk::<4>()?;
    let chunk_len = u32::from_be_bytes(*len_bytes) as usize;
    let (type_bytes, rest) = rest.split_first_chunk::<4>()?;
    if rest.len() < chunk_len {
      return None;
    }
    let (data, rest) = rest.split_at(chunk_len);
    let (crc_bytes, rest) = rest.split_first_chunk::<4>()?;
    self.0 = rest;
    Some(RawChunk { ty: ChunkType(*type_bytes), data, declared_crc: u32::from_be_bytes(*crc_bytes) })
  }
}
