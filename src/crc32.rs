//! The CRC-32 used by every PNG chunk.
//!
//! The CRC covers the chunk's type tag and payload, but not the length field.

const CRC_TABLE: [u32; 256] = {
  let mut table = [0_u32; 256];
  let mut n = 0;
  while n < 256 {
    let mut c: u32 = n as _;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xedb88320 ^ (c >> 1);
      } else {
        c = c >> 1;
      }
      //
      k += 1;
    }
    table[n] = c;
    //
    n += 1;
  }
  table
};

/// An in-progress CRC-32 computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Crc32(u32);
impl Default for Crc32 {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self::new()
  }
}
impl Crc32 {
  /// A fresh accumulator.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }

  /// Feeds more bytes into the accumulator.
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    let mut c = self.0;
    for b in bytes.iter().copied() {
      c = CRC_TABLE[((c ^ (b as u32)) & 0xFF) as usize] ^ (c >> 8);
    }
    self.0 = c;
  }

  /// Same as [`update`](Self::update), but by value.
  #[inline]
  #[must_use]
  pub fn chain(mut self, bytes: &[u8]) -> Self {
    self.update(bytes);
    self
  }

  /// The CRC of all bytes fed in so far.
  ///
  /// The accumulator can keep being updated after this.
  #[inline]
  #[must_use]
  pub const fn finalize(&self) -> u32 {
    self.0 ^ u32::MAX
  }
}

/// Computes the CRC of a single byte slice.
#[inline]
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
  Crc32::new().chain(bytes).finalize()
}

/// Computes the CRC that a chunk with this type and payload should declare.
#[inline]
#[must_use]
pub fn chunk_crc(ty: crate::ChunkType, data: &[u8]) -> u32 {
  Crc32::new().chain(ty.as_bytes()).chain(data).finalize()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_known_values() {
    assert_eq!(crc32(b""), 0);
    assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    // every IEND chunk ends with these 4 bytes
    assert_eq!(chunk_crc(crate::ChunkType::IEND, &[]), 0xAE42_6082);
  }

  #[test]
  fn test_incremental_matches_one_shot() {
    let data: alloc::vec::Vec<u8> = (0..=255_u8).cycle().take(1000).collect();
    for split in [0, 1, 7, 500, 999, 1000] {
      let mut c = Crc32::new();
      c.update(&data[..split]);
      c.update(&data[split..]);
      assert_eq!(c.finalize(), crc32(&data));
    }
  }

  #[test]
  fn test_single_bit_flips_are_detected() {
    let data = *b"IHDR\0\0\0\x02\0\0\0\x02\x08\0\0\0\0";
    let good = crc32(&data);
    assert_eq!(good, crc32(&data));
    for byte in 0..data.len() {
      for bit in 0..8 {
        let mut bad = data;
        bad[byte] ^= 1 << bit;
        assert_ne!(crc32(&bad), good, "byte {byte} bit {bit}");
      }
    }
  }
}
