//! Streaming zlib around `miniz_oxide`.
//!
//! The image data of a PNG is one zlib stream, cut into any number of `IDAT`
//! chunks at arbitrary points. Nothing here knows about chunks: the inflater
//! pulls compressed bytes through a `refill` callback, and the deflater pushes
//! full output buffers through an `emit` callback.

use alloc::{boxed::Box, vec, vec::Vec};

use miniz_oxide::{
  deflate::core::{create_comp_flags_from_zip_params, CompressorOxide},
  inflate::stream::InflateState,
  DataFormat, MZError, MZFlush, MZStatus,
};

use crate::{PngError, PngResult};

/// How the end of an inflate stream went, see [`Inflater::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateEnd {
  /// The stream kept producing bytes after everything expected was read.
  pub extra_output: bool,
  /// The zlib end marker (and checksum) was seen.
  pub stream_ended: bool,
  /// Compressed bytes that were buffered but never used.
  pub unused_input: usize,
}

/// Decompresses a zlib stream on demand.
pub struct Inflater {
  state: Box<InflateState>,
  zbuf: Vec<u8>,
  pos: usize,
  len: usize,
  input_done: bool,
  ended: bool,
}
impl core::fmt::Debug for Inflater {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Inflater")
      .field("buffered", &(self.len - self.pos))
      .field("input_done", &self.input_done)
      .field("ended", &self.ended)
      .finish()
  }
}
impl Inflater {
  /// Makes an inflater that buffers up to `zbuf_size` compressed bytes.
  #[must_use]
  pub fn new(zbuf_size: usize) -> Self {
    Self {
      state: InflateState::new_boxed(DataFormat::Zlib),
      zbuf: vec![0; zbuf_size.max(1)],
      pos: 0,
      len: 0,
      input_done: false,
      ended: false,
    }
  }

  /// One call into the engine with whatever input is buffered.
  fn step(&mut self, out: &mut [u8]) -> PngResult<(usize, usize)> {
    let r = miniz_oxide::inflate::stream::inflate(
      &mut self.state,
      &self.zbuf[self.pos..self.len],
      out,
      MZFlush::None,
    );
    self.pos += r.bytes_consumed;
    match r.status {
      Ok(MZStatus::StreamEnd) => self.ended = true,
      // `Buf` just means "no progress possible right now".
      Ok(_) | Err(MZError::Buf) => (),
      Err(e) => {
        log::debug!("inflate failed: {e:?}");
        return Err(PngError::ZlibCorrupt);
      }
    }
    Ok((r.bytes_consumed, r.bytes_written))
  }

  /// Pulls more compressed bytes. `Ok(false)` means the input is used up.
  fn refill<F>(&mut self, refill: &mut F) -> PngResult<bool>
  where
    F: FnMut(&mut [u8]) -> PngResult<usize>,
  {
    if self.input_done {
      return Ok(false);
    }
    if self.pos > 0 {
      self.zbuf.copy_within(self.pos..self.len, 0);
      self.len -= self.pos;
      self.pos = 0;
    }
    if self.len == self.zbuf.len() {
      // a full buffer that the engine won't touch
      return Err(PngError::ZlibCorrupt);
    }
    match refill(&mut self.zbuf[self.len..])? {
      0 => {
        self.input_done = true;
        Ok(false)
      }
      n => {
        self.len += n;
        Ok(true)
      }
    }
  }

  /// Fills all of `out` with decompressed bytes.
  ///
  /// `refill` writes compressed bytes into the slice it's given and returns
  /// how many it wrote, with 0 meaning there's no more compressed data.
  ///
  /// ## Failure
  /// * [`PngError::NotEnoughImageData`] if the stream or the input ends first.
  /// * [`PngError::ZlibCorrupt`] if the stream is damaged.
  pub fn read_exact<F>(&mut self, out: &mut [u8], mut refill: F) -> PngResult<()>
  where
    F: FnMut(&mut [u8]) -> PngResult<usize>,
  {
    let mut filled = 0;
    while filled < out.len() {
      if self.ended {
        return Err(PngError::NotEnoughImageData);
      }
      let (consumed, written) = self.step(&mut out[filled..])?;
      filled += written;
      if consumed == 0 && written == 0 && !self.ended && !self.refill(&mut refill)? {
        return Err(PngError::NotEnoughImageData);
      }
    }
    Ok(())
  }

  /// Runs the stream to its end once all expected output has been read.
  pub fn finish<F>(&mut self, mut refill: F) -> PngResult<InflateEnd>
  where
    F: FnMut(&mut [u8]) -> PngResult<usize>,
  {
    let mut extra_output = false;
    let mut scratch = [0_u8; 256];
    while !self.ended {
      let (consumed, written) = self.step(&mut scratch)?;
      extra_output |= written > 0;
      if consumed == 0 && written == 0 && !self.ended && !self.refill(&mut refill)? {
        break;
      }
    }
    Ok(InflateEnd { extra_output, stream_ended: self.ended, unused_input: self.len - self.pos })
  }
}

/// Compresses bytes into a zlib stream, one output buffer at a time.
pub struct Deflater {
  compressor: Box<CompressorOxide>,
  zbuf: Vec<u8>,
  len: usize,
}
impl core::fmt::Debug for Deflater {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Deflater").field("pending", &self.len).finish()
  }
}
impl Deflater {
  /// `level` is the zlib level, clamped to 0 through 10.
  #[must_use]
  pub fn new(level: u8, zbuf_size: usize) -> Self {
    let flags = create_comp_flags_from_zip_params(i32::from(level.min(10)), 15, 0);
    Self {
      compressor: Box::new(CompressorOxide::new(flags)),
      zbuf: vec![0; zbuf_size.max(1)],
      len: 0,
    }
  }

  fn flush_full<F>(&mut self, emit: &mut F) -> PngResult<()>
  where
    F: FnMut(&[u8]) -> PngResult<()>,
  {
    if self.len == self.zbuf.len() {
      emit(&self.zbuf)?;
      self.len = 0;
    }
    Ok(())
  }

  /// Compresses all of `input`. `emit` gets each output buffer as it fills.
  pub fn push<F>(&mut self, mut input: &[u8], mut emit: F) -> PngResult<()>
  where
    F: FnMut(&[u8]) -> PngResult<()>,
  {
    while !input.is_empty() {
      let r = miniz_oxide::deflate::stream::deflate(
        &mut self.compressor,
        input,
        &mut self.zbuf[self.len..],
        MZFlush::None,
      );
      if let Err(e) = r.status {
        if e != MZError::Buf {
          log::error!("deflate failed: {e:?}");
          return Err(PngError::DeflateFailed);
        }
      }
      input = &input[r.bytes_consumed..];
      self.len += r.bytes_written;
      if r.bytes_consumed == 0 && r.bytes_written == 0 && self.len < self.zbuf.len() {
        return Err(PngError::DeflateFailed);
      }
      self.flush_full(&mut emit)?;
    }
    Ok(())
  }

  /// Ends the stream, emitting everything still buffered.
  pub fn finish<F>(&mut self, mut emit: F) -> PngResult<()>
  where
    F: FnMut(&[u8]) -> PngResult<()>,
  {
    loop {
      let r = miniz_oxide::deflate::stream::deflate(
        &mut self.compressor,
        &[],
        &mut self.zbuf[self.len..],
        MZFlush::Finish,
      );
      self.len += r.bytes_written;
      match r.status {
        Ok(MZStatus::StreamEnd) => {
          if self.len > 0 {
            emit(&self.zbuf[..self.len])?;
            self.len = 0;
          }
          return Ok(());
        }
        Ok(_) | Err(MZError::Buf) => {
          if r.bytes_written == 0 && self.len < self.zbuf.len() {
            return Err(PngError::DeflateFailed);
          }
          self.flush_full(&mut emit)?;
        }
        Err(e) => {
          log::error!("deflate failed: {e:?}");
          return Err(PngError::DeflateFailed);
        }
      }
    }
  }
}
