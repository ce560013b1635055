//! The byte source and byte sink that sessions read from and write to.
//!
//! Both are owned by the caller. A session only ever calls `read` or `write`
//! on them, and never holds onto anything else.

use alloc::vec::Vec;

use crate::{PngError, PngResult};

/// Somewhere to pull bytes from.
pub trait ByteSource {
  /// Reads up to `buf.len()` bytes, returning how many were read.
  ///
  /// Returning `Ok(0)` for a non-empty `buf` means the source is exhausted.
  fn read(&mut self, buf: &mut [u8]) -> PngResult<usize>;

  /// Fills all of `buf`, or fails with [`PngError::UnexpectedEof`].
  fn read_exact(&mut self, mut buf: &mut [u8]) -> PngResult<()> {
    while !buf.is_empty() {
      match self.read(buf)? {
        0 => return Err(PngError::UnexpectedEof),
        n => buf = &mut buf[n..],
      }
    }
    Ok(())
  }
}

impl ByteSource for &[u8] {
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> PngResult<usize> {
    let n = buf.len().min(self.len());
    let (head, tail) = self.split_at(n);
    buf[..n].copy_from_slice(head);
    *self = tail;
    Ok(n)
  }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> PngResult<usize> {
    (**self).read(buf)
  }
}

/// Somewhere to push bytes to.
pub trait ByteSink {
  /// Writes every byte given.
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()>;

  /// Pushes out anything buffered.
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    Ok(())
  }
}

impl ByteSink for Vec<u8> {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    self.extend_from_slice(bytes);
    Ok(())
  }
}

impl<W: ByteSink + ?Sized> ByteSink for &mut W {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    (**self).write_all(bytes)
  }
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    (**self).flush()
  }
}

/// Adapts any [`std::io::Read`] into a [`ByteSource`].
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct IoSource<R>(pub R);
#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for IoSource<R> {
  fn read(&mut self, buf: &mut [u8]) -> PngResult<usize> {
    loop {
      match self.0.read(buf) {
        Ok(n) => return Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(e.into()),
      }
    }
  }
}

/// Adapts any [`std::io::Write`] into a [`ByteSink`].
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct IoSink<W>(pub W);
#[cfg(feature = "std")]
impl<W: std::io::Write> ByteSink for IoSink<W> {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    Ok(self.0.write_all(bytes)?)
  }
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    Ok(self.0.flush()?)
  }
}
