//! The encode session.

use alloc::{boxed::Box, vec, vec::Vec};

use crate::{
  crc32::chunk_crc,
  filter::FilterSelector,
  interlace::{extract_row, PassGeometry, ADAM7, FULL_IMAGE},
  zstream::Deflater,
  AncillaryChunk, ByteSink, ChunkLocation, ChunkType, Diagnostic, EncodeConfig, ErrorChannel,
  Limits, LogReporter, Metadata, PngColorType, PngError, PngResult, Reporter, IHDR, PNG_SIGNATURE,
};

/// Writes the 8 byte PNG signature.
#[inline]
pub fn write_signature<W: ByteSink + ?Sized>(sink: &mut W) -> PngResult<()> {
  sink.write_all(&PNG_SIGNATURE)
}

/// Writes one complete chunk: length, type, data, and CRC.
pub fn write_chunk<W: ByteSink + ?Sized>(sink: &mut W, ty: ChunkType, data: &[u8]) -> PngResult<()> {
  let length = match u32::try_from(data.len()) {
    Ok(l) if l <= i32::MAX as u32 => l,
    _ => return Err(PngError::ChunkTooLarge(ty)),
  };
  log::trace!("writing {ty:?}: {length} bytes");
  sink.write_all(&length.to_be_bytes())?;
  sink.write_all(ty.as_bytes())?;
  sink.write_all(data)?;
  sink.write_all(&chunk_crc(ty, data).to_be_bytes())
}

static SINGLE_PASS: [PassGeometry; 1] = [FULL_IMAGE];
static INTERLACED_PASSES: [PassGeometry; 7] = ADAM7;

/// Encodes one PNG stream.
///
/// Rows are always given at full resolution. For an interlaced image every
/// row is given once per pass, so [`passes`](Self::passes) times the height
/// in total, and the encoder keeps only the pixels each pass needs.
///
/// Once any call fails every later call gives [`PngError::SessionFailed`].
pub struct Encoder<W> {
  sink: W,
  ihdr: IHDR,
  config: EncodeConfig,
  channel: ErrorChannel,
  palette: Vec<[u8; 3]>,
  chunks: Vec<AncillaryChunk>,
  header_written: bool,
  failed: bool,
  deflater: Deflater,
  selector: FilterSelector,
  passes: &'static [PassGeometry],
  pass: usize,
  /// full image row expected next within the current pass.
  y: u32,
  /// the previous unfiltered row of the current pass.
  prev: Vec<u8>,
  pass_buf: Vec<u8>,
}
impl<W> core::fmt::Debug for Encoder<W> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Encoder")
      .field("ihdr", &self.ihdr)
      .field("pass", &self.pass)
      .field("y", &self.y)
      .field("header_written", &self.header_written)
      .field("failed", &self.failed)
      .finish()
  }
}
impl<W: ByteSink> Encoder<W> {
  /// Starts an encode session. Nothing is written until the first row.
  #[inline]
  pub fn new(sink: W, ihdr: IHDR, config: EncodeConfig) -> PngResult<Self> {
    Self::with_reporter(sink, ihdr, config, Box::new(LogReporter))
  }

  /// Like [`new`](Self::new), with a caller's reporter.
  pub fn with_reporter(
    sink: W, ihdr: IHDR, config: EncodeConfig, reporter: Box<dyn Reporter>,
  ) -> PngResult<Self> {
    let mut channel = ErrorChannel::new(Default::default(), reporter);
    let unlimited = Limits { width_max: u32::MAX, height_max: u32::MAX, ..Limits::default() };
    if let Err(e) = ihdr.validate(&unlimited) {
      channel.fatal(e);
      return Err(e);
    }
    log::debug!("encoding {ihdr:?}");
    let row_len = ihdr.bytes_per_row(ihdr.width);
    // each full output buffer becomes one IDAT.
    let idat_len = config.zbuf_size.min(config.chunk_length_max as usize);
    Ok(Self {
      sink,
      ihdr,
      deflater: Deflater::new(config.compression_level, idat_len),
      selector: FilterSelector::new(config.filter, &ihdr, config.kernel),
      config,
      channel,
      palette: Vec::new(),
      chunks: Vec::new(),
      header_written: false,
      failed: false,
      passes: if ihdr.is_interlaced { &INTERLACED_PASSES[..] } else { &SINGLE_PASS[..] },
      pass: 0,
      y: 0,
      prev: vec![0; row_len],
      pass_buf: vec![0; row_len],
    })
  }

  #[inline]
  #[must_use]
  pub fn ihdr(&self) -> IHDR {
    self.ihdr
  }

  /// 7 for interlaced images, otherwise 1.
  #[inline]
  #[must_use]
  pub fn passes(&self) -> usize {
    self.passes.len()
  }

  #[inline]
  #[must_use]
  pub fn diagnostics(&self) -> &[Diagnostic] {
    self.channel.diagnostics()
  }

  /// The error that ended this session, if any.
  #[inline]
  #[must_use]
  pub fn error(&self) -> Option<PngError> {
    self.channel.fatal_error()
  }

  fn check_live(&self) -> PngResult<()> {
    if self.failed {
      Err(PngError::SessionFailed)
    } else {
      Ok(())
    }
  }

  fn fail<T>(&mut self, e: PngError) -> PngResult<T> {
    self.failed = true;
    self.channel.fatal(e);
    Err(e)
  }

  /// Sets the palette. Must happen before the first row.
  pub fn set_palette(&mut self, entries: &[[u8; 3]]) -> PngResult<()> {
    self.check_live()?;
    if self.header_written {
      return self.fail(PngError::OutOfOrderCall);
    }
    let max_entries = match self.ihdr.color_type {
      PngColorType::Y | PngColorType::YA => return self.fail(PngError::PaletteNotAllowed),
      PngColorType::Index => 1 << self.ihdr.bit_depth,
      PngColorType::RGB | PngColorType::RGBA => 256,
    };
    if entries.is_empty() || entries.len() > max_entries {
      return self.fail(PngError::BadPalette);
    }
    self.palette = entries.to_vec();
    Ok(())
  }

  /// Adds a `tRNS` chunk. The layout depends on the color type.
  pub fn set_transparency(&mut self, data: &[u8]) -> PngResult<()> {
    self.check_live()?;
    let ok = match self.ihdr.color_type {
      PngColorType::Y => data.len() == 2,
      PngColorType::RGB => data.len() == 6,
      PngColorType::Index => !data.is_empty() && data.len() <= self.palette.len(),
      PngColorType::YA | PngColorType::RGBA => false,
    };
    if !ok {
      return self.fail(PngError::BadAncillaryChunk(ChunkType::tRNS));
    }
    self.add_chunk(ChunkType::tRNS, data, ChunkLocation::BeforeIDAT)
  }

  /// Queues an ancillary chunk to be written at `location`.
  ///
  /// Known chunk types are moved to a location the format allows. Once rows
  /// have started, only chunks that go after the image data can be added.
  pub fn add_chunk(&mut self, ty: ChunkType, data: &[u8], location: ChunkLocation) -> PngResult<()> {
    self.check_live()?;
    if !ty.is_valid() {
      return self.fail(PngError::InvalidChunkType);
    }
    if ty.is_critical() {
      return self.fail(PngError::NotAncillary(ty));
    }
    if data.len() > self.config.chunk_length_max as usize {
      return self.fail(PngError::ChunkTooLarge(ty));
    }
    let location = location.legal_for(ty);
    if self.header_written && location != ChunkLocation::AfterIDAT {
      return self.fail(PngError::OutOfOrderCall);
    }
    if ty.is_single_instance() && self.chunks.iter().any(|c| c.ty == ty) {
      return self.fail(PngError::DuplicateChunk(ty));
    }
    self.chunks.push(AncillaryChunk { ty, data: data.to_vec(), location });
    Ok(())
  }

  /// Queues every chunk of `metadata` at its recorded location.
  pub fn copy_metadata(&mut self, metadata: &Metadata) -> PngResult<()> {
    for c in metadata.chunks() {
      self.add_chunk(c.ty, &c.data, c.location)?;
    }
    Ok(())
  }

  fn write_queued(&mut self, location: ChunkLocation) -> PngResult<()> {
    for c in self.chunks.iter().filter(|c| c.location == location) {
      write_chunk(&mut self.sink, c.ty, &c.data)?;
    }
    Ok(())
  }

  /// Everything before the first `IDAT`.
  fn write_header(&mut self) -> PngResult<()> {
    if self.header_written {
      return Ok(());
    }
    if self.ihdr.color_type == PngColorType::Index && self.palette.is_empty() {
      return Err(PngError::MissingPalette);
    }
    write_signature(&mut self.sink)?;
    write_chunk(&mut self.sink, ChunkType::IHDR, &self.ihdr.to_bytes())?;
    self.write_queued(ChunkLocation::BeforePLTE)?;
    if !self.palette.is_empty() {
      write_chunk(&mut self.sink, ChunkType::PLTE, bytemuck::cast_slice(self.palette.as_slice()))?;
    }
    self.write_queued(ChunkLocation::BeforeIDAT)?;
    self.header_written = true;
    Ok(())
  }

  /// Writes the next row, given at full resolution.
  pub fn write_row(&mut self, row: &[u8]) -> PngResult<()> {
    self.check_live()?;
    let expected = self.ihdr.bytes_per_row(self.ihdr.width);
    if row.len() != expected {
      return self.fail(PngError::RowLengthMismatch { expected, given: row.len() });
    }
    if self.pass >= self.passes.len() {
      return self.fail(PngError::TooManyRows);
    }
    match self.write_row_inner(row) {
      Ok(()) => Ok(()),
      Err(e) => self.fail(e),
    }
  }

  fn write_row_inner(&mut self, row: &[u8]) -> PngResult<()> {
    self.write_header()?;
    let ihdr = self.ihdr;
    let p = self.passes[self.pass];
    let reduced_width = p.width(ihdr.width);
    if reduced_width > 0 && p.contains_row(self.y) {
      let len = ihdr.bytes_per_row(reduced_width);
      let src: &[u8] = if ihdr.is_interlaced {
        extract_row(row, self.pass, ihdr.width, ihdr.bits_per_pixel(), &mut self.pass_buf[..len])?;
        &self.pass_buf[..len]
      } else {
        row
      };
      let (ft, filtered) = self.selector.choose_and_apply(src, &self.prev[..len], ihdr.filter_bpp())?;
      let sink = &mut self.sink;
      let mut emit = |b: &[u8]| write_chunk(sink, ChunkType::IDAT, b);
      self.deflater.push(&[ft as u8], &mut emit)?;
      self.deflater.push(filtered, &mut emit)?;
      self.prev[..len].copy_from_slice(src);
    }
    self.y += 1;
    if self.y == ihdr.height {
      self.y = 0;
      self.pass += 1;
      self.prev.fill(0);
      if self.pass < self.passes.len() {
        log::debug!("pass {}", self.pass);
      }
    }
    Ok(())
  }

  /// Writes every row of a full image, `height` rows of
  /// `bytes_per_row(width)` bytes each.
  pub fn write_image(&mut self, image: &[u8]) -> PngResult<()> {
    self.check_live()?;
    let stride = self.ihdr.bytes_per_row(self.ihdr.width);
    let expected = stride * self.ihdr.height as usize;
    if image.len() != expected {
      return self.fail(PngError::RowLengthMismatch { expected, given: image.len() });
    }
    for _ in self.pass..self.passes.len() {
      for row in image.chunks_exact(stride).skip(self.y as usize) {
        self.write_row(row)?;
      }
    }
    Ok(())
  }

  /// Ends the image data, writes the trailing chunks and `IEND`, and gives
  /// back the sink.
  pub fn finish(mut self) -> PngResult<W> {
    self.check_live()?;
    match self.finish_inner() {
      Ok(()) => Ok(self.sink),
      Err(e) => self.fail(e),
    }
  }

  fn finish_inner(&mut self) -> PngResult<()> {
    if self.pass < self.passes.len() {
      return Err(PngError::TooFewRows);
    }
    let sink = &mut self.sink;
    self.deflater.finish(|b| write_chunk(sink, ChunkType::IDAT, b))?;
    self.write_queued(ChunkLocation::AfterIDAT)?;
    write_chunk(&mut self.sink, ChunkType::IEND, &[])?;
    self.sink.flush()?;
    log::debug!("encode finished");
    Ok(())
  }
}
