//! The decode session.

use alloc::{boxed::Box, vec, vec::Vec};
use core::mem;

use crate::{
  chunks::Background,
  crc32::Crc32,
  filter::{unfilter_with, FilterType},
  interlace::{expand_into_image, PassGeometry, ADAM7, FULL_IMAGE},
  zstream::Inflater,
  AncillaryChunk, ByteSource, ChunkLocation, ChunkType, CrcAction, CrcPolicy, DecodeConfig,
  Diagnostic, ErrorChannel, LogReporter, Metadata, Placement, PngChunk, PngColorType, PngError,
  PngResult, RawChunk, Reporter, RowFilterKernel, Severity, IHDR, PNG_SIGNATURE,
};

/// Where a decode session is in the chunk sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadState {
  ExpectSignature,
  ExpectIHDR,
  /// `IHDR` was read, no `PLTE` yet.
  BeforePLTE,
  /// `PLTE` was read (or skipped), no `IDAT` yet.
  BeforeIDAT,
  /// Reading the run of `IDAT` chunks.
  InIDAT,
  /// Some other chunk followed the `IDAT` run.
  AfterIDAT,
  /// `IEND` was read.
  Done,
  /// A fatal error ended the session.
  Failed,
}

#[derive(Debug, Clone, Copy)]
struct ChunkHeader {
  length: u32,
  ty: ChunkType,
}

/// The byte source plus the CRC of the chunk being read.
struct ChunkStream<S> {
  source: S,
  crc: Crc32,
}
impl<S: ByteSource> ChunkStream<S> {
  fn read_signature(&mut self) -> PngResult<()> {
    let mut sig = [0_u8; 8];
    self.source.read_exact(&mut sig)?;
    if sig == PNG_SIGNATURE {
      Ok(())
    } else {
      Err(PngError::BadSignature)
    }
  }

  /// Reads the length and type, and starts the CRC.
  fn read_header(&mut self) -> PngResult<ChunkHeader> {
    let mut b = [0_u8; 8];
    self.source.read_exact(&mut b)?;
    let length = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
    let ty = ChunkType([b[4], b[5], b[6], b[7]]);
    if !ty.is_valid() {
      return Err(PngError::InvalidChunkType);
    }
    if length > i32::MAX as u32 {
      return Err(PngError::ChunkTooLarge(ty));
    }
    self.crc = Crc32::new().chain(ty.as_bytes());
    log::trace!("chunk {ty:?}: {length} bytes");
    Ok(ChunkHeader { length, ty })
  }

  fn read_data(&mut self, buf: &mut [u8]) -> PngResult<()> {
    self.source.read_exact(buf)?;
    self.crc.update(buf);
    Ok(())
  }

  fn skip(&mut self, mut length: u32) -> PngResult<()> {
    let mut scratch = [0_u8; 512];
    while length > 0 {
      let n = (length as usize).min(scratch.len());
      self.read_data(&mut scratch[..n])?;
      length -= n as u32;
    }
    Ok(())
  }

  /// Reads the stored CRC and applies the policy for this chunk type.
  ///
  /// `Ok(false)` means the chunk should be dropped.
  fn check_crc(
    &mut self, ty: ChunkType, policy: &CrcPolicy, channel: &mut ErrorChannel,
  ) -> PngResult<bool> {
    let mut b = [0_u8; 4];
    self.source.read_exact(&mut b)?;
    let action = policy.action_for(ty);
    if action == CrcAction::Skip || u32::from_be_bytes(b) == self.crc.finalize() {
      return Ok(true);
    }
    match action {
      CrcAction::Error => Err(PngError::CrcMismatch(ty)),
      CrcAction::WarnDiscard => {
        channel.benign(PngError::CrcMismatch(ty))?;
        Ok(false)
      }
      CrcAction::WarnUse => {
        channel.benign(PngError::CrcMismatch(ty))?;
        Ok(true)
      }
      CrcAction::QuietUse | CrcAction::Skip => Ok(true),
    }
  }

  /// Skips the rest of a chunk we don't want, CRC included.
  fn discard(&mut self, length: u32) -> PngResult<()> {
    self.skip(length)?;
    let mut b = [0_u8; 4];
    self.source.read_exact(&mut b)
  }
}

/// Reads the signature and the `IHDR`.
fn read_start<S: ByteSource>(
  stream: &mut ChunkStream<S>, config: &DecodeConfig, channel: &mut ErrorChannel,
) -> PngResult<IHDR> {
  stream.read_signature()?;
  let h = stream.read_header()?;
  if h.ty != ChunkType::IHDR {
    return Err(PngError::FirstChunkNotIHDR);
  }
  if h.length != 13 {
    return Err(PngError::BadHeaderLength);
  }
  let mut data = [0_u8; 13];
  stream.read_data(&mut data)?;
  stream.check_crc(h.ty, &config.crc, channel)?;
  let ihdr = IHDR::try_from(&data[..])?;
  ihdr.validate(&config.limits)?;
  log::debug!("{ihdr:?}");
  Ok(ihdr)
}

/// Everything about the chunk sequence, but nothing about rows.
struct ChunkReader<S> {
  stream: ChunkStream<S>,
  config: DecodeConfig,
  channel: ErrorChannel,
  state: ReadState,
  ihdr: IHDR,
  palette: Vec<[u8; 3]>,
  metadata: Metadata,
  /// A header that was read but belongs to the next phase.
  pending: Option<ChunkHeader>,
  idat_remaining: u32,
}
impl<S: ByteSource> ChunkReader<S> {
  fn next_header(&mut self) -> PngResult<ChunkHeader> {
    match self.pending.take() {
      Some(h) => Ok(h),
      None => self.stream.read_header(),
    }
  }

  fn location(&self) -> ChunkLocation {
    match self.state {
      ReadState::ExpectSignature | ReadState::ExpectIHDR | ReadState::BeforePLTE => {
        ChunkLocation::BeforePLTE
      }
      ReadState::BeforeIDAT => ChunkLocation::BeforeIDAT,
      _ => ChunkLocation::AfterIDAT,
    }
  }

  /// Reads chunks up to the start of the first `IDAT`.
  fn read_info(&mut self) -> PngResult<()> {
    loop {
      let h = self.next_header()?;
      match h.ty {
        ChunkType::IHDR => return Err(PngError::DuplicateChunk(ChunkType::IHDR)),
        ChunkType::PLTE => self.read_palette(h)?,
        ChunkType::IDAT => return self.begin_idat(h),
        ChunkType::IEND => return Err(PngError::MissingImageData),
        ty if ty.is_critical() => return Err(PngError::UnknownCriticalChunk(ty)),
        _ => self.read_ancillary(h)?,
      }
    }
  }

  fn read_palette(&mut self, h: ChunkHeader) -> PngResult<()> {
    if self.state != ReadState::BeforePLTE {
      return Err(PngError::DuplicateChunk(ChunkType::PLTE));
    }
    let is_indexed = match self.ihdr.color_type {
      PngColorType::Y | PngColorType::YA => return Err(PngError::PaletteNotAllowed),
      PngColorType::Index => true,
      PngColorType::RGB | PngColorType::RGBA => false,
    };
    self.state = ReadState::BeforeIDAT;
    let entries = h.length / 3;
    let max_entries = if is_indexed { 1 << self.ihdr.bit_depth } else { 256 };
    if h.length % 3 != 0 || entries == 0 || entries > max_entries {
      if is_indexed {
        return Err(PngError::BadPalette);
      }
      // it's only a suggestion in a true color image.
      self.channel.benign(PngError::BadPalette)?;
      return self.stream.discard(h.length);
    }
    let mut data = vec![0_u8; h.length as usize];
    self.stream.read_data(&mut data)?;
    if self.stream.check_crc(h.ty, &self.config.crc, &mut self.channel)? {
      let entries: &[[u8; 3]] =
        bytemuck::try_cast_slice(&data[..]).map_err(|_| PngError::BadPalette)?;
      self.palette = entries.to_vec();
      log::debug!("palette with {} entries", self.palette.len());
    }
    Ok(())
  }

  fn placement_ok(&self, placement: Placement) -> bool {
    let before_idat = matches!(self.state, ReadState::BeforePLTE | ReadState::BeforeIDAT);
    match placement {
      Placement::BeforePLTE => self.state == ReadState::BeforePLTE,
      Placement::AfterPLTE => {
        before_idat && (self.ihdr.color_type != PngColorType::Index || !self.palette.is_empty())
      }
      Placement::BeforeIDAT => before_idat,
      Placement::Critical | Placement::Anywhere => true,
    }
  }

  /// Checks a known ancillary chunk against the rest of the image.
  fn validate_known(&self, ty: ChunkType, data: &[u8]) -> PngResult<()> {
    let bad = PngError::BadAncillaryChunk(ty);
    let parsed = PngChunk::try_from(RawChunk { ty, data, declared_crc: 0 }).map_err(|_| bad)?;
    let color_type = self.ihdr.color_type;
    let ok = match parsed {
      PngChunk::tRNS(t) => match color_type {
        PngColorType::Y => t.len() == 2,
        PngColorType::RGB => t.len() == 6,
        PngColorType::Index => !t.is_empty() && t.len() <= self.palette.len(),
        PngColorType::YA | PngColorType::RGBA => false,
      },
      PngChunk::bKGD(bg) => match (color_type, bg) {
        (PngColorType::Index, Background::Index { i }) => usize::from(i) < self.palette.len(),
        (PngColorType::Y | PngColorType::YA, Background::Greyscale { .. }) => true,
        (PngColorType::RGB | PngColorType::RGBA, Background::RGB { .. }) => true,
        _ => false,
      },
      _ => true,
    };
    if ok {
      Ok(())
    } else {
      Err(bad)
    }
  }

  fn read_ancillary(&mut self, h: ChunkHeader) -> PngResult<()> {
    let ty = h.ty;
    if h.length > self.config.limits.chunk_length_max {
      self.channel.benign(PngError::ChunkTooLarge(ty))?;
      return self.stream.discard(h.length);
    }
    let known = ty.placement();
    if let Some(placement) = known {
      if !self.placement_ok(placement) {
        self.channel.benign(PngError::ChunkOutOfPlace(ty))?;
        return self.stream.discard(h.length);
      }
      if ty.is_single_instance() && self.metadata.get(ty).is_some() {
        self.channel.benign(PngError::DuplicateChunk(ty))?;
        return self.stream.discard(h.length);
      }
    } else if !self.config.keeps_unknown(ty) {
      log::debug!("skipping unknown chunk {ty:?}");
      return self.stream.discard(h.length);
    }
    if self.metadata.len() >= self.config.limits.ancillary_chunk_max {
      self.channel.warning(PngError::TooManyAncillaryChunks)?;
      return self.stream.discard(h.length);
    }
    let mut data = vec![0_u8; h.length as usize];
    self.stream.read_data(&mut data)?;
    if !self.stream.check_crc(ty, &self.config.crc, &mut self.channel)? {
      return Ok(());
    }
    if known.is_some() {
      if let Err(e) = self.validate_known(ty, &data) {
        return self.channel.benign(e);
      }
    }
    let location = self.location();
    self.metadata.push(AncillaryChunk { ty, data, location });
    Ok(())
  }

  fn begin_idat(&mut self, h: ChunkHeader) -> PngResult<()> {
    if self.ihdr.color_type == PngColorType::Index && self.palette.is_empty() {
      return Err(PngError::MissingPalette);
    }
    log::debug!("image data starts");
    self.state = ReadState::InIDAT;
    self.idat_remaining = h.length;
    if h.length == 0 {
      self.stream.check_crc(ChunkType::IDAT, &self.config.crc, &mut self.channel)?;
    }
    Ok(())
  }

  /// Gives the inflater more compressed bytes, moving across `IDAT` chunks.
  ///
  /// Returns 0 once the `IDAT` run is over.
  fn feed_idat(&mut self, buf: &mut [u8]) -> PngResult<usize> {
    loop {
      if self.idat_remaining > 0 {
        let n = buf.len().min(self.idat_remaining as usize);
        self.stream.read_data(&mut buf[..n])?;
        self.idat_remaining -= n as u32;
        if self.idat_remaining == 0 {
          self.stream.check_crc(ChunkType::IDAT, &self.config.crc, &mut self.channel)?;
        }
        return Ok(n);
      }
      if self.state != ReadState::InIDAT {
        return Ok(0);
      }
      let h = self.stream.read_header()?;
      if h.ty == ChunkType::IDAT {
        self.idat_remaining = h.length;
        if h.length == 0 {
          self.stream.check_crc(h.ty, &self.config.crc, &mut self.channel)?;
        }
      } else {
        log::debug!("image data ends");
        self.state = ReadState::AfterIDAT;
        self.pending = Some(h);
        return Ok(0);
      }
    }
  }

  /// Skips whatever is left of the `IDAT` run, returning how many bytes that was.
  fn skip_idat(&mut self) -> PngResult<usize> {
    let mut skipped = 0;
    let mut scratch = [0_u8; 512];
    loop {
      match self.feed_idat(&mut scratch)? {
        0 => return Ok(skipped),
        n => skipped += n,
      }
    }
  }

  /// Reads every chunk after the `IDAT` run, through `IEND`.
  fn read_to_end(&mut self) -> PngResult<()> {
    loop {
      let h = self.next_header()?;
      match h.ty {
        ChunkType::IEND => {
          if h.length != 0 {
            self.channel.benign(PngError::NonEmptyIEND)?;
            self.stream.skip(h.length)?;
          }
          self.stream.check_crc(h.ty, &self.config.crc, &mut self.channel)?;
          self.state = ReadState::Done;
          break;
        }
        ChunkType::IDAT => {
          self.channel.benign(PngError::DiscontiguousIDAT)?;
          self.stream.discard(h.length)?;
        }
        ChunkType::IHDR => return Err(PngError::DuplicateChunk(ChunkType::IHDR)),
        ChunkType::PLTE => return Err(PngError::ChunkOutOfPlace(ChunkType::PLTE)),
        ty if ty.is_critical() => return Err(PngError::UnknownCriticalChunk(ty)),
        _ => self.read_ancillary(h)?,
      }
    }
    let mut probe = [0_u8; 1];
    if self.stream.source.read(&mut probe)? != 0 {
      return Err(PngError::DataAfterIEND);
    }
    log::debug!("decode finished");
    Ok(())
  }
}

/// One decoded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
  /// The Adam7 pass, 0 through 6. Always 0 for non-interlaced images.
  pub pass: usize,
  /// The row index within the pass.
  pub pass_row: u32,
  /// The full image row that this row's pixels belong to.
  pub image_y: u32,
  /// Pixels in this row.
  pub width: u32,
  /// Unfiltered pixel data, packed as in the file.
  pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
struct RowInfo {
  pass: usize,
  pass_row: u32,
  image_y: u32,
  width: u32,
  len: usize,
}

static SINGLE_PASS: [PassGeometry; 1] = [FULL_IMAGE];
static INTERLACED_PASSES: [PassGeometry; 7] = ADAM7;

/// Decodes one PNG stream.
///
/// A decoder is made for a single image and can't be reused. Once any call
/// fails with a fatal error every later call gives
/// [`PngError::SessionFailed`].
pub struct Decoder<S> {
  chunks: ChunkReader<S>,
  inflater: Inflater,
  kernel: &'static dyn RowFilterKernel,
  passes: &'static [PassGeometry],
  pass: usize,
  pass_row: u32,
  /// the last row returned, with its filter byte in front.
  prev: Vec<u8>,
  cur: Vec<u8>,
  rows_done: bool,
}
impl<S> core::fmt::Debug for Decoder<S> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Decoder")
      .field("ihdr", &self.chunks.ihdr)
      .field("state", &self.chunks.state)
      .field("pass", &self.pass)
      .field("pass_row", &self.pass_row)
      .finish()
  }
}
impl<S: ByteSource> Decoder<S> {
  /// Starts decoding, reading everything before the image data.
  ///
  /// Problems are reported to the `log` facade.
  #[inline]
  pub fn new(source: S, config: DecodeConfig) -> PngResult<Self> {
    Self::with_reporter(source, config, Box::new(LogReporter))
  }

  /// Like [`new`](Self::new), with a caller's reporter.
  pub fn with_reporter(
    source: S, config: DecodeConfig, reporter: Box<dyn Reporter>,
  ) -> PngResult<Self> {
    let mut channel = ErrorChannel::new(config.benign, reporter);
    let mut stream = ChunkStream { source, crc: Crc32::new() };
    let ihdr = match read_start(&mut stream, &config, &mut channel) {
      Ok(ihdr) => ihdr,
      Err(e) => {
        channel.fatal(e);
        return Err(e);
      }
    };
    let inflater = Inflater::new(config.zbuf_size);
    let kernel = config.kernel;
    let row_len = ihdr.bytes_per_row(ihdr.width) + 1;
    let mut chunks = ChunkReader {
      stream,
      config,
      channel,
      state: ReadState::BeforePLTE,
      ihdr,
      palette: Vec::new(),
      metadata: Metadata::default(),
      pending: None,
      idat_remaining: 0,
    };
    if let Err(e) = chunks.read_info() {
      chunks.state = ReadState::Failed;
      chunks.channel.fatal(e);
      return Err(e);
    }
    Ok(Self {
      chunks,
      inflater,
      kernel,
      passes: if ihdr.is_interlaced { &INTERLACED_PASSES[..] } else { &SINGLE_PASS[..] },
      pass: 0,
      pass_row: 0,
      prev: vec![0; row_len],
      cur: vec![0; row_len],
      rows_done: false,
    })
  }

  #[inline]
  #[must_use]
  pub fn ihdr(&self) -> IHDR {
    self.chunks.ihdr
  }

  /// The palette, empty if there isn't one.
  #[inline]
  #[must_use]
  pub fn palette(&self) -> &[[u8; 3]] {
    &self.chunks.palette
  }

  #[inline]
  #[must_use]
  pub fn transparency(&self) -> Option<&[u8]> {
    self.chunks.metadata.transparency()
  }

  /// Ancillary chunks read so far.
  #[inline]
  #[must_use]
  pub fn metadata(&self) -> &Metadata {
    &self.chunks.metadata
  }

  #[inline]
  #[must_use]
  pub fn state(&self) -> ReadState {
    self.chunks.state
  }

  /// Every problem reported so far.
  #[inline]
  #[must_use]
  pub fn diagnostics(&self) -> &[Diagnostic] {
    self.chunks.channel.diagnostics()
  }

  #[inline]
  #[must_use]
  pub fn worst_severity(&self) -> Option<Severity> {
    self.chunks.channel.worst()
  }

  /// The error that ended this session, if any.
  #[inline]
  #[must_use]
  pub fn error(&self) -> Option<PngError> {
    self.chunks.channel.fatal_error()
  }

  /// 7 for interlaced images, otherwise 1.
  #[inline]
  #[must_use]
  pub fn passes(&self) -> usize {
    self.passes.len()
  }

  /// Bytes needed by [`read_image`](Self::read_image).
  #[inline]
  #[must_use]
  pub fn image_bytes(&self) -> usize {
    let ihdr = self.chunks.ihdr;
    ihdr.bytes_per_row(ihdr.width) * ihdr.height as usize
  }

  fn fail(&mut self, e: PngError) {
    self.chunks.state = ReadState::Failed;
    self.chunks.channel.fatal(e);
  }

  fn check_live(&self) -> PngResult<()> {
    match self.chunks.state {
      ReadState::Failed => Err(PngError::SessionFailed),
      ReadState::Done => Err(PngError::OutOfOrderCall),
      _ => Ok(()),
    }
  }

  fn advance_row(&mut self) -> PngResult<Option<RowInfo>> {
    if self.rows_done {
      return Ok(None);
    }
    let ihdr = self.chunks.ihdr;
    let width = loop {
      let Some(p) = self.passes.get(self.pass) else {
        self.rows_done = true;
        log::debug!("all rows read");
        return Ok(None);
      };
      let w = p.width(ihdr.width);
      if w > 0 && self.pass_row < p.height(ihdr.height) {
        break w;
      }
      self.pass += 1;
      self.pass_row = 0;
      self.prev.fill(0);
      if self.pass < self.passes.len() {
        log::debug!("pass {}", self.pass);
      }
    };
    let len = ihdr.bytes_per_row(width);
    let chunks = &mut self.chunks;
    self.inflater.read_exact(&mut self.cur[..=len], |b| chunks.feed_idat(b))?;
    let ft = FilterType::try_from(self.cur[0])?;
    unfilter_with(self.kernel, ft, &mut self.cur[1..=len], &self.prev[1..=len], ihdr.filter_bpp())?;
    mem::swap(&mut self.prev, &mut self.cur);
    let info = RowInfo {
      pass: self.pass,
      pass_row: self.pass_row,
      image_y: self.passes[self.pass].full_y(self.pass_row),
      width,
      len,
    };
    self.pass_row += 1;
    Ok(Some(info))
  }

  /// Decodes the next row, or gives `None` after the last one.
  ///
  /// Interlaced images give the rows of each pass in turn, and passes with no
  /// pixels are skipped.
  pub fn read_row(&mut self) -> PngResult<Option<Row<'_>>> {
    self.check_live()?;
    match self.advance_row() {
      Ok(Some(info)) => Ok(Some(Row {
        pass: info.pass,
        pass_row: info.pass_row,
        image_y: info.image_y,
        width: info.width,
        data: &self.prev[1..=info.len],
      })),
      Ok(None) => Ok(None),
      Err(e) => {
        self.fail(e);
        Err(e)
      }
    }
  }

  /// Decodes the next row straight into a full image buffer.
  ///
  /// For interlaced images `replicate` picks the progressive display style:
  /// `true` fills the not yet decoded pixels around each pixel with its value
  /// ("rectangle"), `false` only writes the decoded pixels ("sparkle").
  ///
  /// Returns `false` once every row has been read.
  pub fn read_row_into(&mut self, image: &mut [u8], replicate: bool) -> PngResult<bool> {
    let ihdr = self.chunks.ihdr;
    let stride = ihdr.bytes_per_row(ihdr.width);
    let expected = self.image_bytes();
    if image.len() < expected {
      self.check_live()?;
      let e = PngError::RowLengthMismatch { expected, given: image.len() };
      self.fail(e);
      return Err(e);
    }
    let result = match self.read_row()? {
      None => return Ok(false),
      Some(row) if ihdr.is_interlaced => expand_into_image(
        row.data,
        row.pass,
        row.pass_row,
        ihdr.width,
        ihdr.height,
        ihdr.bits_per_pixel(),
        image,
        replicate,
      ),
      Some(row) => {
        image[row.image_y as usize * stride..][..stride].copy_from_slice(row.data);
        Ok(())
      }
    };
    match result {
      Ok(()) => Ok(true),
      Err(e) => {
        self.fail(e);
        Err(e)
      }
    }
  }

  /// Decodes every remaining row into `image`, which holds
  /// [`image_bytes`](Self::image_bytes) bytes.
  pub fn read_image(&mut self, image: &mut [u8]) -> PngResult<()> {
    while self.read_row_into(image, false)? {}
    Ok(())
  }

  /// Reads the rest of the stream through `IEND`.
  ///
  /// Rows that weren't read yet are decoded and dropped.
  pub fn finish(&mut self) -> PngResult<()> {
    self.check_live()?;
    match self.finish_inner() {
      Ok(()) => Ok(()),
      Err(e) => {
        self.fail(e);
        Err(e)
      }
    }
  }

  fn finish_inner(&mut self) -> PngResult<()> {
    while self.advance_row()?.is_some() {}
    let chunks = &mut self.chunks;
    let end = self.inflater.finish(|b| chunks.feed_idat(b))?;
    if end.extra_output {
      self.chunks.channel.benign(PngError::ExtraCompressedData)?;
    } else if !end.stream_ended {
      // the IDAT run ran out before the zlib trailer did.
      return Err(PngError::NotEnoughImageData);
    }
    let leftover = end.unused_input + self.chunks.skip_idat()?;
    if leftover > 0 {
      log::debug!("{leftover} unused bytes of image data");
      self.chunks.channel.benign(PngError::ExtraImageData)?;
    }
    self.chunks.read_to_end()
  }
}
