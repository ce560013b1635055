//! Errors, their classes, and the per-session channel that routes them.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use crate::ChunkType;

/// Shorthand for results from this crate.
pub type PngResult<T> = Result<T, PngError>;

/// Any problem that a decode or encode session can run into.
///
/// Use [`class`](PngError::class) to learn if the problem comes from bad input
/// data that could be tolerated, bad input data that can't, or from a caller
/// using the API wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PngError {
  /// The byte source or sink reported a failure.
  Io,
  /// The byte source ran out in the middle of a structure.
  UnexpectedEof,
  /// The first 8 bytes aren't the PNG signature.
  BadSignature,
  /// Something other than `IHDR` came right after the signature.
  FirstChunkNotIHDR,
  /// A chunk that may appear only once appeared again.
  DuplicateChunk(ChunkType),
  /// The `IHDR` payload isn't exactly 13 bytes.
  BadHeaderLength,
  /// The width or height is 0.
  ImageDimensionsZero,
  /// The width or height is larger than the configured limit.
  ImageTooLarge,
  /// Bit depth and color type don't form a legal combination.
  IllegalColorTypeBitDepth,
  /// Only compression method 0 exists.
  IllegalCompressionMethod,
  /// Only filter method 0 exists.
  IllegalFilterMethod,
  /// Interlace method must be 0 or 1.
  IllegalInterlaceMethod,
  /// A type tag byte isn't an ASCII letter.
  InvalidChunkType,
  /// The declared chunk length exceeds 2^31-1 or the configured maximum.
  ChunkTooLarge(ChunkType),
  /// The stored CRC didn't match the computed CRC.
  CrcMismatch(ChunkType),
  /// A palette image reached its image data without a `PLTE`.
  MissingPalette,
  /// A grayscale image carries a `PLTE`.
  PaletteNotAllowed,
  /// The palette size is wrong for the image.
  BadPalette,
  /// A chunk appeared somewhere the format doesn't allow it.
  ChunkOutOfPlace(ChunkType),
  /// A known ancillary chunk had a malformed payload.
  BadAncillaryChunk(ChunkType),
  /// An ancillary chunk was dropped because too many were already stored.
  TooManyAncillaryChunks,
  /// `IEND` showed up before any `IDAT`.
  MissingImageData,
  /// A critical chunk type that this library doesn't know.
  UnknownCriticalChunk(ChunkType),
  /// `IDAT` chunks were separated by some other chunk.
  DiscontiguousIDAT,
  /// The `IEND` chunk had a non-empty payload.
  NonEmptyIEND,
  /// Bytes followed the `IEND` chunk.
  DataAfterIEND,
  /// A row started with a filter type byte above 4.
  IllegalFilterType(u8),
  /// The zlib stream is damaged.
  ZlibCorrupt,
  /// The image data ran out before every row was filled.
  NotEnoughImageData,
  /// The zlib stream still produced output after the last row.
  ExtraCompressedData,
  /// More `IDAT` bytes followed the end of the zlib stream.
  ExtraImageData,
  /// The deflate engine refused to make progress.
  DeflateFailed,
  /// A row buffer had the wrong length for the image.
  RowLengthMismatch {
    /// bytes the row should have
    expected: usize,
    /// bytes that were given
    given: usize,
  },
  /// An operation was called when the session can't do it.
  OutOfOrderCall,
  /// More rows were written than the image has.
  TooManyRows,
  /// The encode session finished before every row was written.
  TooFewRows,
  /// The caller tried to write a critical chunk as if it were metadata.
  NotAncillary(ChunkType),
  /// A previous fatal error already ended this session.
  SessionFailed,
}

/// How a [`PngError`] is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorClass {
  /// Recoverable problems in the input, warnings by default.
  Benign,
  /// Structural problems in the input that end the session.
  Fatal,
  /// Caller bugs. Always end the session.
  Contract,
}

impl PngError {
  /// The class of this error.
  #[must_use]
  pub const fn class(self) -> ErrorClass {
    use PngError::*;
    match self {
      BadAncillaryChunk(_) | TooManyAncillaryChunks | DiscontiguousIDAT | NonEmptyIEND
      | ExtraCompressedData | ExtraImageData => {
        ErrorClass::Benign
      }
      // only ancillary chunks can be dropped and still show the image.
      CrcMismatch(ty) | ChunkTooLarge(ty) | DuplicateChunk(ty) | ChunkOutOfPlace(ty)
        if !ty.is_critical() =>
      {
        ErrorClass::Benign
      }
      RowLengthMismatch { .. } | OutOfOrderCall | TooManyRows | TooFewRows | NotAncillary(_)
      | SessionFailed => ErrorClass::Contract,
      _ => ErrorClass::Fatal,
    }
  }

  /// If this is a "the data stopped early" kind of error.
  #[must_use]
  pub const fn is_premature_end(self) -> bool {
    matches!(self, PngError::UnexpectedEof | PngError::NotEnoughImageData)
  }
}

impl fmt::Display for PngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use PngError::*;
    match self {
      Io => write!(f, "i/o failure"),
      UnexpectedEof => write!(f, "unexpected end of input"),
      BadSignature => write!(f, "not a PNG file (bad signature)"),
      FirstChunkNotIHDR => write!(f, "missing IHDR before other chunks"),
      DuplicateChunk(ty) => write!(f, "{ty:?}: duplicate"),
      BadHeaderLength => write!(f, "IHDR: invalid length"),
      ImageDimensionsZero => write!(f, "IHDR: zero width or height"),
      ImageTooLarge => write!(f, "IHDR: image size exceeds the user limits"),
      IllegalColorTypeBitDepth => write!(f, "IHDR: invalid color type and bit depth combination"),
      IllegalCompressionMethod => write!(f, "IHDR: unknown compression method"),
      IllegalFilterMethod => write!(f, "IHDR: unknown filter method"),
      IllegalInterlaceMethod => write!(f, "IHDR: unknown interlace method"),
      InvalidChunkType => write!(f, "invalid chunk type"),
      ChunkTooLarge(ty) => write!(f, "{ty:?}: chunk data is too large"),
      CrcMismatch(ty) => write!(f, "{ty:?}: CRC error"),
      MissingPalette => write!(f, "missing PLTE before IDAT"),
      PaletteNotAllowed => write!(f, "PLTE: invalid in a grayscale image"),
      BadPalette => write!(f, "PLTE: invalid number of entries"),
      ChunkOutOfPlace(ty) => write!(f, "{ty:?}: out of place"),
      BadAncillaryChunk(ty) => write!(f, "{ty:?}: invalid"),
      TooManyAncillaryChunks => write!(f, "no space in chunk cache"),
      MissingImageData => write!(f, "missing IDAT"),
      UnknownCriticalChunk(ty) => write!(f, "{ty:?}: unknown critical chunk"),
      DiscontiguousIDAT => write!(f, "IDAT: chunks are not contiguous"),
      NonEmptyIEND => write!(f, "IEND: invalid length"),
      DataAfterIEND => write!(f, "data after IEND"),
      IllegalFilterType(t) => write!(f, "bad adaptive filter value {t}"),
      ZlibCorrupt => write!(f, "IDAT: decompression error"),
      NotEnoughImageData => write!(f, "not enough image data"),
      ExtraCompressedData => write!(f, "extra compressed data"),
      ExtraImageData => write!(f, "extra compression data in IDAT"),
      DeflateFailed => write!(f, "compression failure"),
      RowLengthMismatch { expected, given } => {
        write!(f, "row has {given} bytes, expected {expected}")
      }
      OutOfOrderCall => write!(f, "call out of order"),
      TooManyRows => write!(f, "too many rows written"),
      TooFewRows => write!(f, "not all rows were written"),
      NotAncillary(ty) => write!(f, "{ty:?}: can't be written as ancillary data"),
      SessionFailed => write!(f, "session already failed"),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for PngError {}

#[cfg(feature = "std")]
impl From<std::io::Error> for PngError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => PngError::UnexpectedEof,
      _ => {
        log::error!("i/o error: {e}");
        PngError::Io
      }
    }
  }
}

/// How loud a reported problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
  /// Processing continues.
  Warning,
  /// Processing stops.
  Error,
}

/// One reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Diagnostic {
  pub severity: Severity,
  pub error: PngError,
}

/// What to do with [benign](ErrorClass::Benign) errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BenignPolicy {
  /// Report as a warning and keep going.
  #[default]
  Warn,
  /// Treat as fatal ("strict mode").
  Error,
  /// Keep going without reporting anything.
  Ignore,
}

/// Receives every problem a session reports.
///
/// The return value of [`report`](Reporter::report) is the severity that
/// actually gets applied, so a reporter can promote a warning into an error.
/// Demoting an error has no effect: fatal problems always end the session.
pub trait Reporter: Send {
  /// Called for each reported problem.
  fn report(&mut self, severity: Severity, error: &PngError) -> Severity;
}

/// The default [`Reporter`]: passes everything to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;
impl Reporter for LogReporter {
  #[inline]
  fn report(&mut self, severity: Severity, error: &PngError) -> Severity {
    match severity {
      Severity::Warning => log::warn!("{error}"),
      Severity::Error => log::error!("{error}"),
    }
    severity
  }
}

/// Session-level error bookkeeping.
pub(crate) struct ErrorChannel {
  policy: BenignPolicy,
  reporter: Box<dyn Reporter>,
  diagnostics: Vec<Diagnostic>,
  fatal: Option<PngError>,
}
impl ErrorChannel {
  pub(crate) fn new(policy: BenignPolicy, reporter: Box<dyn Reporter>) -> Self {
    Self { policy, reporter, diagnostics: Vec::new(), fatal: None }
  }

  /// Routes a benign error. `Ok` means processing may continue.
  pub(crate) fn benign(&mut self, error: PngError) -> PngResult<()> {
    let severity = match self.policy {
      BenignPolicy::Ignore => return Ok(()),
      BenignPolicy::Warn => Severity::Warning,
      BenignPolicy::Error => Severity::Error,
    };
    match self.reporter.report(severity, &error) {
      Severity::Warning => {
        self.diagnostics.push(Diagnostic { severity: Severity::Warning, error });
        Ok(())
      }
      Severity::Error => {
        self.record_fatal(error, false);
        Err(error)
      }
    }
  }

  /// Reports a plain warning that strict mode doesn't promote. The reporter
  /// still can, which ends the session like any fatal error.
  pub(crate) fn warning(&mut self, error: PngError) -> PngResult<()> {
    if self.policy == BenignPolicy::Ignore {
      return Ok(());
    }
    match self.reporter.report(Severity::Warning, &error) {
      Severity::Warning => {
        self.diagnostics.push(Diagnostic { severity: Severity::Warning, error });
        Ok(())
      }
      Severity::Error => {
        self.record_fatal(error, false);
        Err(error)
      }
    }
  }

  /// Records the error that ends the session.
  pub(crate) fn fatal(&mut self, error: PngError) {
    if self.fatal.is_none() {
      self.record_fatal(error, true);
    }
  }

  fn record_fatal(&mut self, error: PngError, report: bool) {
    if report {
      self.reporter.report(Severity::Error, &error);
    }
    self.diagnostics.push(Diagnostic { severity: Severity::Error, error });
    self.fatal = Some(error);
  }

  #[inline]
  pub(crate) fn fatal_error(&self) -> Option<PngError> {
    self.fatal
  }

  #[inline]
  pub(crate) fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
  }

  /// The most severe thing reported so far, if anything was.
  #[inline]
  pub(crate) fn worst(&self) -> Option<Severity> {
    self.diagnostics.iter().map(|d| d.severity).max()
  }
}
