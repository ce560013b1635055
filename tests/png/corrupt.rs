use pngstream::*;

use crate::{decode, encode, rand_bytes, rebuild};

fn sample_png() -> (IHDR, Vec<u8>, Vec<u8>) {
  let ihdr =
    IHDR { width: 16, height: 16, bit_depth: 8, color_type: PngColorType::RGB, is_interlaced: false };
  let image = rand_bytes(ihdr.bytes_per_row(16) * 16);
  let bytes = encode(ihdr, &[], &image, EncodeConfig::default());
  (ihdr, image, bytes)
}

#[test]
fn test_truncated_idat_is_fatal() {
  let (_, _, bytes) = sample_png();
  let cut = rebuild(&bytes, |ty, data| {
    Some(if ty == ChunkType::IDAT { data[..data.len() / 2].to_vec() } else { data.to_vec() })
  });
  let mut d = Decoder::new(&cut[..], DecodeConfig::default()).unwrap();
  let mut image = vec![0; d.image_bytes()];
  assert_eq!(d.read_image(&mut image), Err(PngError::NotEnoughImageData));
  assert_eq!(d.state(), ReadState::Failed);
  assert_eq!(d.error(), Some(PngError::NotEnoughImageData));
  assert_eq!(d.worst_severity(), Some(Severity::Error));
  assert_eq!(d.finish(), Err(PngError::SessionFailed));
  // losing any part of the zlib trailer is just as fatal.
  for n in 1..=4 {
    let cut = rebuild(&bytes, |ty, data| {
      Some(if ty == ChunkType::IDAT { data[..data.len() - n].to_vec() } else { data.to_vec() })
    });
    assert_eq!(
      decode(&cut, DecodeConfig::default()).unwrap_err(),
      PngError::NotEnoughImageData,
      "cut {n}"
    );
  }
}

#[test]
fn test_ihdr_crc_mismatch() {
  let (_, image, mut bytes) = sample_png();
  // signature, then length and type, then 13 bytes of IHDR data
  bytes[8 + 8 + 13] ^= 0xFF;
  assert_eq!(
    Decoder::new(&bytes[..], DecodeConfig::default()).unwrap_err(),
    PngError::CrcMismatch(ChunkType::IHDR)
  );
  let lenient = DecodeConfig {
    crc: CrcPolicy { critical: CrcAction::WarnUse, ancillary: CrcAction::WarnUse },
    ..Default::default()
  };
  let (decoded, d) = decode(&bytes, lenient).unwrap();
  assert_eq!(decoded, image);
  assert_eq!(d.diagnostics().len(), 1);
  assert_eq!(d.diagnostics()[0].severity, Severity::Warning);
  let skip = DecodeConfig {
    crc: CrcPolicy { critical: CrcAction::Skip, ancillary: CrcAction::Skip },
    ..Default::default()
  };
  let (_, d) = decode(&bytes, skip).unwrap();
  assert!(d.diagnostics().is_empty());
}

#[test]
fn test_idat_crc_mismatch() {
  let (_, _, bytes) = sample_png();
  let mut damaged = Vec::new();
  write_signature(&mut damaged).unwrap();
  for raw in RawChunkIter::new(&bytes) {
    damaged.extend_from_slice(&(raw.data.len() as u32).to_be_bytes());
    damaged.extend_from_slice(raw.ty.as_bytes());
    damaged.extend_from_slice(raw.data);
    let crc = if raw.ty == ChunkType::IDAT { !raw.declared_crc } else { raw.declared_crc };
    damaged.extend_from_slice(&crc.to_be_bytes());
  }
  let mut d = Decoder::new(&damaged[..], DecodeConfig::default()).unwrap();
  let mut image = vec![0; d.image_bytes()];
  assert_eq!(d.read_image(&mut image), Err(PngError::CrcMismatch(ChunkType::IDAT)));
}

#[test]
fn test_trailing_idat_bytes() {
  let (_, image, bytes) = sample_png();
  let padded = rebuild(&bytes, |ty, data| {
    let mut data = data.to_vec();
    if ty == ChunkType::IDAT {
      data.extend_from_slice(&[0; 10]);
    }
    Some(data)
  });
  let (decoded, d) = decode(&padded, DecodeConfig::default()).unwrap();
  assert_eq!(decoded, image);
  assert_eq!(d.diagnostics()[0].error, PngError::ExtraImageData);
  assert_eq!(d.worst_severity(), Some(Severity::Warning));
  assert_eq!(decode(&padded, DecodeConfig::strict()).unwrap_err(), PngError::ExtraImageData);
  let quiet = DecodeConfig { benign: BenignPolicy::Ignore, ..Default::default() };
  let (_, d) = decode(&padded, quiet).unwrap();
  assert!(d.diagnostics().is_empty());
}

#[test]
fn test_missing_trailer() {
  let (_, _, bytes) = sample_png();
  // drop the adler32 checksum
  let cut = rebuild(&bytes, |ty, data| {
    Some(if ty == ChunkType::IDAT { data[..data.len() - 4].to_vec() } else { data.to_vec() })
  });
  let mut d = Decoder::new(&cut[..], DecodeConfig::default()).unwrap();
  let mut image = vec![0; d.image_bytes()];
  d.read_image(&mut image).unwrap();
  assert_eq!(d.finish(), Err(PngError::NotEnoughImageData));
  assert_eq!(d.state(), ReadState::Failed);
  assert_eq!(d.worst_severity(), Some(Severity::Error));
  // strictness doesn't matter here
  let quiet = DecodeConfig { benign: BenignPolicy::Ignore, ..Default::default() };
  assert_eq!(decode(&cut, quiet).unwrap_err(), PngError::NotEnoughImageData);
}

#[test]
fn test_chunk_after_iend() {
  let (_, _, bytes) = sample_png();
  let mut extra = bytes.clone();
  write_chunk(&mut extra, ChunkType::tEXt, b"late\0text").unwrap();
  assert_eq!(decode(&extra, DecodeConfig::default()).unwrap_err(), PngError::DataAfterIEND);
}

#[test]
fn test_missing_iend() {
  let (_, _, bytes) = sample_png();
  let cut = rebuild(&bytes, |ty, data| (ty != ChunkType::IEND).then(|| data.to_vec()));
  let err = decode(&cut, DecodeConfig::default()).unwrap_err();
  assert!(err.is_premature_end());
}

#[test]
fn test_reporter_can_promote() {
  struct Promote;
  impl Reporter for Promote {
    fn report(&mut self, _: Severity, _: &PngError) -> Severity {
      Severity::Error
    }
  }
  let (_, _, bytes) = sample_png();
  let late = rebuild(&bytes, |ty, data| {
    Some(if ty == ChunkType::IEND { b"x".to_vec() } else { data.to_vec() })
  });
  let mut d =
    Decoder::with_reporter(&late[..], DecodeConfig::default(), Box::new(Promote)).unwrap();
  let mut image = vec![0; d.image_bytes()];
  d.read_image(&mut image).unwrap();
  assert_eq!(d.finish(), Err(PngError::NonEmptyIEND));
}

#[test]
fn test_damaged_files_never_panic() {
  let (_, _, bytes) = sample_png();
  // damage to the header must not turn into a huge allocation.
  let limits = Limits { width_max: 64, height_max: 64, ..Default::default() };
  for _ in 0..200 {
    let mut v = bytes.clone();
    let noise = rand_bytes(8);
    for pair in noise.chunks_exact(2) {
      let at = (usize::from(pair[0]) * 7 + usize::from(pair[1])) % v.len();
      v[at] ^= pair[1] | 1;
    }
    let _ = decode(&v, DecodeConfig { limits, ..Default::default() });
    let _ = decode(&v, DecodeConfig { limits, ..DecodeConfig::strict() });
    let lenient = DecodeConfig {
      limits,
      crc: CrcPolicy { critical: CrcAction::Skip, ancillary: CrcAction::Skip },
      ..Default::default()
    };
    let _ = decode(&v, lenient);
  }
  for len in [0, 7, 8, 20, 33, 100] {
    let _ = decode(&bytes[..len], DecodeConfig::default());
  }
}
