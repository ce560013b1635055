use pngstream::*;
use walkdir::WalkDir;

#[test]
fn test_RawChunkIter_no_panics() {
  // iter ALL files in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    for raw in RawChunkIter::new(&v) {
      let _ = PngChunk::try_from(raw);
    }
  }
  // even totally random data should never panic the iterator!
  for _ in 0..10 {
    let v = crate::rand_bytes(1024);
    for _ in RawChunkIter::new(&v) {
      //
    }
  }
}

#[test]
fn test_Decoder_no_panics() {
  let limits = Limits { width_max: 4096, height_max: 4096, ..Default::default() };
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    let Ok(v) = std::fs::read(entry.path()) else { continue };
    match crate::decode(&v, DecodeConfig { limits, ..Default::default() }) {
      Ok((_, d)) => println!("{}: ok, {:?}", entry.path().display(), d.diagnostics()),
      Err(e) => println!("{}: {e}", entry.path().display()),
    }
  }
  // random bytes behind a real signature and header
  let mut header = PNG_SIGNATURE.to_vec();
  let ihdr =
    IHDR { width: 9, height: 9, bit_depth: 8, color_type: PngColorType::RGBA, is_interlaced: true };
  write_chunk(&mut header, ChunkType::IHDR, &ihdr.to_bytes()).unwrap();
  for _ in 0..50 {
    let mut v = header.clone();
    v.extend_from_slice(&crate::rand_bytes(512));
    assert!(crate::decode(&v, DecodeConfig::default()).is_err());
  }
}

#[test]
fn test_chunk_type_bits() {
  let t = ChunkType(*b"prVt");
  assert!(t.is_valid());
  assert!(!t.is_critical());
  assert!(!t.is_public());
  assert!(t.is_reserved_valid());
  assert!(t.is_safe_to_copy());
  assert!(ChunkType::IDAT.is_critical());
  assert!(!ChunkType(*b"ID4T").is_valid());
}
