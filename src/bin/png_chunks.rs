//! Prints every chunk of each PNG file named on the command line, then tries
//! a full decode.

use pngstream::{
  interlace::reduced_image_dimensions, DecodeConfig, Decoder, PngChunk, RawChunkIter,
};

fn main() {
  let args: Vec<String> = std::env::args().collect();
  for file_arg in args[1..].iter() {
    let path = std::path::Path::new(file_arg);
    print!("Reading `{}`... ", path.display());
    let bytes = match std::fs::read(path) {
      Ok(bytes) => {
        println!("got {} bytes.", bytes.len());
        bytes
      }
      Err(e) => {
        println!("{e:?}");
        continue;
      }
    };
    let mut it = RawChunkIter::new(&bytes);
    for (n, raw_chunk) in it.by_ref().enumerate() {
      let crc = if raw_chunk.crc_ok() { "crc ok" } else { "CRC MISMATCH" };
      match PngChunk::try_from(raw_chunk) {
        Ok(chunk) => println!("{n}: {crc}: {chunk:?}"),
        Err(raw) => println!("{n}: {crc}: malformed {raw:?}"),
      }
    }
    if !it.remaining().is_empty() {
      println!("{} trailing bytes", it.remaining().len());
    }
    match decode(&bytes) {
      Ok(warnings) => println!("decoded with {warnings} warning(s)"),
      Err(e) => println!("decode failed: {e}"),
    }
  }
}

fn decode(bytes: &[u8]) -> pngstream::PngResult<usize> {
  let mut decoder = Decoder::new(bytes, DecodeConfig::default())?;
  let ihdr = decoder.ihdr();
  if ihdr.is_interlaced {
    println!("pass sizes: {:?}", reduced_image_dimensions(ihdr.width, ihdr.height));
  }
  if decoder.image_bytes() > 1 << 30 {
    println!("skipping the pixel data of a {:?}", decoder.ihdr());
    return Ok(0);
  }
  let mut image = vec![0; decoder.image_bytes()];
  decoder.read_image(&mut image)?;
  decoder.finish()?;
  Ok(decoder.diagnostics().len())
}
