use pngstream::*;

use crate::{clear_padding, decode, encode, rand_bytes};

const ALL_FORMATS: &[(PngColorType, &[u8])] = &[
  (PngColorType::Y, &[1, 2, 4, 8, 16]),
  (PngColorType::RGB, &[8, 16]),
  (PngColorType::Index, &[1, 2, 4, 8]),
  (PngColorType::YA, &[8, 16]),
  (PngColorType::RGBA, &[8, 16]),
];

#[test]
fn test_gray_2x2_round_trip() {
  let ihdr =
    IHDR { width: 2, height: 2, bit_depth: 8, color_type: PngColorType::Y, is_interlaced: false };
  let config = EncodeConfig { filter: FilterChoice::Fixed(FilterType::None), ..Default::default() };
  let bytes = encode(ihdr, &[], &[0, 255, 128, 64], config);
  let idat: Vec<u8> = RawChunkIter::new(&bytes)
    .filter(|c| c.ty == ChunkType::IDAT)
    .flat_map(|c| c.data.iter().copied())
    .collect();
  assert_eq!(
    miniz_oxide::inflate::decompress_to_vec_zlib(&idat).unwrap(),
    vec![0, 0, 255, 0, 128, 64]
  );
  let (image, d) = decode(&bytes, DecodeConfig::default()).unwrap();
  assert_eq!(image, vec![0, 255, 128, 64]);
  assert_eq!(d.ihdr(), ihdr);
  assert!(d.diagnostics().is_empty());
}

#[test]
fn test_all_formats_round_trip() {
  for &(color_type, depths) in ALL_FORMATS {
    for &bit_depth in depths {
      for is_interlaced in [false, true] {
        for (width, height) in [(1, 1), (3, 5), (8, 8), (13, 2), (2, 17)] {
          let ihdr = IHDR { width, height, bit_depth, color_type, is_interlaced };
          let palette: Vec<[u8; 3]> = if color_type == PngColorType::Index {
            (0..1_usize << bit_depth).map(|i| [i as u8, 0, 255 - i as u8]).collect()
          } else {
            Vec::new()
          };
          let mut image = rand_bytes(ihdr.bytes_per_row(width) * height as usize);
          clear_padding(&mut image, ihdr);
          for filter in [FilterChoice::Auto, FilterChoice::Fixed(FilterType::Paeth)] {
            let config = EncodeConfig { filter, ..Default::default() };
            let bytes = encode(ihdr, &palette, &image, config);
            let (decoded, d) = decode(&bytes, DecodeConfig::strict()).unwrap();
            assert_eq!(decoded, image, "{ihdr:?} {filter:?}");
            assert_eq!(d.palette(), &palette[..]);
            assert_eq!(d.state(), ReadState::Done);
          }
        }
      }
    }
  }
}

#[test]
fn test_rows_come_by_pass() {
  let ihdr =
    IHDR { width: 5, height: 5, bit_depth: 8, color_type: PngColorType::Y, is_interlaced: true };
  let image: Vec<u8> = (0..25).collect();
  let bytes = encode(ihdr, &[], &image, EncodeConfig::default());
  let mut d = Decoder::new(&bytes[..], DecodeConfig::default()).unwrap();
  assert_eq!(d.passes(), 7);
  let mut seen = Vec::new();
  while let Some(row) = d.read_row().unwrap() {
    // every pixel of a pass row comes from the row `image_y` of the image.
    let p = interlace::ADAM7[row.pass];
    for (x, &v) in row.data.iter().enumerate() {
      assert_eq!(u32::from(v), row.image_y * 5 + p.full_x(x as u32));
    }
    seen.push((row.pass, row.pass_row, row.width));
  }
  assert_eq!(
    seen,
    vec![
      (0, 0, 1),
      (1, 0, 1),
      (2, 0, 2),
      (3, 0, 1),
      (3, 1, 1),
      (4, 0, 3),
      (5, 0, 2),
      (5, 1, 2),
      (5, 2, 2),
      (6, 0, 5),
      (6, 1, 5),
    ]
  );
  d.finish().unwrap();
}

#[test]
fn test_progressive_replicate() {
  let ihdr =
    IHDR { width: 8, height: 8, bit_depth: 8, color_type: PngColorType::Y, is_interlaced: true };
  let image: Vec<u8> = (100..164).collect();
  let bytes = encode(ihdr, &[], &image, EncodeConfig::default());
  let mut d = Decoder::new(&bytes[..], DecodeConfig::default()).unwrap();
  let mut shown = vec![0; 64];
  assert!(d.read_row_into(&mut shown, true).unwrap());
  assert_eq!(shown, vec![100; 64]);
  while d.read_row_into(&mut shown, true).unwrap() {}
  assert_eq!(shown, image);
  d.finish().unwrap();
}

#[test]
fn test_pixel_kernel_matches_scalar() {
  let ihdr =
    IHDR { width: 33, height: 9, bit_depth: 16, color_type: PngColorType::RGB, is_interlaced: false };
  let image = rand_bytes(ihdr.bytes_per_row(33) * 9);
  let bytes = encode(
    ihdr,
    &[],
    &image,
    EncodeConfig { kernel: &PixelKernel, ..Default::default() },
  );
  let (scalar, _) = decode(&bytes, DecodeConfig::default()).unwrap();
  let (pixel, _) = decode(&bytes, DecodeConfig { kernel: &PixelKernel, ..Default::default() }).unwrap();
  assert_eq!(scalar, image);
  assert_eq!(pixel, image);
}

#[test]
fn test_custom_heuristic() {
  // every filter type gets the same score.
  fn flat(_: &[u8]) -> u64 {
    0
  }
  let ihdr =
    IHDR { width: 4, height: 3, bit_depth: 8, color_type: PngColorType::YA, is_interlaced: false };
  let image = rand_bytes(24);
  let config =
    EncodeConfig { filter: FilterChoice::Adaptive(Heuristic::Custom(flat)), ..Default::default() };
  let bytes = encode(ihdr, &[], &image, config);
  let idat: Vec<u8> = RawChunkIter::new(&bytes)
    .filter(|c| c.ty == ChunkType::IDAT)
    .flat_map(|c| c.data.iter().copied())
    .collect();
  let filtered = miniz_oxide::inflate::decompress_to_vec_zlib(&idat).unwrap();
  // ties go to the earliest type
  assert!(filtered.chunks_exact(9).all(|row| row[0] == FilterType::None as u8));
  assert_eq!(decode(&bytes, DecodeConfig::default()).unwrap().0, image);
}

#[test]
fn test_heuristic_scoring_everything_max() {
  fn worst(_: &[u8]) -> u64 {
    u64::MAX
  }
  let ihdr =
    IHDR { width: 4, height: 3, bit_depth: 8, color_type: PngColorType::Y, is_interlaced: false };
  let image: Vec<u8> = (1..=12).collect();
  let config =
    EncodeConfig { filter: FilterChoice::Adaptive(Heuristic::Custom(worst)), ..Default::default() };
  let bytes = encode(ihdr, &[], &image, config);
  let (decoded, d) = decode(&bytes, DecodeConfig::strict()).unwrap();
  assert_eq!(decoded, image);
  assert!(d.diagnostics().is_empty());
}

#[test]
fn test_safe_unknown_chunk_round_trip() {
  let safe = ChunkType(*b"prVt");
  let not_safe = ChunkType(*b"prVT");
  let ihdr =
    IHDR { width: 3, height: 1, bit_depth: 8, color_type: PngColorType::RGB, is_interlaced: false };
  let mut e = Encoder::new(Vec::new(), ihdr, EncodeConfig::default()).unwrap();
  e.add_chunk(safe, b"keep me", ChunkLocation::BeforeIDAT).unwrap();
  e.add_chunk(not_safe, b"drop me", ChunkLocation::BeforeIDAT).unwrap();
  e.add_chunk(ChunkType::tEXt, b"Software\0pngstream", ChunkLocation::AfterIDAT).unwrap();
  e.add_chunk(ChunkType::gAMA, &[0, 0, 0xB1, 0x8F], ChunkLocation::BeforePLTE).unwrap();
  e.set_palette(&[[1, 2, 3]]).unwrap();
  e.write_image(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
  let first = e.finish().unwrap();

  let config = DecodeConfig { keep_unknown: ChunkKeep::IfSafe, ..Default::default() };
  let (image, d) = decode(&first, config.clone()).unwrap();
  let m = d.metadata();
  assert_eq!(m.get(safe).unwrap().data, b"keep me");
  assert_eq!(m.get(safe).unwrap().location, ChunkLocation::BeforeIDAT);
  assert!(m.get(not_safe).is_none());
  assert_eq!(m.gamma(), Some(45455));

  let mut e = Encoder::new(Vec::new(), ihdr, EncodeConfig::default()).unwrap();
  e.set_palette(d.palette()).unwrap();
  e.copy_metadata(m).unwrap();
  e.write_image(&image).unwrap();
  let second = e.finish().unwrap();
  let (again, d2) = decode(&second, config).unwrap();
  assert_eq!(again, image);
  assert_eq!(d2.metadata(), m);
}

#[test]
fn test_transparency_and_background() {
  let ihdr =
    IHDR { width: 2, height: 1, bit_depth: 2, color_type: PngColorType::Index, is_interlaced: false };
  let mut e = Encoder::new(Vec::new(), ihdr, EncodeConfig::default()).unwrap();
  e.set_palette(&[[0, 0, 0], [10, 20, 30], [40, 50, 60]]).unwrap();
  e.set_transparency(&[0, 128]).unwrap();
  e.add_chunk(ChunkType::bKGD, &[2], ChunkLocation::BeforeIDAT).unwrap();
  e.write_row(&[0b0110_0000]).unwrap();
  let bytes = e.finish().unwrap();
  let (image, d) = decode(&bytes, DecodeConfig::strict()).unwrap();
  assert_eq!(image, vec![0b0110_0000]);
  assert_eq!(d.transparency(), Some(&[0, 128][..]));
  assert_eq!(d.metadata().background(), Some(chunks::Background::Index { i: 2 }));
}

#[test]
fn test_io_adapters() {
  let ihdr =
    IHDR { width: 4, height: 4, bit_depth: 16, color_type: PngColorType::Y, is_interlaced: false };
  let image = rand_bytes(32);
  let mut e = Encoder::new(IoSink(Vec::new()), ihdr, EncodeConfig::default()).unwrap();
  e.write_image(&image).unwrap();
  let bytes = e.finish().unwrap().0;
  let mut d = Decoder::new(IoSource(std::io::Cursor::new(bytes)), DecodeConfig::default()).unwrap();
  let mut out = vec![0; 32];
  d.read_image(&mut out).unwrap();
  d.finish().unwrap();
  assert_eq!(out, image);
}
