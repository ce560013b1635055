use pngstream::filter::*;

use crate::rand_bytes;

#[test]
fn test_random_rows_round_trip() {
  for bpp in 1..=8 {
    for pixels in [1, 2, 7, 64] {
      let len = bpp * pixels;
      let prev = rand_bytes(len);
      let row = rand_bytes(len);
      for ft in FilterType::ALL {
        for kernel in [&ScalarKernel as &dyn RowFilterKernel, &PixelKernel] {
          let mut filtered = vec![0; len];
          filter_with(kernel, ft, &row, &prev, bpp, &mut filtered).unwrap();
          unfilter_with(kernel, ft, &mut filtered, &prev, bpp).unwrap();
          assert_eq!(filtered, row, "bpp:{bpp} ft:{ft:?} kernel:{kernel:?}");
        }
      }
    }
  }
}

#[test]
fn test_kernels_agree_on_random_rows() {
  for bpp in [1, 2, 3, 4, 6, 8] {
    let len = bpp * 37;
    let prev = rand_bytes(len);
    let row = rand_bytes(len);
    for ft in FilterType::ALL {
      let mut a = row.clone();
      let mut b = row.clone();
      unfilter_with(&ScalarKernel, ft, &mut a, &prev, bpp).unwrap();
      unfilter_with(&PixelKernel, ft, &mut b, &prev, bpp).unwrap();
      assert_eq!(a, b, "bpp:{bpp} ft:{ft:?}");
    }
  }
}

#[test]
fn test_first_row_uses_zero_prev() {
  // Up on the first row of a pass is the same as None.
  let row = rand_bytes(12);
  let zeros = [0; 12];
  let mut up = row.clone();
  unfilter(FilterType::Up, &mut up, &zeros, 3).unwrap();
  assert_eq!(up, row);
  // and Paeth is the same as Sub.
  let mut paeth = row.clone();
  let mut sub = row.clone();
  unfilter(FilterType::Paeth, &mut paeth, &zeros, 3).unwrap();
  unfilter(FilterType::Sub, &mut sub, &zeros, 3).unwrap();
  assert_eq!(paeth, sub);
}

#[test]
fn test_paeth_predict_against_reference() {
  fn reference(a: u8, b: u8, c: u8) -> u8 {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let pa = (p - i32::from(a)).abs();
    let pb = (p - i32::from(b)).abs();
    let pc = (p - i32::from(c)).abs();
    if pa <= pb && pa <= pc {
      a
    } else if pb <= pc {
      b
    } else {
      c
    }
  }
  let noise = rand_bytes(3 * 4096);
  for abc in noise.chunks_exact(3) {
    assert_eq!(paeth_predict(abc[0], abc[1], abc[2]), reference(abc[0], abc[1], abc[2]));
  }
}
