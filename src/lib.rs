#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![forbid(unsafe_code)]

//! A streaming PNG decoder and encoder core.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! ## Decoding
//!
//! 1) Make a [`Decoder`] over any [`ByteSource`]. This reads every chunk up to
//!    the start of the image data, so the [`IHDR`], palette, and any
//!    ancillary chunks before the image data are available right away.
//! 2) Call [`read_row`](Decoder::read_row) until it gives `None`. Each row is
//!    already unfiltered. For interlaced images the rows come one reduced
//!    image (pass) at a time, use [`read_row_into`](Decoder::read_row_into) or
//!    [`read_image`](Decoder::read_image) to get them placed in a full image.
//! 3) Call [`finish`](Decoder::finish) to read the rest of the file and check
//!    its trailing structure.
//!
//! Problems that don't stop the image from being read are collected as
//! [`diagnostics`](Decoder::diagnostics) (and go to the `log` facade).
//!
//! ## Encoding
//!
//! 1) Make an [`Encoder`] over any [`ByteSink`], with an [`IHDR`].
//! 2) Set a palette and add ancillary chunks if you like.
//! 3) Call [`write_row`](Encoder::write_row) for each row (once per pass for
//!    interlaced images), or [`write_image`](Encoder::write_image).
//! 4) Call [`finish`](Encoder::finish).

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod chunk_type;
pub use chunk_type::*;

pub mod crc32;

mod source;
pub use source::*;

mod ihdr;
pub use ihdr::*;

mod config;
pub use config::*;

pub mod filter;
pub use filter::{FilterType, PixelKernel, RowFilterKernel, ScalarKernel};

pub mod interlace;

pub mod zstream;

mod raw_chunk;
pub use raw_chunk::*;

pub mod chunks;
pub use chunks::PngChunk;

mod metadata;
pub use metadata::*;

mod reader;
pub use reader::*;

mod writer;
pub use writer::*;

/// The 8 bytes that start every PNG.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
