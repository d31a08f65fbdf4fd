#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

//! Decodes PNG data into RGBA8 pixel buffers.
//!
//! * [Portable Network Graphics (PNG) Specification][png-spec]
//! * [RFC 1950 (zlib)][rfc-1950] and [RFC 1951 (deflate)][rfc-1951]
//!
//! [png-spec]: https://www.w3.org/TR/png/
//! [rfc-1950]: https://www.rfc-editor.org/rfc/rfc1950
//! [rfc-1951]: https://www.rfc-editor.org/rfc/rfc1951
//!
//! The whole pipeline is in this crate, inflate included: a chunk framer
//! walks the container and fuses consecutive `IDAT` chunks into one logical
//! byte stream, a bit reader and canonical Huffman tables inflate that
//! stream, and the filtered scanlines that come out are reconstructed and
//! unpacked into pixels.
//!
//! ## Library Design Assumptions
//!
//! * The entire PNG data stream is a single byte slice in memory.
//! * Each decoding stage is materialised in full before the next runs; this
//!   is not a streaming decoder that hands out rows early.
//!
//! ## Usage
//!
//! Call [`decode_png_to_bitmap`] with the file bytes and get back a
//! [`Bitmap`] of [`RGBA8888`] pixels, top row first. If you want to step
//! through the container yourself, [`PngChunkSource`] and
//! [`decompress_idat`] expose the framing and inflate layers the decoder is
//! built from.
//!
//! What the decoder does *not* do: Adam7 interlace (such files are rejected
//! cleanly), ancillary chunk interpretation (they're skipped), Adler-32
//! verification of the zlib payload, and any form of encoding.

mod bit_source;
mod chunk_source;
mod code_length_alphabet;
mod crc32;
mod decode;
mod dist_alphabet;
mod error;
mod filtering;
mod image;
mod inflate;
mod lit_len_alphabet;
mod pixel_unpack;
mod pixels;
mod png_header;
mod sample_source;
mod tree_entry;

pub use chunk_source::{ChunkTy, PngChunkSource};
pub use crc32::png_crc32;
pub use decode::decode_png_to_bitmap;
pub use error::{PngError, PngResult};
pub use image::{xy_width_to_index, Bitmap};
pub use inflate::decompress_idat;
pub use pixels::RGBA8888;
pub use png_header::{
  PngColorType, PngCompressionMethod, PngFilterMethod, PngHeader, PngInterlaceMethod,
};
