use thiserror::Error;

/// Things that can go wrong while decoding a PNG.
///
/// Every failure point in the decoder maps to exactly one variant. Decoding
/// never produces partial output: the first error aborts the whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PngError {
  /// The input ended before the decoder was done with it.
  #[error("unexpected end of input")]
  UnexpectedEndOfInput,

  /// The first 8 bytes aren't the PNG signature.
  #[error("file signature is incorrect")]
  BadSignature,

  /// A chunk header was requested while another chunk was still open.
  #[error("chunk header read while a chunk is open")]
  ChunkAlreadyOpen,

  /// A critical chunk's stored CRC didn't match the computed one.
  #[error("chunk crc mismatch")]
  CrcMismatch,

  /// The first chunk wasn't an `IHDR` of length 13.
  #[error("error reading IHDR")]
  BadIhdr,

  /// The header declared a width or height of zero.
  #[error("zero image dimension")]
  ZeroImageDimension,

  /// The colour type isn't one of 0, 2, 3, 4, 6.
  #[error("invalid colour type")]
  InvalidColourType,

  /// The bit depth isn't allowed, either at all or for this colour type.
  #[error("invalid bit depth")]
  InvalidBitDepth,

  /// The header named a compression method other than deflate.
  #[error("invalid compression method")]
  InvalidCompressionMethod,

  /// The header named a filter method other than adaptive.
  #[error("invalid filter method")]
  InvalidFilterMethod,

  /// The header named an interlace method past Adam7.
  #[error("invalid interlace method")]
  InvalidInterlaceMethod,

  /// The header declared Adam7 interlacing, which this decoder doesn't
  /// unpack.
  #[error("interlaced image data is not supported")]
  InterlaceNotSupported,

  /// `PLTE` length wasn't a multiple of 3, or exceeded `3 * 2^bit_depth`.
  #[error("invalid palette size")]
  InvalidPaletteSize,

  /// A second `PLTE` chunk showed up.
  #[error("two palettes encountered")]
  TwoPaletteChunks,

  /// An indexed-colour image arrived without any `PLTE` chunk.
  #[error("no palette found")]
  MissingPalette,

  /// An indexed sample pointed past the end of the palette.
  #[error("palette index out of range")]
  BadPaletteIndex,

  /// `IEND` showed up before any `IDAT`.
  #[error("image data not present")]
  MissingImageData,

  /// A critical chunk the decoder doesn't know appeared where `IDAT` was
  /// expected.
  #[error("unknown critical chunk")]
  UnknownCriticalChunk,

  /// The `IDAT` stream ran dry while the decompressor still wanted bytes.
  #[error("unexpected end of image data")]
  UnexpectedEndOfImageData,

  /// The stream didn't close with an `IEND` chunk.
  #[error("end chunk not found")]
  MissingEndChunk,

  /// The zlib header asked for a preset dictionary.
  #[error("zlib preset dictionary not supported")]
  PresetDictionaryNotSupported,

  /// A deflate block used the reserved block type 3.
  #[error("reserved deflate block type")]
  ReservedBlockType,

  /// The dynamic block's code length data was self-contradictory.
  #[error("bad dynamic huffman tree data")]
  BadDynamicHuffmanTreeData,

  /// Code-length bits matched no symbol within the code's own depth.
  #[error("could not match a code length symbol")]
  CouldNotFindCodeLengthSymbol,

  /// Literal/length bits matched no symbol within the code's own depth.
  #[error("could not match a literal/length symbol")]
  CouldNotFindLitLenSymbol,

  /// Distance bits matched no symbol within the code's own depth.
  #[error("could not match a distance symbol")]
  CouldNotFindDistSymbol,

  /// Literal/length symbols 286 and 287 never occur in a valid stream.
  #[error("illegal length symbol")]
  BadLengthSymbol,

  /// Distance symbols 30 and 31 never occur in a valid stream.
  #[error("illegal distance symbol")]
  BadDistanceSymbol,

  /// A back-reference pointed before the start of the output.
  #[error("invalid back-reference distance")]
  InvalidDistance,

  /// The decompressed stream came out larger than the image geometry allows.
  #[error("decompressed output exceeds expected size")]
  OutputOverflow,

  /// The decompressed stream wasn't exactly `height` filtered scanlines.
  #[error("filtered data length mismatch")]
  FilteredBytesLengthMismatch,

  /// A scanline's filter type byte wasn't in `0..=4`.
  #[error("invalid filter type")]
  IllegalFilterType,
}

/// Alias for a `Result` with [PngError] as the error type.
pub type PngResult<T> = Result<T, PngError>;
