//! A pure Rust implementation of a streaming, frame-based compression format modelled on zstd frames.
//!
//! A frame is a header, a sequence of blocks and an optional checksum. Blocks are stored raw,
//! as a single repeated byte, or compressed: LZ77 sequences found with hash chains, with literals
//! and sequence codes entropy coded by canonical Huffman codes.
//!
//! For one-shot use see `compress` and `decompress`. For bounded-memory streaming,
//! use `Encoder`/`Decoder` (`feed`, `finish`, `abort`) or the `FrameWriter`/`FrameReader` adapters.

#![forbid(unsafe_code)]

use std::cmp;

pub mod bits;
pub mod entropy;
pub mod raw;
pub mod framed;

pub use framed::{
    CompressionError, CompressionSettings, DecompressionError, Decoder, Encoder, ErrorKind,
    FrameHeader, FrameReader, FrameWriter, decompress_stream, read_frame_header,
};

/// Compresses `input` into a single frame with a `2^window_log` byte window.
pub fn compress(input: &[u8], window_log: u8, content_checksum: bool) -> Result<Vec<u8>, CompressionError> {
    let mut settings = CompressionSettings::default();
    settings.window_log(window_log).content_checksum(content_checksum);
    compress_with(&settings, input)
}

/// Compresses `input` into a single frame.
///
/// This is the same as feeding all of `input` to an `Encoder` at once.
pub fn compress_with(settings: &CompressionSettings, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = settings.encoder()?;
    let mut output = Vec::with_capacity(compress_bound(input.len()));
    encoder.feed(input, &mut output)?;
    encoder.finish(&mut output)?;
    Ok(output)
}

/// Decompresses all frames in `input`. Nothing is returned unless every frame is complete and valid.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecompressionError> {
    let mut decoder = Decoder::new();
    let mut output = Vec::new();
    decoder.feed(input, &mut output)?;
    decoder.finish()?;
    Ok(output)
}

/// Upper bound on the compressed size of `len` bytes, for any settings.
///
/// Blocks are never larger than their content plus a block header, and no window allows blocks
/// smaller than 1 KiB.
pub fn compress_bound(len: usize) -> usize {
    let min_block = 1 << framed::MIN_WINDOW_LOG;
    let blocks = cmp::max(1, (len + min_block - 1) / min_block);
    len + FrameHeader::MAX_SIZE + framed::CHECKSUM_SIZE + blocks * framed::BlockHeader::SIZE
}
