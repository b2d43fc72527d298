//! Block headers and the per-block choice between RLE, compressed and raw storage.

use std::io::{self, Write};
use byteorder::{WriteBytesExt, LE};
use fehler::{throw, throws};
use log::trace;

use super::compress::CompressionError;
use super::decompress::DecompressionError;
use crate::raw::{self, matcher::MatchFinder, DecodeError, Sequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Stored as is.
    Raw,
    /// One byte repeated `size` times; the payload is that single byte.
    Rle,
    /// Literals and sequences, see `crate::raw`.
    Compressed,
}

/// The 3-byte header in front of every block.
///
/// ```text
/// Bit 0:     last block
/// Bits 1-2:  block type (3 is reserved)
/// Bits 3-23: block size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub last: bool,
    pub block_type: BlockType,
    /// Payload length, except for RLE blocks where it is the regenerated length.
    pub size: usize,
}

impl BlockHeader {
    pub const SIZE: usize = 3;

    #[throws(io::Error)]
    pub fn write<W: Write>(&self, mut writer: W) {
        debug_assert!(self.size < 1 << 21);
        let block_type = match self.block_type {
            BlockType::Raw => 0,
            BlockType::Rle => 1,
            BlockType::Compressed => 2,
        };
        let raw = (self.size as u32) << 3 | block_type << 1 | self.last as u32;
        writer.write_u24::<LE>(raw)?;
    }

    #[throws(DecompressionError)]
    pub fn parse(bytes: [u8; 3]) -> Self {
        let raw = u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16;
        let block_type = match (raw >> 1) & 0b11 {
            0 => BlockType::Raw,
            1 => BlockType::Rle,
            2 => BlockType::Compressed,
            _ => throw!(DecompressionError::ReservedBlockType),
        };
        BlockHeader {
            last: raw & 1 != 0,
            block_type,
            size: (raw >> 3) as usize,
        }
    }

    /// Number of payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        match self.block_type {
            BlockType::Rle => 1,
            _ => self.size,
        }
    }
}

/// Scratch space for compressing blocks, reused for every block of a stream.
pub(crate) struct BlockEncoder {
    matcher: MatchFinder,
    literals: Vec<u8>,
    sequences: Vec<Sequence>,
    payload: Vec<u8>,
}

impl BlockEncoder {
    pub fn new(matcher: MatchFinder) -> Self {
        BlockEncoder {
            matcher,
            literals: Vec::new(),
            sequences: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Makes all of `window` available for back-references without emitting anything.
    pub fn prime(&mut self, window: &[u8], base: u64) {
        self.matcher.insert_range(window, 0, window.len(), base);
    }

    /// Compresses `window[start..]` into one block (header and payload) appended to `out`.
    ///
    /// The bytes before `start` are the window of earlier data, `base` its absolute position.
    /// The block is never larger than its content plus the header.
    #[throws(CompressionError)]
    pub fn encode(&mut self, window: &[u8], start: usize, base: u64, last: bool, out: &mut Vec<u8>) -> BlockType {
        let block = &window[start..];
        self.literals.clear();
        self.sequences.clear();
        self.payload.clear();

        let block_type = if block.len() > 1 && block.iter().all(|&b| b == block[0]) {
            self.matcher.insert_range(window, start, window.len(), base);
            BlockHeader { last, block_type: BlockType::Rle, size: block.len() }.write(&mut *out)?;
            out.push(block[0]);
            BlockType::Rle
        } else {
            self.matcher.find_sequences(window, start, base, &mut self.literals, &mut self.sequences);
            raw::encode_payload(&self.literals, &self.sequences, &mut self.payload)?;

            if self.payload.len() < block.len() {
                BlockHeader { last, block_type: BlockType::Compressed, size: self.payload.len() }.write(&mut *out)?;
                out.extend_from_slice(&self.payload);
                BlockType::Compressed
            } else {
                BlockHeader { last, block_type: BlockType::Raw, size: block.len() }.write(&mut *out)?;
                out.extend_from_slice(block);
                BlockType::Raw
            }
        };

        trace!("{:?} block: {} -> {} bytes ({} sequences)", block_type, block.len(),
            match block_type {
                BlockType::Rle => 1,
                BlockType::Compressed => self.payload.len(),
                BlockType::Raw => block.len(),
            },
            self.sequences.len());
        block_type
    }
}

/// Regenerates one block, appending it to `history` (which holds the window before it).
#[throws(DecompressionError)]
pub(crate) fn decode_block(header: &BlockHeader, payload: &[u8], history: &mut Vec<u8>, window_size: usize, block_max: usize) {
    match header.block_type {
        BlockType::Raw => history.extend_from_slice(payload),
        BlockType::Rle => {
            let byte = *payload.first().ok_or(DecodeError::UnexpectedEnd)?;
            history.resize(history.len() + header.size, byte);
        }
        BlockType::Compressed => raw::decompress_payload(payload, history, window_size, block_max)?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(block: &[u8]) -> (BlockType, Vec<u8>) {
        let mut encoder = BlockEncoder::new(MatchFinder::new(1 << 16, 8, 4));
        let mut out = Vec::new();
        let block_type = encoder.encode(block, 0, 0, true, &mut out).unwrap();
        (block_type, out)
    }

    fn decode(encoded: &[u8]) -> Vec<u8> {
        let header = BlockHeader::parse([encoded[0], encoded[1], encoded[2]]).unwrap();
        assert!(header.last);
        assert_eq!(header.payload_len(), encoded.len() - 3);
        let mut history = Vec::new();
        decode_block(&header, &encoded[3..], &mut history, 1 << 16, 1 << 17).unwrap();
        history
    }

    #[test]
    fn header_layout() {
        // RLE block, last block, size = 1000
        let mut buf = Vec::new();
        BlockHeader { last: true, block_type: BlockType::Rle, size: 1000 }.write(&mut buf).unwrap();
        assert_eq!(buf, [0x43, 0x1F, 0x00]);

        // compressed block, not last, size = 50000
        let header = BlockHeader::parse([0x84, 0x1A, 0x06]).unwrap();
        assert_eq!(header, BlockHeader { last: false, block_type: BlockType::Compressed, size: 50000 });
    }

    #[test]
    fn reserved_type() {
        assert!(matches!(BlockHeader::parse([0b110, 0, 0]), Err(DecompressionError::ReservedBlockType)));
    }

    #[test]
    fn repeated_byte_is_rle() {
        let (block_type, out) = encode(b"aaaaaaaaaa");
        assert_eq!(block_type, BlockType::Rle);
        assert_eq!(out.len(), 4);
        assert_eq!(decode(&out), b"aaaaaaaaaa");
    }

    #[test]
    fn incompressible_is_raw() {
        let (block_type, out) = encode(&[0x3d, 0xa1, 0x07, 0xfe]);
        assert_eq!(block_type, BlockType::Raw);
        assert_eq!(out.len(), 3 + 4);
        assert_eq!(decode(&out), [0x3d, 0xa1, 0x07, 0xfe]);
    }

    #[test]
    fn text_is_compressed() {
        let text = b"There is nothing either good or bad, but thinking makes it so. \
                     There is nothing either good or bad, but thinking makes it so.";
        let (block_type, out) = encode(text);
        assert_eq!(block_type, BlockType::Compressed);
        assert!(out.len() < text.len());
        assert_eq!(decode(&out), &text[..]);
    }

    #[test]
    fn empty_block() {
        let (block_type, out) = encode(&[]);
        assert_eq!(block_type, BlockType::Raw);
        assert_eq!(out, [0x01, 0x00, 0x00]);
        assert!(decode(&out).is_empty());
    }
}
