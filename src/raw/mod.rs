//! The compressed block payload format.
//!
//! A compressed block is a literals section followed by a sequences section. Each sequence says
//! "copy `literal_length` bytes from the literals, then copy `match_length` bytes from `offset`
//! bytes back in the output". Whatever literals are left after the last sequence are appended verbatim.
//!
//! Lengths and offsets are split into a small code (entropy coded) plus raw extra bits:
//! values below 16 are their own code, anything else is coded as `12 + floor(log2(v))`
//! followed by the `floor(log2(v))` bits below the leading one.
//!
//! Framing (block headers, raw and RLE blocks, checksums) lives in `crate::framed`.

pub mod matcher;
mod compress;
mod decompress;

pub use compress::*;
pub use decompress::*;

use thiserror::Error;

use crate::bits::{BitReader, BitWriter};

/// Shortest match the format can express. Match lengths are stored relative to this.
pub const MIN_MATCH: usize = 3;

/// Number of distinct length/offset codes (enough for any `u32`).
pub const CODE_ALPHABET: usize = 44;

const DIRECT_CODES: u32 = 16;

/// One LZ77 step: literals first, then a back-reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    pub literal_length: u32,
    pub match_length: u32,
    /// Distance back from the current output position, at least 1.
    pub offset: u32,
}

/// Payload-level corruption. The block was fully present but its contents don't make sense.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
    /// Expected more bytes, but found none.
    /// Either your input was truncated or you're trying to decompress garbage.
    #[error("payload ended unexpectedly")]
    UnexpectedEnd,
    /// The offset for a back-reference points outside the window or before the start of the output.
    /// This may be caused by a missing or incomplete dictionary.
    #[error("back-reference offset out of bounds")]
    InvalidOffset,
    #[error("invalid Huffman table description")]
    InvalidTable,
    #[error("bit pattern does not decode to any symbol")]
    UnknownSymbol,
    #[error("unknown section mode {0}")]
    InvalidMode(u8),
    #[error("length or offset code out of range")]
    InvalidCode,
    #[error("sequences consume more literals than the block carries")]
    LiteralsOverrun,
    #[error("block decodes to more bytes than allowed")]
    OutputOverflow,
    #[error("unused bytes after the end of a section")]
    TrailingData,
    #[error("varint does not fit into 64 bits")]
    VarintOverflow,
}

/// Splits `value` into (code, extra bits, number of extra bits).
#[inline]
pub(crate) fn bucket(value: u32) -> (u16, u32, u32) {
    if value < DIRECT_CODES {
        (value as u16, 0, 0)
    } else {
        let n = 31 - value.leading_zeros();
        ((12 + n) as u16, value - (1 << n), n)
    }
}

#[inline]
pub(crate) fn unbucket(code: u16, reader: &mut BitReader) -> Result<u32, DecodeError> {
    let code = u32::from(code);
    if code < DIRECT_CODES {
        Ok(code)
    } else if code < CODE_ALPHABET as u32 {
        let n = code - 12;
        Ok((1 << n) + reader.read_bits(n)?)
    } else {
        Err(DecodeError::InvalidCode)
    }
}

#[inline]
pub(crate) fn write_bucketed(value: u32, writer: &mut BitWriter) {
    let (_, extra, nb_bits) = bucket(value);
    writer.write_bits(extra, nb_bits);
}
