//! Bit- and byte-level cursors used by every encoding stage.
//!
//! Bitstreams are LSB-first: the first bit written ends up in bit 0 of the first byte.
//! This is the same convention deflate uses, which is why Huffman codes are stored
//! bit-reversed (see `entropy`).

use byteorder::{ByteOrder, ReadBytesExt, LE};

use crate::raw::DecodeError;

/// Accumulates bits into a byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    container: u64,
    bit_pos: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `nb_bits` bits of `value`. At most 32 bits per call.
    #[inline]
    pub fn write_bits(&mut self, value: u32, nb_bits: u32) {
        debug_assert!(nb_bits <= 32);
        debug_assert!(nb_bits == 32 || value >> nb_bits == 0, "value has bits above nb_bits");

        self.container |= u64::from(value) << self.bit_pos;
        self.bit_pos += nb_bits;
        // never more than 7 bits left over, so 32 more always fit into the container
        while self.bit_pos >= 8 {
            self.buffer.push(self.container as u8);
            self.container >>= 8;
            self.bit_pos -= 8;
        }
    }

    pub fn bit_len(&self) -> usize {
        self.buffer.len() * 8 + self.bit_pos as usize
    }

    /// Pads the last partial byte with zeroes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_pos > 0 {
            self.buffer.push(self.container as u8);
        }
        self.buffer
    }
}

/// Reads bits back in the order `BitWriter` wrote them.
///
/// Peeking past the end yields zero bits; consuming past the end is an error.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    /// Look at the next `nb_bits` bits (at most 32) without consuming them.
    #[inline]
    pub fn peek(&self, nb_bits: u32) -> u32 {
        debug_assert!(nb_bits <= 32);
        let byte = self.bit_pos / 8;
        let available = self.data.get(byte..).unwrap_or(&[]);
        let take = available.len().min(8);

        let mut buf = [0u8; 8];
        buf[..take].copy_from_slice(&available[..take]);
        let v = LE::read_u64(&buf) >> (self.bit_pos % 8);
        (v & ((1u64 << nb_bits) - 1)) as u32
    }

    #[inline]
    pub fn consume(&mut self, nb_bits: u32) -> Result<(), DecodeError> {
        self.bit_pos += nb_bits as usize;
        if self.bit_pos > self.data.len() * 8 {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(())
    }

    #[inline]
    pub fn read_bits(&mut self, nb_bits: u32) -> Result<u32, DecodeError> {
        let v = self.peek(nb_bits);
        self.consume(nb_bits)?;
        Ok(v)
    }

    /// Checks that nothing but the final byte's zero padding is left.
    pub fn finish(&self) -> Result<(), DecodeError> {
        let used_bytes = (self.bit_pos + 7) / 8;
        if used_bytes != self.data.len() {
            return Err(DecodeError::TrailingData);
        }
        let padding = (used_bytes * 8 - self.bit_pos) as u32;
        if padding > 0 && self.peek(padding) != 0 {
            return Err(DecodeError::TrailingData);
        }
        Ok(())
    }
}

/// LEB128: seven bits per byte, high bit set on every byte but the last.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn read_varint(input: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = read_u8(input)?;
        let bits = u64::from(byte & 0x7F);
        if shift == 63 && bits > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= bits << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(DecodeError::VarintOverflow)
}

pub fn read_u8(input: &mut &[u8]) -> Result<u8, DecodeError> {
    input.read_u8().map_err(|_| DecodeError::UnexpectedEnd)
}

/// Splits `n` bytes off the front of `input`.
pub fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEnd);
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}
