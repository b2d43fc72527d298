//! Canonical, length-limited Huffman coding.
//!
//! One table type serves every symbol stream of a block: literal bytes as well as the
//! literal-length, offset and match-length codes of the sequence section.
//! A table is fully described by its code lengths, so that is all we put on the wire.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

use crate::bits::{self, BitReader, BitWriter};
use crate::raw::DecodeError;

/// Longest code we ever assign. Keeps the decoding table at 2 KiB entries.
pub const MAX_CODE_LENGTH: u8 = 11;
/// Tables describe at most this many symbols (one byte on the wire holds `count - 1`).
pub const MAX_SYMBOLS: usize = 256;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("symbol {0} has no code in this table")]
    SymbolNotInTable(u16),
}

/// Encoding side of a Huffman code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffmanTable {
    lengths: Vec<u8>,
    /// Canonical codes, already bit-reversed for LSB-first emission.
    codes: Vec<u16>,
}

impl HuffmanTable {
    /// Builds an optimal-ish code for the given symbol frequencies.
    ///
    /// More frequent symbols never get longer codes than less frequent ones.
    /// Ties are broken by symbol value so the result is deterministic.
    pub fn from_frequencies(frequencies: &[u32]) -> Self {
        assert!(frequencies.len() <= MAX_SYMBOLS, "alphabet too large");
        let lengths = limit_lengths(huffman_lengths(frequencies), frequencies);
        // lengths produced here always satisfy Kraft, so this can't fail
        Self::from_lengths_unchecked(lengths)
    }

    /// Rebuilds a table from code lengths (0 meaning "symbol absent").
    pub fn from_code_lengths(lengths: &[u8]) -> Result<Self, DecodeError> {
        if lengths.len() > MAX_SYMBOLS || lengths.iter().any(|&l| l > MAX_CODE_LENGTH) {
            return Err(DecodeError::InvalidTable);
        }
        if lengths.iter().all(|&l| l == 0) {
            return Err(DecodeError::InvalidTable);
        }
        // an oversubscribed code can't be prefix-free
        let kraft: u32 = lengths.iter().filter(|&&l| l > 0).map(|&l| 1u32 << (MAX_CODE_LENGTH - l)).sum();
        if kraft > 1 << MAX_CODE_LENGTH {
            return Err(DecodeError::InvalidTable);
        }
        Ok(Self::from_lengths_unchecked(lengths.to_vec()))
    }

    fn from_lengths_unchecked(lengths: Vec<u8>) -> Self {
        let mut order: Vec<usize> = (0..lengths.len()).filter(|&s| lengths[s] > 0).collect();
        order.sort_by_key(|&s| (lengths[s], s));

        let mut codes = vec![0u16; lengths.len()];
        let mut code = 0u32;
        let mut prev_len = 0;
        for s in order {
            let len = lengths[s];
            code <<= len - prev_len;
            codes[s] = reverse_bits(code, len);
            code += 1;
            prev_len = len;
        }

        HuffmanTable { lengths, codes }
    }

    pub fn code_lengths(&self) -> &[u8] {
        &self.lengths
    }

    pub fn max_length(&self) -> u8 {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    /// Number of bits `symbols` would occupy, or `None` if one of them has no code.
    pub fn encoded_bits(&self, frequencies: &[u32]) -> Option<usize> {
        let mut total = 0usize;
        for (s, &f) in frequencies.iter().enumerate() {
            if f == 0 {
                continue;
            }
            match self.lengths.get(s) {
                Some(&l) if l > 0 => total += l as usize * f as usize,
                _ => return None,
            }
        }
        Some(total)
    }

    #[inline]
    pub fn encode(&self, symbol: u16, writer: &mut BitWriter) -> Result<(), EncodeError> {
        match self.lengths.get(symbol as usize) {
            Some(&len) if len > 0 => {
                writer.write_bits(u32::from(self.codes[symbol as usize]), u32::from(len));
                Ok(())
            }
            _ => Err(EncodeError::SymbolNotInTable(symbol)),
        }
    }

    pub fn encode_all(&self, symbols: &[u16]) -> Result<Vec<u8>, EncodeError> {
        let mut writer = BitWriter::new();
        for &s in symbols {
            self.encode(s, &mut writer)?;
        }
        Ok(writer.finish())
    }

    /// `count - 1` followed by one nibble per symbol, low nibble first.
    pub fn write_description(&self, out: &mut Vec<u8>) {
        let count = self.lengths.iter().rposition(|&l| l > 0).map_or(1, |p| p + 1);
        out.push((count - 1) as u8);
        for pair in self.lengths[..count].chunks(2) {
            let hi = pair.get(1).copied().unwrap_or(0);
            out.push(pair[0] | (hi << 4));
        }
    }

    pub fn description_len(&self) -> usize {
        let count = self.lengths.iter().rposition(|&l| l > 0).map_or(1, |p| p + 1);
        1 + (count + 1) / 2
    }

    pub fn read_description(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let count = bits::read_u8(input)? as usize + 1;
        let packed = bits::take(input, (count + 1) / 2)?;
        let mut lengths = Vec::with_capacity(count);
        for &b in packed {
            lengths.push(b & 0xF);
            lengths.push(b >> 4);
        }
        if count % 2 == 1 && lengths.pop() != Some(0) {
            return Err(DecodeError::InvalidTable);
        }
        Self::from_code_lengths(&lengths)
    }

    pub fn decoder(&self) -> HuffmanDecoder {
        HuffmanDecoder::new(self)
    }
}

/// Single-lookup decoding table: index with the next `max_length` bits.
#[derive(Clone, Debug)]
pub struct HuffmanDecoder {
    /// (symbol, code length); a length of 0 marks bit patterns no symbol owns.
    entries: Vec<(u16, u8)>,
    max_length: u8,
}

impl HuffmanDecoder {
    fn new(table: &HuffmanTable) -> Self {
        let max_length = table.max_length();
        let mut entries = vec![(0u16, 0u8); 1 << max_length];
        for (symbol, &len) in table.lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let step = 1usize << len;
            let mut i = table.codes[symbol] as usize;
            while i < entries.len() {
                entries[i] = (symbol as u16, len);
                i += step;
            }
        }
        HuffmanDecoder { entries, max_length }
    }

    #[inline]
    pub fn decode(&self, reader: &mut BitReader) -> Result<u16, DecodeError> {
        let (symbol, len) = self.entries[reader.peek(u32::from(self.max_length)) as usize];
        if len == 0 {
            return Err(DecodeError::UnknownSymbol);
        }
        reader.consume(u32::from(len))?;
        Ok(symbol)
    }

    pub fn decode_all(&self, data: &[u8], count: usize) -> Result<Vec<u16>, DecodeError> {
        let mut reader = BitReader::new(data);
        let mut symbols = Vec::with_capacity(count.min(data.len() * 8));
        for _ in 0..count {
            symbols.push(self.decode(&mut reader)?);
        }
        reader.finish()?;
        Ok(symbols)
    }
}

fn reverse_bits(code: u32, len: u8) -> u16 {
    (code.reverse_bits() >> (32 - u32::from(len))) as u16
}

/// Plain Huffman construction; lengths may exceed `MAX_CODE_LENGTH`.
fn huffman_lengths(frequencies: &[u32]) -> Vec<u8> {
    let n = frequencies.len();
    let mut lengths = vec![0u8; n];
    let present: Vec<usize> = (0..n).filter(|&s| frequencies[s] > 0).collect();
    match present.len() {
        0 => return lengths,
        1 => {
            lengths[present[0]] = 1;
            return lengths;
        }
        _ => {}
    }

    // node ids: leaves are their symbol, internal nodes count up from n
    let mut parent = vec![usize::MAX; 2 * n];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
        present.iter().map(|&s| Reverse((u64::from(frequencies[s]), s))).collect();
    let mut next = n;
    while heap.len() > 1 {
        let (Reverse((fa, a)), Reverse((fb, b))) = match (heap.pop(), heap.pop()) {
            (Some(a), Some(b)) => (a, b),
            _ => unreachable!("heap has at least two nodes"),
        };
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((fa + fb, next)));
        next += 1;
    }

    for &s in &present {
        let mut depth = 0u32;
        let mut node = s;
        while parent[node] != usize::MAX {
            node = parent[node];
            depth += 1;
        }
        lengths[s] = depth.min(u32::from(u8::MAX)) as u8;
    }
    lengths
}

/// Clamps lengths to `MAX_CODE_LENGTH` and lengthens the cheapest codes until Kraft holds again.
fn limit_lengths(mut lengths: Vec<u8>, frequencies: &[u32]) -> Vec<u8> {
    if lengths.iter().all(|&l| l <= MAX_CODE_LENGTH) {
        return lengths;
    }

    let budget = 1u32 << MAX_CODE_LENGTH;
    for l in lengths.iter_mut() {
        *l = (*l).min(MAX_CODE_LENGTH);
    }
    let mut kraft: u32 = lengths.iter().filter(|&&l| l > 0).map(|&l| 1 << (MAX_CODE_LENGTH - l)).sum();

    while kraft > budget {
        // lengthen the longest code that can still grow, preferring the rarest symbol
        let victim = (0..lengths.len())
            .filter(|&s| lengths[s] > 0 && lengths[s] < MAX_CODE_LENGTH)
            .max_by_key(|&s| (lengths[s], Reverse(frequencies[s]), s));
        match victim {
            Some(s) => {
                kraft -= 1 << (MAX_CODE_LENGTH - lengths[s] - 1);
                lengths[s] += 1;
            }
            None => break,
        }
    }
    lengths
}
