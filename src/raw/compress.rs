use crate::bits::{write_varint, BitWriter};
use crate::entropy::{EncodeError, HuffmanTable};

use super::{bucket, write_bucketed, Sequence, CODE_ALPHABET, MIN_MATCH};

pub(crate) const LITERALS_RAW: u8 = 0;
pub(crate) const LITERALS_RLE: u8 = 1;
pub(crate) const LITERALS_HUFFMAN: u8 = 2;

pub(crate) const CODES_RLE: u8 = 0;
pub(crate) const CODES_HUFFMAN: u8 = 1;

/// Below this many literals a Huffman table never pays for its own description.
const MIN_HUFFMAN_LITERALS: usize = 32;

/// How one of the three sequence code streams is stored.
enum CodeTable {
    /// Every sequence uses the same code, so no bits are spent on it at all.
    Rle(u16),
    Huffman(HuffmanTable),
}

impl CodeTable {
    fn build(frequencies: &[u32]) -> Self {
        let mut present = frequencies.iter().enumerate().filter(|&(_, &f)| f > 0).map(|(s, _)| s);
        match (present.next(), present.next()) {
            (Some(only), None) => CodeTable::Rle(only as u16),
            _ => CodeTable::Huffman(HuffmanTable::from_frequencies(frequencies)),
        }
    }

    fn write_description(&self, out: &mut Vec<u8>) {
        match self {
            CodeTable::Rle(symbol) => {
                out.push(CODES_RLE);
                out.push(*symbol as u8);
            }
            CodeTable::Huffman(table) => {
                out.push(CODES_HUFFMAN);
                table.write_description(out);
            }
        }
    }

    #[inline]
    fn encode(&self, symbol: u16, writer: &mut BitWriter) -> Result<(), EncodeError> {
        match self {
            CodeTable::Rle(only) if *only == symbol => Ok(()),
            CodeTable::Rle(_) => Err(EncodeError::SymbolNotInTable(symbol)),
            CodeTable::Huffman(table) => table.encode(symbol, writer),
        }
    }
}

/// Serializes the output of the match finder into a compressed block payload.
///
/// `literals` must hold every literal byte, including the trailing run after the last sequence.
pub fn encode_payload(literals: &[u8], sequences: &[Sequence], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    write_literals(literals, out)?;
    write_sequences(sequences, out)
}

fn write_literals(literals: &[u8], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if literals.len() > 1 && literals.iter().all(|&b| b == literals[0]) {
        out.push(LITERALS_RLE);
        write_varint(out, literals.len() as u64);
        out.push(literals[0]);
        return Ok(());
    }

    if literals.len() >= MIN_HUFFMAN_LITERALS {
        let mut frequencies = [0u32; 256];
        for &b in literals {
            frequencies[b as usize] += 1;
        }
        let table = HuffmanTable::from_frequencies(&frequencies);
        let stream_bits = table.encoded_bits(&frequencies).unwrap_or(usize::MAX);
        let stream_len = (stream_bits + 7) / 8;
        // description + length prefix (at most 3 bytes for a block) + stream
        if table.description_len() + 3 + stream_len < literals.len() {
            let mut writer = BitWriter::new();
            for &b in literals {
                table.encode(u16::from(b), &mut writer)?;
            }
            let stream = writer.finish();

            out.push(LITERALS_HUFFMAN);
            write_varint(out, literals.len() as u64);
            table.write_description(out);
            write_varint(out, stream.len() as u64);
            out.extend_from_slice(&stream);
            return Ok(());
        }
    }

    out.push(LITERALS_RAW);
    write_varint(out, literals.len() as u64);
    out.extend_from_slice(literals);
    Ok(())
}

fn write_sequences(sequences: &[Sequence], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    write_varint(out, sequences.len() as u64);
    if sequences.is_empty() {
        return Ok(());
    }

    let mut ll_freqs = [0u32; CODE_ALPHABET];
    let mut of_freqs = [0u32; CODE_ALPHABET];
    let mut ml_freqs = [0u32; CODE_ALPHABET];
    for s in sequences {
        debug_assert!(s.match_length as usize >= MIN_MATCH && s.offset > 0);
        ll_freqs[bucket(s.literal_length).0 as usize] += 1;
        of_freqs[bucket(s.offset).0 as usize] += 1;
        ml_freqs[bucket(s.match_length - MIN_MATCH as u32).0 as usize] += 1;
    }

    let ll = CodeTable::build(&ll_freqs);
    let of = CodeTable::build(&of_freqs);
    let ml = CodeTable::build(&ml_freqs);
    ll.write_description(out);
    of.write_description(out);
    ml.write_description(out);

    let mut writer = BitWriter::new();
    for s in sequences {
        let match_length = s.match_length - MIN_MATCH as u32;
        ll.encode(bucket(s.literal_length).0, &mut writer)?;
        write_bucketed(s.literal_length, &mut writer);
        of.encode(bucket(s.offset).0, &mut writer)?;
        write_bucketed(s.offset, &mut writer);
        ml.encode(bucket(match_length).0, &mut writer)?;
        write_bucketed(match_length, &mut writer);
    }
    let stream = writer.finish();
    write_varint(out, stream.len() as u64);
    out.extend_from_slice(&stream);
    Ok(())
}
