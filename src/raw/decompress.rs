use crate::bits::{self, BitReader};
use crate::entropy::{HuffmanDecoder, HuffmanTable};

use super::compress::{CODES_HUFFMAN, CODES_RLE, LITERALS_HUFFMAN, LITERALS_RAW, LITERALS_RLE};
use super::{unbucket, DecodeError, CODE_ALPHABET, MIN_MATCH};

type Error = DecodeError;

/// Decoding side of `CodeTable`.
enum CodeDecoder {
    Rle(u16),
    Huffman(HuffmanDecoder),
}

impl CodeDecoder {
    fn read(input: &mut &[u8]) -> Result<Self, Error> {
        match bits::read_u8(input)? {
            CODES_RLE => {
                let symbol = u16::from(bits::read_u8(input)?);
                if symbol as usize >= CODE_ALPHABET {
                    return Err(Error::InvalidCode);
                }
                Ok(CodeDecoder::Rle(symbol))
            }
            CODES_HUFFMAN => {
                let table = HuffmanTable::read_description(input)?;
                if table.code_lengths().len() > CODE_ALPHABET {
                    return Err(Error::InvalidTable);
                }
                Ok(CodeDecoder::Huffman(table.decoder()))
            }
            mode => Err(Error::InvalidMode(mode)),
        }
    }

    #[inline]
    fn decode(&self, reader: &mut BitReader) -> Result<u16, Error> {
        match self {
            CodeDecoder::Rle(symbol) => Ok(*symbol),
            CodeDecoder::Huffman(decoder) => decoder.decode(reader),
        }
    }
}

fn read_length(input: &mut &[u8], limit: usize) -> Result<usize, Error> {
    let v = bits::read_varint(input)?;
    if v > limit as u64 {
        return Err(Error::OutputOverflow);
    }
    Ok(v as usize)
}

fn read_literals(input: &mut &[u8], block_max: usize) -> Result<Vec<u8>, Error> {
    let mode = bits::read_u8(input)?;
    let count = read_length(input, block_max)?;
    match mode {
        LITERALS_RAW => Ok(bits::take(input, count)?.to_vec()),
        LITERALS_RLE => Ok(vec![bits::read_u8(input)?; count]),
        LITERALS_HUFFMAN => {
            let decoder = HuffmanTable::read_description(input)?.decoder();
            let remaining = input.len();
            let stream_len = read_length(input, remaining)?;
            let stream = bits::take(input, stream_len)?;
            // tables never describe more than 256 symbols, so every symbol is a byte
            Ok(decoder.decode_all(stream, count)?.into_iter().map(|s| s as u8).collect())
        }
        other => Err(Error::InvalidMode(other)),
    }
}

/// Decode a compressed block payload, appending the result to `history`.
///
/// `history` must already hold (up to) the last `window_size` bytes of output, which back-references
/// may point into. No more than `block_max` bytes are appended. On error, `history` may contain
/// a partially decoded block and must be discarded.
pub fn decompress_payload(payload: &[u8], history: &mut Vec<u8>, window_size: usize, block_max: usize) -> Result<(), Error> {
    let mut input = payload;
    let literals = read_literals(&mut input, block_max)?;
    let sequence_count = read_length(&mut input, block_max / MIN_MATCH)?;

    let block_start = history.len();
    let mut literal_pos = 0usize;

    if sequence_count > 0 {
        let ll = CodeDecoder::read(&mut input)?;
        let of = CodeDecoder::read(&mut input)?;
        let ml = CodeDecoder::read(&mut input)?;
        let remaining = input.len();
        let stream_len = read_length(&mut input, remaining)?;
        let mut reader = BitReader::new(bits::take(&mut input, stream_len)?);

        for _ in 0..sequence_count {
            let literal_length = unbucket(ll.decode(&mut reader)?, &mut reader)? as usize;
            let offset = unbucket(of.decode(&mut reader)?, &mut reader)? as usize;
            let match_length = unbucket(ml.decode(&mut reader)?, &mut reader)? as usize + MIN_MATCH;

            let literal_end = literal_pos.checked_add(literal_length).ok_or(Error::LiteralsOverrun)?;
            let literal_run = literals.get(literal_pos..literal_end).ok_or(Error::LiteralsOverrun)?;
            let produced = history.len() - block_start;
            if produced + literal_length + match_length > block_max {
                return Err(Error::OutputOverflow);
            }

            history.extend_from_slice(literal_run);
            literal_pos = literal_end;

            if offset == 0 || offset > window_size || offset > history.len() {
                return Err(Error::InvalidOffset);
            }
            copy_overlapping(offset, match_length, history);
        }
        reader.finish()?;
    }

    let rest = &literals[literal_pos..];
    if history.len() - block_start + rest.len() > block_max {
        return Err(Error::OutputOverflow);
    }
    history.extend_from_slice(rest);

    if !input.is_empty() {
        return Err(Error::TrailingData);
    }
    Ok(())
}

/// Appends `match_len` bytes starting `offset` bytes back. The ranges may overlap.
fn copy_overlapping(offset: usize, match_len: usize, output: &mut Vec<u8>) {
    let old_len = output.len();
    debug_assert!(offset > 0 && offset <= old_len);
    match offset {
        // fastpath: memset if we repeat the same byte forever
        1 => output.resize(old_len + match_len, output[old_len - 1]),

        o if match_len <= o => {
            // fastpath: nonoverlapping
            // for borrowck reasons we have to extend with zeroes first and then memcpy
            // instead of simply using extend_from_slice
            output.resize(old_len + match_len, 0);
            let (head, tail) = output.split_at_mut(old_len);
            tail.copy_from_slice(&head[old_len - offset..][..match_len]);
        }
        2 | 4 | 8 => {
            // fastpath: overlapping but small

            // speedup: build 16 byte buffer so we can handle 16 bytes each iteration instead of one
            let mut buf = [0u8; 16];
            for chunk in buf.chunks_mut(offset) {
                chunk.copy_from_slice(&output[old_len - offset..][..offset]);
            }
            output.resize(old_len + match_len, 0);
            for target in output[old_len..].chunks_mut(buf.len()) {
                target.copy_from_slice(&buf[..target.len()]);
            }
        }
        _ => {
            // slowest path: copy single bytes
            output.reserve(match_len);
            for i in 0..match_len {
                let b = output[old_len - offset + i];
                output.push(b);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raw::{encode_payload, Sequence};

    fn decode(payload: &[u8]) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        decompress_payload(payload, &mut out, 1 << 16, 1 << 17)?;
        Ok(out)
    }

    #[test]
    fn aaaaaaaaaaa_lots_of_aaaaaaaaa() {
        // raw literal "a", one sequence (ll 1, offset 1, ml 5) with all three code streams in rle mode
        let payload = [LITERALS_RAW, 1, b'a', 1, CODES_RLE, 1, CODES_RLE, 1, CODES_RLE, 2, 0];
        assert_eq!(decode(&payload).unwrap(), b"aaaaaa");
    }

    #[test]
    fn all_literal() {
        assert_eq!(decode(&[LITERALS_RAW, 3, b'a', b'4', b'9', 0]).unwrap(), b"a49");
        assert_eq!(decode(&[LITERALS_RLE, 4, b'z', 0]).unwrap(), b"zzzz");
    }

    #[test]
    fn sequences_overrunning_literals() {
        // two literals, but the sequence asks for five of them
        let payload = [LITERALS_RAW, 2, b'a', b'b', 1, CODES_RLE, 5, CODES_RLE, 1, CODES_RLE, 0, 0];
        assert_eq!(decode(&payload), Err(Error::LiteralsOverrun));
        // two sequences of one literal each use up exactly the two literals
        let payload = [LITERALS_RAW, 2, b'a', b'b', 2, CODES_RLE, 1, CODES_RLE, 1, CODES_RLE, 0, 0];
        assert_eq!(decode(&payload).unwrap(), b"aaaabbbb");
    }

    #[test]
    fn offset_oob() {
        // offset 2 with only one byte of output
        let payload = [LITERALS_RAW, 1, b'a', 1, CODES_RLE, 1, CODES_RLE, 2, CODES_RLE, 0, 0];
        assert_eq!(decode(&payload), Err(Error::InvalidOffset));
        // offset 0
        let payload = [LITERALS_RAW, 1, b'a', 1, CODES_RLE, 1, CODES_RLE, 0, CODES_RLE, 0, 0];
        assert_eq!(decode(&payload), Err(Error::InvalidOffset));
    }

    #[test]
    fn offset_beyond_window() {
        let payload = [LITERALS_RAW, 1, b'a', 1, CODES_RLE, 0, CODES_RLE, 9, CODES_RLE, 0, 0];
        let mut history = vec![0u8; 100];
        assert_eq!(decompress_payload(&payload, &mut history, 8, 1 << 17), Err(Error::InvalidOffset));
        let mut history = vec![0u8; 100];
        decompress_payload(&payload, &mut history, 9, 1 << 17).unwrap();
        assert_eq!(history.len(), 100 + 1 + 3);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(decode(&[]), Err(Error::UnexpectedEnd));
        assert_eq!(decode(&[7, 0, 0]), Err(Error::InvalidMode(7)));
        assert_eq!(decode(&[LITERALS_RAW, 5, b'a']), Err(Error::UnexpectedEnd));
        assert_eq!(decode(&[LITERALS_RAW, 0, 0, 0xAA]), Err(Error::TrailingData));
        // literal run longer than the literals section
        let payload = [LITERALS_RAW, 1, b'a', 1, CODES_RLE, 2, CODES_RLE, 1, CODES_RLE, 0, 0];
        assert_eq!(decode(&payload), Err(Error::LiteralsOverrun));
    }

    #[test]
    fn output_is_capped() {
        let mut out = Vec::new();
        assert_eq!(decompress_payload(&[LITERALS_RLE, 0x80, 0x02, b'z', 0], &mut out, 1 << 16, 100), Err(Error::OutputOverflow));
    }

    #[test]
    fn encoded_payload_decodes() {
        let literals = b"abcdefghij".repeat(10);
        let sequences = vec![
            Sequence { literal_length: 50, match_length: 20, offset: 10 },
            Sequence { literal_length: 0, match_length: 300, offset: 1 },
            Sequence { literal_length: 25, match_length: 3, offset: 70 },
        ];
        let mut payload = Vec::new();
        encode_payload(&literals, &sequences, &mut payload).unwrap();

        let out = decode(&payload).unwrap();
        assert_eq!(out.len(), 100 + 20 + 300 + 3);
        assert_eq!(&out[..50], &literals[..50]);
        assert_eq!(&out[50..70], &out[40..60]);
        assert!(out[70..370].iter().all(|&b| b == out[69]));
        assert_eq!(&out[out.len() - 25..], &literals[75..]);
    }

    #[test]
    fn copy_overlapping_patterns() {
        for &offset in &[1usize, 2, 3, 4, 5, 8, 13] {
            let mut out: Vec<u8> = (0..offset as u8).collect();
            copy_overlapping(offset, 50, &mut out);
            for (i, &b) in out.iter().enumerate() {
                assert_eq!(b as usize, i % offset);
            }
        }
    }
}
