//! The match finder.
//!
//! We make use of hash chains to find duplicates: a head table maps a hash of the next few bytes
//! to the most recent position with that hash, and a chain links every position to the previous one
//! with the same hash. Walking the chain visits candidates from the nearest to the farthest,
//! so on equal length the lowest offset wins. Memory usage is fixed by the window size.

use std::mem;
use byteorder::{ByteOrder, LE};
use cfg_if::cfg_if;

use super::{Sequence, MIN_MATCH};

const HASHLOG: usize = 15;
const HASH_SIZE: usize = 1 << HASHLOG;
/// Chains beyond this many positions are forgotten, regardless of window size.
const MAX_CHAIN_LOG: u32 = 18;
/// Matches are hashed on at most this many leading bytes.
const MAX_HASH_BYTES: usize = 4;

/// Finds back-references inside a sliding window.
///
/// Positions are absolute stream positions (the window buffer handed in is described by
/// the absolute position of its first byte), so the finder survives the window sliding
/// forward without rewriting its tables.
#[derive(Clone)]
pub struct MatchFinder {
    /// Most recent absolute position + 1 per hash, 0 meaning empty.
    head: Vec<u64>,
    /// Previous absolute position + 1 with the same hash, indexed by position modulo chain size.
    chain: Vec<u64>,
    chain_mask: u64,
    window_size: u64,
    search_depth: usize,
    min_match: usize,
    hash_bytes: usize,
}

impl MatchFinder {
    /// `search_depth` is the number of chain entries examined per position (at least 1).
    pub fn new(window_size: usize, search_depth: usize, min_match: usize) -> Self {
        assert!(min_match >= MIN_MATCH, "matches shorter than {} can't be encoded", MIN_MATCH);
        let chain_log = (window_size.max(1).next_power_of_two().trailing_zeros()).min(MAX_CHAIN_LOG);
        let chain_len = 1usize << chain_log;
        MatchFinder {
            head: vec![0; HASH_SIZE],
            chain: vec![0; chain_len],
            chain_mask: chain_len as u64 - 1,
            window_size: window_size as u64,
            search_depth: search_depth.max(1),
            min_match,
            hash_bytes: min_match.min(MAX_HASH_BYTES),
        }
    }

    #[inline]
    fn hash(&self, input: &[u8]) -> usize {
        let mut buf = [0u8; 4];
        buf[..self.hash_bytes].copy_from_slice(&input[..self.hash_bytes]);
        let v = LE::read_u32(&buf);
        (v.wrapping_mul(2654435761) >> (32 - HASHLOG)) as usize
    }

    /// Registers `window[pos..]` as a future match candidate.
    #[inline]
    fn insert(&mut self, window: &[u8], pos: usize, base: u64) {
        if pos + self.hash_bytes > window.len() {
            return;
        }
        let abs = base + pos as u64;
        let h = self.hash(&window[pos..]);
        let previous = mem::replace(&mut self.head[h], abs + 1);
        self.chain[(abs & self.chain_mask) as usize] = previous;
    }

    /// Registers every position in `window[from..to]` without looking for matches.
    ///
    /// Used for dictionaries and for blocks that were stored without running the finder.
    pub fn insert_range(&mut self, window: &[u8], from: usize, to: usize, base: u64) {
        self.catch_up(window, from, base);
        for pos in from..to {
            self.insert(window, pos, base);
        }
    }

    /// The last few positions before `start` had too few bytes behind them to be hashed
    /// when they were first seen. Now that more data follows them, register them.
    fn catch_up(&mut self, window: &[u8], start: usize, base: u64) {
        for pos in start.saturating_sub(self.hash_bytes - 1)..start {
            self.insert(window, pos, base);
        }
    }

    /// Longest match for `window[pos..]` as (offset, length).
    fn longest_match(&self, window: &[u8], pos: usize, base: u64) -> Option<(usize, usize)> {
        let abs = base + pos as u64;
        let current = &window[pos..];
        let mut best: Option<(usize, usize)> = None;
        let mut best_len = self.min_match - 1;

        let mut candidate = self.head[self.hash(current)];
        for _ in 0..self.search_depth {
            if candidate == 0 {
                break;
            }
            let cand_abs = candidate - 1;
            // evicted from the window, or a recycled slot pointing forward
            if cand_abs < base || cand_abs >= abs {
                break;
            }
            let offset = abs - cand_abs;
            if offset > self.window_size {
                break;
            }

            let len = count_matching_bytes(current, &window[(cand_abs - base) as usize..]);
            if len > best_len {
                best_len = len;
                best = Some((offset as usize, len));
                if len == current.len() {
                    break;
                }
            }

            // past this distance the chain slot may already belong to a newer position
            if offset > self.chain_mask {
                break;
            }
            let next = self.chain[(cand_abs & self.chain_mask) as usize];
            if next >= candidate {
                break;
            }
            candidate = next;
        }
        best
    }

    /// Greedy parse of `window[start..]`, the bytes before `start` being history.
    ///
    /// `base` is the absolute stream position of `window[0]`. Literals are appended to `literals`,
    /// the trailing literal run (not followed by any match) included.
    pub fn find_sequences(
        &mut self,
        window: &[u8],
        start: usize,
        base: u64,
        literals: &mut Vec<u8>,
        sequences: &mut Vec<Sequence>,
    ) {
        let end = window.len();
        self.catch_up(window, start, base);
        let mut cursor = start;
        let mut literal_start = start;

        while cursor + self.min_match <= end {
            let found = self.longest_match(window, cursor, base);
            self.insert(window, cursor, base);

            let (offset, mut match_len) = match found {
                Some(m) => m,
                None => {
                    cursor += 1;
                    continue;
                }
            };

            // backtrack into the pending literals as long as the bytes before both ends agree
            // candidates are never older than window[0], so this can't underflow
            let candidate = cursor - offset;
            let max_backtrack = (cursor - literal_start).min(candidate);
            let backtrack = window[..cursor].iter().rev()
                .zip(window[..candidate].iter().rev())
                .take(max_backtrack)
                .take_while(|&(a, b)| a == b)
                .count();
            let match_start = cursor - backtrack;
            match_len += backtrack;

            literals.extend_from_slice(&window[literal_start..match_start]);
            sequences.push(Sequence {
                literal_length: (match_start - literal_start) as u32,
                match_length: match_len as u32,
                offset: offset as u32,
            });

            let match_end = match_start + match_len;
            for pos in cursor + 1..match_end {
                self.insert(window, pos, base);
            }
            cursor = match_end;
            literal_start = match_end;
        }

        literals.extend_from_slice(&window[literal_start..]);
        // whatever is still too close to the end is picked up by catch_up on the next call
        for pos in cursor..end {
            self.insert(window, pos, base);
        }
    }
}

fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize {
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }
    cfg_if! {
        if #[cfg(target_endian = "little")] {
            fn archdep_zeros(i: usize) -> u32 { i.trailing_zeros() }
        } else {
            fn archdep_zeros(i: usize) -> u32 { i.leading_zeros() }
        }
    }

    let mut matching_bytes = 0;
    // match in chunks of usize so we process a full register at a time instead of single bytes
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            return matching_bytes + (archdep_zeros(xor) / 8) as usize;
        }
    }

    // ran out of full registers on one side, finish byte by byte
    let trailing_matches = a.iter().zip(b).skip(matching_bytes).take_while(|&(a, b)| a == b).count();
    matching_bytes + trailing_matches
}
