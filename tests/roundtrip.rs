use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zframe::framed::{BlockHeader, BlockType};
use zframe::{compress, compress_bound, compress_with, decompress, CompressionSettings, Decoder, ErrorKind, FrameHeader};

fn random(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill(&mut data[..]);
    data
}

/// Words from a small vocabulary, so there are plenty of matches and skewed literals.
fn text(len: usize, seed: u64) -> Vec<u8> {
    const WORDS: &[&str] = &["frame", "block", "window", "literal", "match", "offset", "the", "a", "of", "huffman", "sequence", "checksum"];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len + 16);
    while data.len() < len {
        data.extend_from_slice(WORDS[rng.gen_range(0, WORDS.len())].as_bytes());
        data.push(if rng.gen_range(0, 10) == 0 { b'\n' } else { b' ' });
    }
    data.truncate(len);
    data
}

/// Random runs, copies of earlier data and noise.
fn mixed(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let chunk = rng.gen_range(1, 2000);
        match rng.gen_range(0, 3) {
            0 => {
                let b: u8 = rng.gen();
                data.extend(std::iter::repeat(b).take(chunk));
            }
            1 if !data.is_empty() => {
                let start = rng.gen_range(0, data.len());
                for i in 0..chunk {
                    let b = data[start + i % (data.len() - start)];
                    data.push(b);
                }
            }
            _ => data.extend((0..chunk).map(|_| rng.gen::<u8>())),
        }
    }
    data.truncate(len);
    data
}

fn first_block(frame: &[u8]) -> BlockHeader {
    let header = FrameHeader::parse(&frame[4..]).unwrap();
    let start = header.encoded_len();
    BlockHeader::parse([frame[start], frame[start + 1], frame[start + 2]]).unwrap()
}

#[test]
fn small_inputs() {
    for len in 0..40 {
        for data in &[random(len, len as u64), text(len, len as u64), vec![b'z'; len]] {
            let compressed = compress(data, 20, true).unwrap();
            assert_eq!(&decompress(&compressed).unwrap(), data, "len {}", len);
        }
    }
}

#[test]
fn block_boundaries() {
    for &window_log in &[10u8, 12, 17] {
        let block = 1usize << window_log.min(17);
        for &len in &[block - 1, block, block + 1, 3 * block, 3 * block + 7] {
            let data = mixed(len, len as u64);
            let compressed = compress(&data, window_log, true).unwrap();
            assert_eq!(decompress(&compressed).unwrap(), data, "window_log {} len {}", window_log, len);
        }
    }
}

#[test]
fn megabytes() {
    let data = mixed(1 << 20, 1);
    for &level in &[1u8, 3, 9] {
        let mut settings = CompressionSettings::default();
        settings.level(level).window_log(21);
        let compressed = compress_with(&settings, &data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    let data = text(1 << 20, 2);
    let compressed = compress(&data, 20, true).unwrap();
    assert!(compressed.len() < data.len() / 2);
    assert_eq!(decompress(&compressed).unwrap(), data);
}

#[test]
fn min_match_settings() {
    let data = text(100_000, 3);
    for min_match in 3..=7 {
        let mut settings = CompressionSettings::default();
        settings.min_match(min_match);
        let compressed = compress_with(&settings, &data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data, "min_match {}", min_match);
    }
}

#[test]
fn size_bound() {
    for &len in &[0usize, 1, 4, 1000, 1024, 5000, 200_000, 1 << 20] {
        let data = random(len, 99);
        for &window_log in &[10u8, 20] {
            for &checksum in &[false, true] {
                let compressed = compress(&data, window_log, checksum).unwrap();
                assert!(compressed.len() <= compress_bound(len), "{} > {}", compressed.len(), compress_bound(len));
            }
        }
    }
}

#[test]
fn repeated_byte_is_not_stored_raw() {
    let compressed = compress(b"aaaaaaaaaa", 20, true).unwrap();
    let block = first_block(&compressed);
    assert!(block.last);
    assert_ne!(block.block_type, BlockType::Raw);
    assert_eq!(decompress(&compressed).unwrap(), b"aaaaaaaaaa");
}

#[test]
fn random_bytes_are_stored_raw() {
    for seed in 0..20 {
        let data = random(4, seed);
        let compressed = compress(&data, 20, true).unwrap();
        let block = first_block(&compressed);
        if data.iter().all(|&b| b == data[0]) {
            continue;
        }
        assert_eq!(block.block_type, BlockType::Raw);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }
}

#[test]
fn uncompressed_data_is_not_passed_through() {
    for data in &[text(1000, 4), random(1000, 4), Vec::from(&b"plain"[..])] {
        let err = decompress(data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
    // decompressing twice doesn't work either
    let once = decompress(&compress(&text(1000, 5), 20, true).unwrap()).unwrap();
    assert_eq!(decompress(&once).unwrap_err().kind(), ErrorKind::Format);
}

#[test]
fn concatenated_frames() {
    let parts = [text(5000, 6), Vec::new(), random(300, 6), vec![0; 70_000]];
    let mut stream = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        stream.extend_from_slice(&compress(part, 10 + i as u8, i % 2 == 0).unwrap());
    }
    assert_eq!(decompress(&stream).unwrap(), parts.concat());
}

#[test]
fn dictionary_round_trip() {
    let dict = text(50_000, 7);
    let data = text(20_000, 8);

    let mut settings = CompressionSettings::default();
    settings.dictionary(0xD1C7, &dict);
    let with_dict = compress_with(&settings, &data).unwrap();
    let without_dict = compress(&data, 20, true).unwrap();
    assert!(with_dict.len() < without_dict.len());

    assert_eq!(decompress(&with_dict).unwrap_err().kind(), ErrorKind::Format);

    let mut decoder = Decoder::with_dictionary(0xD1C7, &dict);
    let mut out = Vec::new();
    decoder.feed(&with_dict, &mut out).unwrap();
    decoder.finish().unwrap();
    assert_eq!(out, data);
}

#[test]
fn dictionary_larger_than_window() {
    let dict = mixed(10_000, 9);
    let mut data = dict[dict.len() - 800..].to_vec();
    data.extend_from_slice(&dict[..500]);

    let mut settings = CompressionSettings::default();
    settings.window_log(10).dictionary(1, &dict);
    let compressed = compress_with(&settings, &data).unwrap();

    let mut decoder = Decoder::with_dictionary(1, &dict);
    let mut out = Vec::new();
    decoder.feed(&compressed, &mut out).unwrap();
    decoder.finish().unwrap();
    assert_eq!(out, data);
}

#[test]
fn header_records_content_size() {
    let data = text(50_000, 10);
    let compressed = compress(&data, 20, false).unwrap();
    let header = zframe::read_frame_header(&compressed).unwrap();
    assert_eq!(header.content_size, Some(50_000));
    assert!(header.single_segment);
    assert!(!header.content_checksum);
}
