#![no_main]
use libfuzzer_sys::fuzz_target;
use zframe::{CompressionSettings, FrameReader};
use std::io::{Cursor, Read};

fuzz_target!(|data: &[u8]| {
    // the first byte picks the settings, the rest is the content
    let (knobs, content) = match data.split_first() {
        Some((&k, rest)) => (k, rest),
        None => (0, data),
    };
    let mut output = Vec::new();

    CompressionSettings::default()
        .content_checksum(knobs & 1 != 0)
        .window_log(10 + (knobs >> 1) % 8)
        .level(1 + (knobs >> 4) % 9)
        .compress_stream(Cursor::new(content), &mut output)
        .expect("Could not compress input data");

    assert!(output.len() <= zframe::compress_bound(content.len()));

    let mut roundtripped = Vec::new();
    FrameReader::new(Cursor::new(output))
        .read_to_end(&mut roundtripped)
        .expect("Could not read decompressed data");
    assert!(roundtripped.iter().eq(content));
});
