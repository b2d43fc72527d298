#![no_main]
use libfuzzer_sys::fuzz_target;
use zframe::{compress_with, CompressionSettings, Decoder};

fuzz_target!(|data: &[u8]| {
    // the first two bytes pick where to cut, the rest is the content
    if data.len() < 2 {
        return;
    }
    let step = 1 + data[0] as usize * 7;
    let content = &data[2..];

    let mut settings = CompressionSettings::default();
    settings.window_log(10 + data[1] % 4);
    let one_shot = compress_with(&settings, content).expect("Could not compress input data");

    let mut encoder = settings.encoder().expect("Could not create encoder");
    let mut streamed = Vec::new();
    for piece in content.chunks(step) {
        encoder.feed(piece, &mut streamed).expect("Could not feed encoder");
    }
    encoder.finish(&mut streamed).expect("Could not finish frame");
    assert_eq!(streamed, one_shot, "chunking changed the compressed output");

    let mut decoder = Decoder::new();
    let mut decompressed = Vec::new();
    for piece in streamed.chunks(step) {
        decoder.feed(piece, &mut decompressed).expect("Could not feed decoder");
    }
    decoder.finish().expect("Frame was incomplete");
    assert_eq!(decompressed, content);
});
