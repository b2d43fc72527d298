use zframe::{compress, decompress, CompressionSettings, Decoder};
use rand::prelude::*;
use std::time::Instant;

fn main() {
    let mut data = vec![0u8; 10_000_000];
    thread_rng().fill(&mut data[..1_000_000]);
    for (i, b) in data[1_000_000..].iter_mut().enumerate() {
        *b = b"all work and no play makes jack a dull boy "[i % 43];
    }

    let pre = Instant::now();
    let compressed = compress(&data, 20, true).unwrap();
    println!("compressed {} -> {} bytes in {:?}", data.len(), compressed.len(), pre.elapsed());

    let pre = Instant::now();
    let decompressed = decompress(&compressed).unwrap();
    println!("decompressed in {:?}", pre.elapsed());
    assert_eq!(decompressed, data);

    // the same frame, produced and consumed piece by piece
    let mut encoder = CompressionSettings::default().encoder().unwrap();
    let mut decoder = Decoder::new();
    let mut frame = Vec::new();
    let mut output = Vec::new();
    for chunk in data.chunks(65536) {
        frame.clear();
        encoder.feed(chunk, &mut frame).unwrap();
        decoder.feed(&frame, &mut output).unwrap();
    }
    frame.clear();
    encoder.finish(&mut frame).unwrap();
    decoder.feed(&frame, &mut output).unwrap();
    decoder.finish().unwrap();
    assert_eq!(output, data);
    println!("streamed {} bytes", output.len());
}
