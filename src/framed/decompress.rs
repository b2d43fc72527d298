use byteorder::{ByteOrder, LE};
use std::hash::Hasher;
use std::io::{self, Read, Write, BufRead};
use std::cmp;
use std::mem;
use twox_hash::XxHash64;
use thiserror::Error;
use fehler::{throw, throws};
use log::{debug, trace};

use super::{block_max, MAGIC, SKIPPABLE_MAGIC, SKIPPABLE_MAGIC_MASK, CHECKSUM_SIZE, MAX_WINDOW_LOG};
use super::block::{self, BlockHeader, BlockType};
use super::header::{self, Flags, FrameHeader};
use crate::raw;


/// Errors when decompressing a frame.
#[derive(Error, Debug)]
pub enum DecompressionError {
    #[error("error reading from the input you gave me")]
    InputError(#[from] io::Error),
    #[error("error writing to the output you gave me")]
    OutputError(io::Error),
    #[error("the block decompression failed (data corruption?)")]
    CodecError(#[from] raw::DecodeError),
    #[error("invalid header")]
    HeaderParseError(#[from] header::ParseError),
    #[error("wrong magic number in frame header: {0:08x}")]
    WrongMagic(u32),
    #[error("block uses the reserved block type")]
    ReservedBlockType,
    #[error("frame needs a window of {0} bytes, more than we are willing to allocate")]
    WindowTooLarge(u64),
    #[error("frame was compressed with dictionary {0}, which we don't have")]
    MissingDictionary(u32),
    #[error("input ended in the middle of the {0}")]
    Truncated(&'static str),
    #[error("the frame checksum was invalid")]
    FrameChecksumFail,
    #[error("frame header announced {expected} bytes of content but blocks decode to {actual}")]
    ContentSizeMismatch { expected: u64, actual: u64 },
    #[error("a block is larger than the frame allows")]
    BlockSizeOverflow,
    #[error("this decompression session has already been finished or aborted")]
    ClosedSession,
}
type Error = DecompressionError; // do it this way for better docs

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, e)
    }
}

/// Coarse classification of decompression errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not our format, or a feature we don't support. Retrying won't help.
    Format,
    /// The input ended too early. A streaming caller may feed more bytes.
    Truncated,
    /// Structurally present but invalid data, or a checksum mismatch.
    Corrupt,
    /// The session was used after it ended.
    ClosedSession,
    /// The underlying reader or writer failed.
    Io,
}

impl DecompressionError {
    pub fn kind(&self) -> ErrorKind {
        use DecompressionError::*;
        match self {
            WrongMagic(_) | ReservedBlockType | WindowTooLarge(_) | MissingDictionary(_) => ErrorKind::Format,
            HeaderParseError(header::ParseError::ReservedBitsSet) => ErrorKind::Format,
            HeaderParseError(header::ParseError::Truncated) | Truncated(_) => ErrorKind::Truncated,
            CodecError(_) | FrameChecksumFail | ContentSizeMismatch { .. } | BlockSizeOverflow => ErrorKind::Corrupt,
            ClosedSession => ErrorKind::ClosedSession,
            InputError(_) | OutputError(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Magic,
    FrameHeader,
    SkipSize,
    Skip(u64),
    BlockHeader,
    BlockPayload(BlockHeader),
    Checksum,
    Closed,
}

impl State {
    fn describe(self) -> &'static str {
        match self {
            State::Magic => "magic number",
            State::FrameHeader => "frame header",
            State::SkipSize | State::Skip(_) => "skippable frame",
            State::BlockHeader => "block header",
            State::BlockPayload(_) => "block payload",
            State::Checksum => "frame checksum",
            State::Closed => "closed session",
        }
    }
}

/// Per-frame decoding state.
struct Frame {
    header: FrameHeader,
    window_size: usize,
    block_max: usize,
    /// At least the last `window_size` bytes of output (dictionary included).
    history: Vec<u8>,
    hasher: XxHash64,
    produced: u64,
}

/// A streaming decompression session.
///
/// Compressed bytes can be fed in chunks of any size, split anywhere. A block is decoded as soon as it is
/// complete, and its output is only handed out once the whole block decoded successfully.
/// Any number of frames (skippable frames included) may follow each other.
pub struct Decoder<'a> {
    dictionary: Option<(u32, &'a [u8])>,
    max_window_log: u8,
    state: State,
    /// Input that has not been consumed yet.
    input: Vec<u8>,
    frame: Option<Frame>,
    frames_done: u64,
}

impl<'a> Default for Decoder<'a> {
    fn default() -> Self {
        Decoder {
            dictionary: None,
            max_window_log: MAX_WINDOW_LOG,
            state: State::Magic,
            input: Vec::new(),
            frame: None,
            frames_done: 0,
        }
    }
}

impl<'a> Decoder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder for frames compressed with the dictionary `id`. Frames without a dictionary id decode as usual.
    pub fn with_dictionary(id: u32, dict: &'a [u8]) -> Self {
        Decoder {
            dictionary: Some((id, dict)),
            ..Self::default()
        }
    }

    /// Frames that need a larger window than `2^v` bytes are rejected with `WindowTooLarge`.
    ///
    /// The default is 27 (128 MiB), which is also the largest limit that can be set.
    pub fn max_window_log(&mut self, v: u8) -> &mut Self {
        self.max_window_log = v.min(MAX_WINDOW_LOG);
        self
    }

    /// Header of the frame currently being decoded.
    pub fn frame_header(&self) -> Option<&FrameHeader> {
        self.frame.as_ref().map(|f| &f.header)
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Consumes `input`, appending all output that can be decoded so far to `output`.
    ///
    /// Running out of input is never an error here. Any other error ends the session.
    pub fn feed(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), Error> {
        if self.state == State::Closed {
            return Err(Error::ClosedSession);
        }
        self.input.extend_from_slice(input);
        let result = self.process(output);
        if result.is_err() {
            self.close();
        }
        result
    }

    /// Declares the end of the input.
    ///
    /// Fails with `Truncated` if the input stopped inside a frame, in which case the session stays usable
    /// and more input may be fed. Otherwise the session is closed.
    pub fn finish(&mut self) -> Result<(), Error> {
        match self.state {
            State::Closed => Err(Error::ClosedSession),
            State::Magic if self.input.is_empty() && self.frames_done > 0 => {
                self.close();
                Ok(())
            }
            State::Magic if is_magic_prefix(&self.input) => Err(Error::Truncated("magic number")),
            State::Magic => {
                let mut padded = [0u8; 4];
                padded[..self.input.len()].copy_from_slice(&self.input);
                self.close();
                Err(Error::WrongMagic(LE::read_u32(&padded)))
            }
            state => Err(Error::Truncated(state.describe())),
        }
    }

    /// Drops the window and all buffered input. Later calls fail with `ClosedSession`.
    pub fn abort(&mut self) {
        if self.state != State::Closed {
            debug!("decompression session aborted");
        }
        self.close();
    }

    fn close(&mut self) {
        self.state = State::Closed;
        self.input = Vec::new();
        self.frame = None;
    }

    #[throws]
    fn process(&mut self, output: &mut Vec<u8>) {
        let mut input = mem::take(&mut self.input);
        let mut pos = 0;
        while let Some(consumed) = self.step(&input[pos..], output)? {
            pos += consumed;
        }
        input.drain(..pos);
        self.input = input;
    }

    /// Advances by one state. Returns the number of bytes consumed, or `None` if `data` is too short.
    #[throws]
    fn step(&mut self, data: &[u8], output: &mut Vec<u8>) -> Option<usize> {
        match self.state {
            State::Magic if data.len() < 4 => None,
            State::Magic => {
                let magic = LE::read_u32(data);
                if magic == MAGIC {
                    self.state = State::FrameHeader;
                } else if magic & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC {
                    self.state = State::SkipSize;
                } else {
                    throw!(Error::WrongMagic(magic));
                }
                Some(4)
            }

            State::FrameHeader => match data.first() {
                None => None,
                Some(&descriptor) => {
                    Flags::parse(descriptor)?;
                    let len = FrameHeader::required_len(descriptor);
                    if data.len() < len {
                        None
                    } else {
                        self.start_frame(FrameHeader::parse(&data[..len])?)?;
                        self.state = State::BlockHeader;
                        Some(len)
                    }
                }
            },

            State::SkipSize if data.len() < 4 => None,
            State::SkipSize => {
                let size = LE::read_u32(data);
                trace!("skipping {} bytes", size);
                self.state = State::Skip(u64::from(size));
                Some(4)
            }
            State::Skip(0) => {
                self.frames_done += 1;
                self.state = State::Magic;
                Some(0)
            }
            State::Skip(_) if data.is_empty() => None,
            State::Skip(remaining) => {
                let skip = cmp::min(remaining, data.len() as u64);
                self.state = State::Skip(remaining - skip);
                Some(skip as usize)
            }

            State::BlockHeader if data.len() < BlockHeader::SIZE => None,
            State::BlockHeader => {
                let header = BlockHeader::parse([data[0], data[1], data[2]])?;
                let frame = self.frame.as_ref().expect("block header outside of a frame");
                if header.size > frame.block_max {
                    throw!(Error::BlockSizeOverflow);
                }
                if header.block_type != BlockType::Compressed {
                    // the regenerated size is known upfront
                    frame.check_content_size(header.size as u64)?;
                }
                self.state = State::BlockPayload(header);
                Some(BlockHeader::SIZE)
            }
            State::BlockPayload(header) if data.len() < header.payload_len() => None,
            State::BlockPayload(header) => {
                let frame = self.frame.as_mut().expect("block payload outside of a frame");
                frame.decode_block(&header, &data[..header.payload_len()], output)?;

                self.state = if !header.last {
                    State::BlockHeader
                } else {
                    if let Some(expected) = frame.header.content_size {
                        if expected != frame.produced {
                            throw!(Error::ContentSizeMismatch { expected, actual: frame.produced });
                        }
                    }
                    if frame.header.content_checksum {
                        State::Checksum
                    } else {
                        self.end_frame();
                        State::Magic
                    }
                };
                Some(header.payload_len())
            }

            State::Checksum if data.len() < CHECKSUM_SIZE => None,
            State::Checksum => {
                let frame = self.frame.as_ref().expect("checksum outside of a frame");
                if LE::read_u32(data) != frame.hasher.finish() as u32 {
                    throw!(Error::FrameChecksumFail);
                }
                self.end_frame();
                self.state = State::Magic;
                Some(CHECKSUM_SIZE)
            }

            State::Closed => throw!(Error::ClosedSession),
        }
    }

    #[throws]
    fn start_frame(&mut self, header: FrameHeader) {
        if header.window_size > 1u64 << self.max_window_log {
            throw!(Error::WindowTooLarge(header.window_size));
        }
        let window_size = header.window_size as usize;

        let mut history = Vec::new();
        if let Some(id) = header.dictionary_id {
            match self.dictionary {
                Some((dict_id, dict)) if dict_id == id => {
                    history.extend_from_slice(&dict[dict.len().saturating_sub(window_size)..]);
                }
                _ => throw!(Error::MissingDictionary(id)),
            }
        }

        debug!("frame started: {:?}", header);
        self.frame = Some(Frame {
            block_max: block_max(header.window_size),
            window_size,
            history,
            hasher: XxHash64::with_seed(0),
            produced: 0,
            header,
        });
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            debug!("frame finished: {} bytes of content", frame.produced);
        }
        self.frames_done += 1;
    }
}

impl Frame {
    #[throws]
    fn check_content_size(&self, additional: u64) {
        if let Some(expected) = self.header.content_size {
            let actual = self.produced + additional;
            if actual > expected {
                throw!(Error::ContentSizeMismatch { expected, actual });
            }
        }
    }

    #[throws]
    fn decode_block(&mut self, header: &BlockHeader, payload: &[u8], output: &mut Vec<u8>) {
        let before = self.history.len();
        block::decode_block(header, payload, &mut self.history, self.window_size, self.block_max)?;
        let produced = self.history.len() - before;
        self.check_content_size(produced as u64)?;
        trace!("{:?} block: {} -> {} bytes", header.block_type, payload.len(), produced);

        let block = &self.history[before..];
        self.hasher.write(block);
        output.extend_from_slice(block);
        self.produced += produced as u64;

        // keep the window, but don't shift the buffer after every block
        if self.history.len() > 2 * self.window_size + self.block_max {
            let excess = self.history.len() - self.window_size;
            self.history.drain(..excess);
        }
    }
}

fn is_magic_prefix(data: &[u8]) -> bool {
    let magic = MAGIC.to_le_bytes();
    let skippable = SKIPPABLE_MAGIC.to_le_bytes();
    // the low nibble of the skippable magic sits in its first byte
    data.len() < 4 && (magic.starts_with(data)
        || data.is_empty()
        || (data[0] & 0xF0 == skippable[0] && skippable[1..].starts_with(&data[1..])))
}

/// Parses the header of the frame at the start of `data` without decoding anything.
#[throws]
pub fn read_frame_header(data: &[u8]) -> FrameHeader {
    if data.len() < 4 {
        throw!(Error::Truncated("magic number"));
    }
    let magic = LE::read_u32(data);
    if magic != MAGIC {
        throw!(Error::WrongMagic(magic));
    }
    FrameHeader::parse(&data[4..])?
}

/// Wrapper around `Decoder` that implements `Read` and `BufRead`.
pub struct FrameReader<'a, R: Read> {
    reader: R,
    decoder: Decoder<'a>,
    read_buf: Vec<u8>,
    buffer: Vec<u8>,
    bytes_taken: usize,
    eof: bool,
}

impl<'a, R: Read> FrameReader<'a, R> {
    pub fn new(reader: R) -> Self {
        Self::with_decoder(reader, Decoder::new())
    }

    pub fn with_decoder(reader: R, decoder: Decoder<'a>) -> Self {
        FrameReader {
            reader,
            decoder,
            read_buf: vec![0; 64 * 1024],
            buffer: Vec::new(),
            bytes_taken: 0,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R { self.reader }
}

impl<'a, R: Read> Read for FrameReader<'a, R> {
    #[throws(io::Error)]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mybuf = self.fill_buf()?;
        let bytes_to_take = cmp::min(mybuf.len(), buf.len());
        buf[..bytes_to_take].copy_from_slice(&mybuf[..bytes_to_take]);
        self.consume(bytes_to_take);
        bytes_to_take
    }
}

impl<'a, R: Read> BufRead for FrameReader<'a, R> {
    #[throws(io::Error)]
    fn fill_buf(&mut self) -> &[u8] {
        while self.bytes_taken == self.buffer.len() && !self.eof {
            self.buffer.clear();
            self.bytes_taken = 0;
            let n = self.reader.read(&mut self.read_buf)?;
            if n == 0 {
                self.decoder.finish()?;
                self.eof = true;
            } else {
                self.decoder.feed(&self.read_buf[..n], &mut self.buffer)?;
            }
        }
        &self.buffer[self.bytes_taken..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_taken += amt;
        assert!(self.bytes_taken <= self.buffer.len(), "You consumed more bytes than I even gave you!");
    }
}

/// Decompresses every frame `reader` yields into `writer`, returning the number of bytes written.
#[throws]
pub fn decompress_stream<R: Read, W: Write>(mut reader: R, mut writer: W) -> u64 {
    let mut decoder = Decoder::new();
    let mut read_buf = vec![0; 64 * 1024];
    let mut output = Vec::new();
    let mut total = 0;
    loop {
        let n = reader.read(&mut read_buf)?;
        if n == 0 {
            break;
        }
        output.clear();
        decoder.feed(&read_buf[..n], &mut output)?;
        writer.write_all(&output).map_err(Error::OutputError)?;
        total += output.len() as u64;
    }
    decoder.finish()?;
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framed::CompressionSettings;

    fn compress(data: &[u8], settings: &CompressionSettings) -> Vec<u8> {
        let mut out = Vec::new();
        settings.compress_stream(data, &mut out).unwrap();
        out
    }

    fn decode_all(data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        decoder.feed(data, &mut out)?;
        decoder.finish()?;
        Ok(out)
    }

    #[test]
    fn byte_by_byte() {
        let data = b"Lorem ipsum dolor sit amet, lorem ipsum dolor sit amet, consectetur adipiscing elit".repeat(50);
        let compressed = compress(&data, CompressionSettings::default().window_log(10));

        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        for b in &compressed {
            decoder.feed(&[*b], &mut out).unwrap();
        }
        decoder.finish().unwrap();
        assert_eq!(out, data);
        assert!(decoder.is_closed());
    }

    #[test]
    fn finish_mid_frame_is_recoverable() {
        let compressed = compress(b"hello hello hello hello", &CompressionSettings::default());
        let (head, tail) = compressed.split_at(7);

        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        decoder.feed(head, &mut out).unwrap();
        assert_eq!(decoder.finish().unwrap_err().kind(), ErrorKind::Truncated);
        decoder.feed(tail, &mut out).unwrap();
        decoder.finish().unwrap();
        assert_eq!(out, b"hello hello hello hello");
    }

    #[test]
    fn plain_data_is_rejected() {
        let err = decode_all(b"just some text, not compressed").unwrap_err();
        assert!(matches!(err, Error::WrongMagic(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
        // too short to even hold a magic number
        assert_eq!(decode_all(b"ab").unwrap_err().kind(), ErrorKind::Format);
        assert_eq!(decode_all(&MAGIC.to_le_bytes()[..2]).unwrap_err().kind(), ErrorKind::Truncated);
        assert_eq!(decode_all(&[]).unwrap_err().kind(), ErrorKind::Truncated);
    }

    #[test]
    fn errors_close_the_session() {
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        assert!(decoder.feed(b"nope", &mut out).is_err());
        assert!(matches!(decoder.feed(b"", &mut out), Err(Error::ClosedSession)));
        assert_eq!(decoder.finish().unwrap_err().kind(), ErrorKind::ClosedSession);
    }

    #[test]
    fn abort() {
        let compressed = compress(&[9u8; 100], &CompressionSettings::default());
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        decoder.feed(&compressed[..10], &mut out).unwrap();
        decoder.abort();
        assert!(matches!(decoder.feed(&compressed[10..], &mut out), Err(Error::ClosedSession)));
        assert!(matches!(decoder.finish(), Err(Error::ClosedSession)));
    }

    #[test]
    fn checksum_mismatch() {
        let mut compressed = compress(b"checksummed content", &CompressionSettings::default());
        let last = compressed.len() - 1;
        compressed[last] ^= 0x40;
        let err = decode_all(&compressed).unwrap_err();
        assert!(matches!(err, Error::FrameChecksumFail));
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn reserved_block_type() {
        let mut frame = Vec::new();
        FrameHeader::new(20, Some(1), None, false).write(&mut frame).unwrap();
        frame.extend_from_slice(&[0b111, 0, 0]);
        let err = decode_all(&frame).unwrap_err();
        assert!(matches!(err, Error::ReservedBlockType));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn content_size_is_enforced() {
        // header says 3 bytes, the RLE block makes 5
        let mut frame = Vec::new();
        FrameHeader::new(20, Some(3), None, false).write(&mut frame).unwrap();
        BlockHeader { last: true, block_type: BlockType::Rle, size: 5 }.write(&mut frame).unwrap();
        frame.push(b'x');
        assert!(matches!(decode_all(&frame), Err(Error::BlockSizeOverflow)));

        let mut frame = Vec::new();
        FrameHeader::new(20, Some(300), None, false).write(&mut frame).unwrap();
        BlockHeader { last: true, block_type: BlockType::Rle, size: 299 }.write(&mut frame).unwrap();
        frame.push(b'x');
        assert!(matches!(decode_all(&frame), Err(Error::ContentSizeMismatch { expected: 300, actual: 299 })));
    }

    #[test]
    fn window_limit() {
        let compressed = compress(&[1, 2, 3], CompressionSettings::default().window_log(16).pledged_content_size(None));
        let mut decoder = Decoder::new();
        decoder.max_window_log(10);
        // single segment frame: the window is the content size
        decoder.feed(&compressed, &mut Vec::new()).unwrap();

        let mut frame = Vec::new();
        FrameHeader::new(16, None, None, false).write(&mut frame).unwrap();
        let mut decoder = Decoder::new();
        decoder.max_window_log(15);
        assert!(matches!(decoder.feed(&frame, &mut Vec::new()), Err(Error::WindowTooLarge(65536))));
    }

    #[test]
    fn window_limit_is_capped() {
        let mut frame = Vec::new();
        FrameHeader::new(MAX_WINDOW_LOG + 1, None, None, false).write(&mut frame).unwrap();
        let mut decoder = Decoder::new();
        decoder.max_window_log(u8::MAX);
        assert!(matches!(decoder.feed(&frame, &mut Vec::new()), Err(Error::WindowTooLarge(w)) if w == 1 << 28));

        let mut decoder = Decoder::new();
        decoder.max_window_log(64);
        let compressed = compress(b"still decodes", &CompressionSettings::default());
        let mut out = Vec::new();
        decoder.feed(&compressed, &mut out).unwrap();
        decoder.finish().unwrap();
        assert_eq!(out, b"still decodes");
    }

    #[test]
    fn skippable_and_concatenated_frames() {
        let mut stream = compress(b"first frame ", &CompressionSettings::default());
        stream.extend_from_slice(&(SKIPPABLE_MAGIC | 7).to_le_bytes());
        stream.extend_from_slice(&5u32.to_le_bytes());
        stream.extend_from_slice(b"junk!");
        stream.extend_from_slice(&compress(b"second frame", CompressionSettings::default().content_checksum(false)));
        assert_eq!(decode_all(&stream).unwrap(), b"first frame second frame");

        // split inside the skippable frame
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        for chunk in stream.chunks(3) {
            decoder.feed(chunk, &mut out).unwrap();
        }
        decoder.finish().unwrap();
        assert_eq!(out, b"first frame second frame");
    }

    #[test]
    fn partial_skippable_magic() {
        let mut decoder = Decoder::new();
        decoder.feed(&[0x5A, 0x2A], &mut Vec::new()).unwrap();
        assert_eq!(decoder.finish().unwrap_err().kind(), ErrorKind::Truncated);
    }

    #[test]
    fn dictionary() {
        let dict = b"A dictionary holds data both sides know about in advance.".repeat(3);
        let data = b"Both sides know about the dictionary in advance.";
        let mut settings = CompressionSettings::default();
        settings.dictionary(77, &dict);
        let compressed = compress(data, &settings);

        assert!(matches!(decode_all(&compressed), Err(Error::MissingDictionary(77))));
        let mut out = Vec::new();
        let mut decoder = Decoder::with_dictionary(76, &dict);
        assert!(matches!(decoder.feed(&compressed, &mut out), Err(Error::MissingDictionary(77))));

        let mut decoder = Decoder::with_dictionary(77, &dict);
        decoder.feed(&compressed, &mut out).unwrap();
        decoder.finish().unwrap();
        assert_eq!(out, &data[..]);
    }

    #[test]
    fn reader_and_stream() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i.wrapping_mul(i) % 7919) as u8).collect();
        let compressed = compress(&data, CompressionSettings::default().window_log(14));

        let mut plaintext = Vec::new();
        FrameReader::new(&compressed[..]).read_to_end(&mut plaintext).unwrap();
        assert_eq!(plaintext, data);

        let mut plaintext = Vec::new();
        let n = decompress_stream(&compressed[..], &mut plaintext).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(plaintext, data);
    }

    #[test]
    fn frame_inspection() {
        let compressed = compress(&[0u8; 5000], &CompressionSettings::default());
        let header = read_frame_header(&compressed).unwrap();
        assert_eq!(header.content_size, Some(5000));
        assert!(header.content_checksum);
        assert!(matches!(read_frame_header(b"zzzzzz"), Err(Error::WrongMagic(_))));
    }
}
