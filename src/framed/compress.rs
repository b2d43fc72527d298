use byteorder::{LE, WriteBytesExt};
use std::hash::Hasher;
use std::io::{self, Read, Write, ErrorKind};
use twox_hash::XxHash64;
use thiserror::Error;
use fehler::{throw, throws};
use log::debug;

use super::{block_max, DEFAULT_WINDOW_LOG, MIN_WINDOW_LOG, MAX_WINDOW_LOG};
use super::block::BlockEncoder;
use super::header::FrameHeader;
use crate::entropy::EncodeError;
use crate::raw::matcher::MatchFinder;


/// Errors when compressing a frame.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("error reading from the input you gave me")]
    ReadError(io::Error),
    #[error("error writing to the output you gave me")]
    WriteError(#[from] io::Error),
    #[error("window log {0} is not supported (must be 10..=27)")]
    InvalidWindowLog(u8),
    #[error("compression level {0} is not supported (must be 1..=9)")]
    InvalidLevel(u8),
    #[error("minimum match length {0} is not supported (must be 3..=7)")]
    InvalidMinMatch(usize),
    #[error("pledged a content size of {pledged} bytes but got {actual}")]
    PledgedSizeMismatch { pledged: u64, actual: u64 },
    #[error("this compression session has already been finished or aborted")]
    ClosedSession,
    #[error("entropy coding failed")]
    Entropy(#[from] EncodeError),
}
type Error = CompressionError; // do it this way for better docs
impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        io::Error::new(ErrorKind::Other, e)
    }
}

/// A builder-style struct that configures compression settings.
///
/// Create it using `Default::default()`.
#[derive(Clone, Debug)]
pub struct CompressionSettings<'a> {
    window_log: u8,
    level: u8,
    min_match: usize,
    content_checksum: bool,
    pledged_content_size: Option<u64>,
    dictionary: Option<&'a [u8]>,
    dictionary_id: Option<u32>,
}
impl<'a> Default for CompressionSettings<'a> {
    fn default() -> Self {
        Self {
            window_log: DEFAULT_WINDOW_LOG,
            level: 3,
            min_match: 4,
            content_checksum: true,
            pledged_content_size: None,
            dictionary: None,
            dictionary_id: None,
        }
    }
}
impl<'a> CompressionSettings<'a> {
    /// Matches may reach back `2^window_log` bytes. The decoder has to keep that much history around,
    /// so large windows cost memory on both sides.
    ///
    /// Valid values are 10 to 27, the default is 20 (1 MiB).
    pub fn window_log(&mut self, v: u8) -> &mut Self {
        self.window_log = v;
        self
    }

    /// Trades speed for compression ratio by searching more match candidates per position.
    ///
    /// Valid values are 1 to 9, the default is 3.
    pub fn level(&mut self, v: u8) -> &mut Self {
        self.level = v;
        self
    }

    /// Shorter matches than this are never emitted. Short matches find more repetitions
    /// but often cost more to encode than the literals they replace.
    ///
    /// Valid values are 3 to 7, the default is 4.
    pub fn min_match(&mut self, v: usize) -> &mut Self {
        self.min_match = v;
        self
    }

    /// The content checksum is calculated over the contents of the entire frame.
    ///
    /// Note that the checksum can only be verified *after* the entire frame has been read
    /// (and returned!).
    ///
    /// Content checksums are enabled by default.
    pub fn content_checksum(&mut self, v: bool) -> &mut Self {
        self.content_checksum = v;
        self
    }

    /// Announces the total number of bytes a streaming session is going to receive.
    ///
    /// The size is written to the frame header even when the first block has to be emitted before
    /// the end of the input is known. Feeding more or fewer bytes fails the session.
    pub fn pledged_content_size(&mut self, v: Option<u64>) -> &mut Self {
        self.pledged_content_size = v;
        self
    }

    /// A dictionary is a constant slice of bytes shared by the compressing and decompressing party.
    /// The compressor may reference it as if it had been part of the content right before the first byte.
    ///
    /// The dictionary id is written to the frame header so the decompressor knows which dictionary to use.
    /// Only the trailing window of the dictionary is ever referenced.
    ///
    /// By default, no dictionary is used.
    pub fn dictionary(&mut self, id: u32, dict: &'a [u8]) -> &mut Self {
        self.dictionary_id = Some(id);
        self.dictionary = Some(dict);
        self
    }

    /// Starts a streaming compression session with these settings.
    #[throws]
    pub fn encoder(&self) -> Encoder {
        Encoder::new(self)?
    }

    /// Wraps `writer` so everything written to it comes out compressed.
    #[throws]
    pub fn writer<W: Write>(&self, writer: W) -> FrameWriter<W> {
        FrameWriter {
            inner: writer,
            encoder: self.encoder()?,
            buffer: Vec::new(),
        }
    }

    /// Compresses everything `reader` yields into a single frame.
    #[throws]
    pub fn compress_stream<R: Read, W: Write>(&self, mut reader: R, mut writer: W) {
        let mut encoder = self.encoder()?;
        let chunk_size = block_max(1 << self.window_log) as u64;
        let mut in_buffer = Vec::with_capacity(chunk_size as usize);
        let mut out_buffer = Vec::new();
        loop {
            // We basically want read_exact semantics, except at the end.
            in_buffer.clear();
            reader.by_ref().take(chunk_size).read_to_end(&mut in_buffer).map_err(Error::ReadError)?;
            if in_buffer.is_empty() {
                break;
            }

            out_buffer.clear();
            encoder.feed(&in_buffer, &mut out_buffer)?;
            writer.write_all(&out_buffer)?;
        }

        out_buffer.clear();
        encoder.finish(&mut out_buffer)?;
        writer.write_all(&out_buffer)?;
    }
}

/// A streaming compression session producing exactly one frame.
///
/// Input handed to `feed` is buffered until a full block is available, so memory use is bounded by
/// the window plus one block no matter how long the stream is. The block that turns out to be the last
/// one is only emitted by `finish`.
pub struct Encoder {
    session: Option<Session>,
}

struct Session {
    window_log: u8,
    window_size: usize,
    block_size: usize,
    content_checksum: bool,
    pledged_content_size: Option<u64>,
    dictionary_id: Option<u32>,
    blocks: BlockEncoder,
    /// The window followed by the pending input. Everything before `cursor` has been emitted.
    history: Vec<u8>,
    cursor: usize,
    /// Absolute position of `history[0]`.
    base: u64,
    hasher: XxHash64,
    consumed: u64,
    header_written: bool,
}

impl Encoder {
    #[throws]
    pub fn new(settings: &CompressionSettings) -> Self {
        if settings.window_log < MIN_WINDOW_LOG || settings.window_log > MAX_WINDOW_LOG {
            throw!(Error::InvalidWindowLog(settings.window_log));
        }
        if settings.level < 1 || settings.level > 9 {
            throw!(Error::InvalidLevel(settings.level));
        }
        if settings.min_match < 3 || settings.min_match > 7 {
            throw!(Error::InvalidMinMatch(settings.min_match));
        }

        let window_size = 1usize << settings.window_log;
        let block_size = block_max(window_size as u64);
        let matcher = MatchFinder::new(window_size, 1 << (settings.level - 1), settings.min_match);
        let mut blocks = BlockEncoder::new(matcher);

        let mut history = Vec::with_capacity(window_size.min(1 << 20) + block_size + 1);
        if let Some(dict) = settings.dictionary {
            history.extend_from_slice(&dict[dict.len().saturating_sub(window_size)..]);
            blocks.prime(&history, 0);
        }

        Encoder {
            session: Some(Session {
                window_log: settings.window_log,
                window_size,
                block_size,
                content_checksum: settings.content_checksum,
                pledged_content_size: settings.pledged_content_size,
                dictionary_id: settings.dictionary_id,
                blocks,
                cursor: history.len(),
                history,
                base: 0,
                hasher: XxHash64::with_seed(0),
                consumed: 0,
                header_written: false,
            }),
        }
    }

    /// Compresses `input`, appending whatever output is ready to `output`.
    ///
    /// Any error ends the session.
    pub fn feed(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::ClosedSession)?;
        let result = session.feed(input, output);
        if result.is_err() {
            self.session = None;
        }
        result
    }

    /// Emits the last block and the checksum. The session is closed afterwards, whatever the outcome.
    pub fn finish(&mut self, output: &mut Vec<u8>) -> Result<(), Error> {
        let mut session = self.session.take().ok_or(Error::ClosedSession)?;
        session.finish(output)
    }

    /// Drops all buffered state. Later calls fail with `ClosedSession`.
    pub fn abort(&mut self) {
        if self.session.take().is_some() {
            debug!("compression session aborted");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }
}

impl Session {
    #[throws]
    fn feed(&mut self, mut input: &[u8], output: &mut Vec<u8>) {
        self.consumed += input.len() as u64;
        if let Some(pledged) = self.pledged_content_size {
            if self.consumed > pledged {
                throw!(Error::PledgedSizeMismatch { pledged, actual: self.consumed });
            }
        }
        self.hasher.write(input);

        while !input.is_empty() {
            // one byte more than a block, so we know the block isn't the last one
            let room = self.block_size + 1 - (self.history.len() - self.cursor);
            let (head, rest) = input.split_at(room.min(input.len()));
            self.history.extend_from_slice(head);
            input = rest;

            if self.history.len() - self.cursor > self.block_size {
                self.emit_block(self.cursor + self.block_size, false, output)?;
            }
        }
    }

    #[throws]
    fn finish(&mut self, output: &mut Vec<u8>) {
        if let Some(pledged) = self.pledged_content_size {
            if self.consumed != pledged {
                throw!(Error::PledgedSizeMismatch { pledged, actual: self.consumed });
            }
        }

        self.emit_block(self.history.len(), true, output)?;
        if self.content_checksum {
            output.write_u32::<LE>(self.hasher.finish() as u32)?;
        }
        debug!("frame finished: {} bytes of content", self.consumed);
    }

    /// Compresses `history[cursor..end]` as the next block and slides the window past it.
    #[throws]
    fn emit_block(&mut self, end: usize, last: bool, output: &mut Vec<u8>) {
        if !self.header_written {
            // all input is known by the time the last block is emitted
            let content_size = if last { Some(self.consumed) } else { self.pledged_content_size };
            let header = FrameHeader::new(self.window_log, content_size, self.dictionary_id, self.content_checksum);
            debug!("frame started: {:?}", header);
            header.write(&mut *output)?;
            self.header_written = true;
        }

        self.blocks.encode(&self.history[..end], self.cursor, self.base, last, output)?;
        self.cursor = end;

        // keep the window, but don't shift the buffer after every block
        if self.cursor > 2 * self.window_size + self.block_size {
            let excess = self.cursor - self.window_size;
            self.history.drain(..excess);
            self.cursor -= excess;
            self.base += excess as u64;
        }
        if last {
            self.history = Vec::new();
        }
    }
}

/// Compresses everything written to it into a single frame.
///
/// Call `finish` when you are done, otherwise the frame is never completed.
pub struct FrameWriter<W: Write> {
    inner: W,
    encoder: Encoder,
    buffer: Vec<u8>,
}

impl<W: Write> FrameWriter<W> {
    /// Completes the frame and returns the inner writer.
    #[throws]
    pub fn finish(mut self) -> W {
        self.buffer.clear();
        self.encoder.finish(&mut self.buffer)?;
        self.inner.write_all(&self.buffer)?;
        self.inner.flush()?;
        self.inner
    }

    pub fn get_ref(&self) -> &W { &self.inner }

    /// Stops compressing without completing the frame. Whatever was written so far is not decodable.
    pub fn abort(mut self) -> W {
        self.encoder.abort();
        self.inner
    }
}

impl<W: Write> Write for FrameWriter<W> {
    #[throws(io::Error)]
    fn write(&mut self, buf: &[u8]) -> usize {
        self.buffer.clear();
        self.encoder.feed(buf, &mut self.buffer)?;
        self.inner.write_all(&self.buffer)?;
        buf.len()
    }

    /// Flushes the inner writer. Blocks are only emitted once they are complete, so this does not
    /// force pending input out.
    #[throws(io::Error)]
    fn flush(&mut self) {
        self.inner.flush()?;
    }
}
