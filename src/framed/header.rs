#![allow(non_upper_case_globals)]

use std::io::{self, Write};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use bitflags::bitflags;
use thiserror::Error;
use fehler::{throw, throws};

use super::{MAGIC, MIN_WINDOW_LOG};

bitflags! {
    /// The single-bit fields of the frame header descriptor.
    ///
    /// ```text
    /// Bit 7-6: content size field size
    /// Bit 5:   single segment
    /// Bit 4:   unused
    /// Bit 3:   reserved, must be zero
    /// Bit 2:   content checksum
    /// Bit 1-0: dictionary id field size
    /// ```
    pub struct Flags: u8 {
        const SingleSegment   = 0b0010_0000;
        const Unused          = 0b0001_0000;
        const Reserved        = 0b0000_1000;
        const ContentChecksum = 0b0000_0100;
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("reserved bits in frame descriptor set")]
    ReservedBitsSet,
    #[error("frame header is incomplete")]
    Truncated,
}

impl Flags {
    #[throws(ParseError)]
    pub fn parse(descriptor: u8) -> Self {
        let flags = Flags::from_bits_truncate(descriptor);
        if flags.contains(Flags::Reserved) {
            throw!(ParseError::ReservedBitsSet);
        }
        flags
    }

    pub fn single_segment(&self)   -> bool { self.contains(Flags::SingleSegment) }
    pub fn content_checksum(&self) -> bool { self.contains(Flags::ContentChecksum) }
}

fn content_size_bytes(descriptor: u8) -> usize {
    match descriptor >> 6 {
        0 if descriptor & Flags::SingleSegment.bits() != 0 => 1,
        0 => 0,
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

fn dictionary_id_bytes(descriptor: u8) -> usize {
    match descriptor & 0b11 {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    }
}

/// Everything the frame header says about a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// How far back blocks may reference. In single-segment frames this is the content size.
    pub window_size: u64,
    pub content_size: Option<u64>,
    pub dictionary_id: Option<u32>,
    pub content_checksum: bool,
    /// The whole content is one segment: no window descriptor, content size is mandatory.
    pub single_segment: bool,
}

impl FrameHeader {
    /// Upper bound on the header size, magic number included.
    pub const MAX_SIZE: usize = 4 + 1 + 1 + 4 + 8;

    /// A header for a frame compressed with a `2^window_log` window.
    ///
    /// Frames whose content size is known and fits into the window are written in single-segment mode,
    /// unless they depend on a dictionary (whose bytes live outside the content).
    pub fn new(window_log: u8, content_size: Option<u64>, dictionary_id: Option<u32>, content_checksum: bool) -> Self {
        let window_size = 1u64 << window_log;
        match content_size {
            Some(size) if dictionary_id.is_none() && size <= window_size => FrameHeader {
                window_size: size,
                content_size,
                dictionary_id,
                content_checksum,
                single_segment: true,
            },
            _ => FrameHeader {
                window_size,
                content_size,
                dictionary_id,
                content_checksum,
                single_segment: false,
            },
        }
    }

    fn descriptor(&self) -> u8 {
        let fcs_flag = match self.content_size {
            None => 0,
            Some(s) if s < 256 && self.single_segment => 0,
            Some(s) if s >= 256 && s < 65536 + 256 => 1,
            Some(s) if s <= u64::from(u32::MAX) => 2,
            Some(_) => 3,
        };
        let dict_flag = match self.dictionary_id {
            None => 0,
            Some(id) if id < 256 => 1,
            Some(id) if id < 65536 => 2,
            Some(_) => 3,
        };

        let mut flags = Flags::empty();
        if self.single_segment {
            flags |= Flags::SingleSegment;
        }
        if self.content_checksum {
            flags |= Flags::ContentChecksum;
        }
        (fcs_flag << 6) | flags.bits() | dict_flag
    }

    /// Exponent/mantissa encoding; only exact for sizes the descriptor can express.
    fn window_descriptor(&self) -> u8 {
        let log = (63 - self.window_size.max(1).leading_zeros()).max(u32::from(MIN_WINDOW_LOG));
        let base = 1u64 << log;
        let mantissa = (self.window_size.saturating_sub(base) / (base / 8)).min(7) as u8;
        (((log - u32::from(MIN_WINDOW_LOG)) as u8) << 3) | mantissa
    }

    /// Writes the header, magic number first.
    #[throws(io::Error)]
    pub fn write<W: Write>(&self, mut writer: W) {
        let descriptor = self.descriptor();
        writer.write_u32::<LE>(MAGIC)?;
        writer.write_u8(descriptor)?;
        if !self.single_segment {
            writer.write_u8(self.window_descriptor())?;
        }
        if let Some(id) = self.dictionary_id {
            writer.write_uint::<LE>(u64::from(id), dictionary_id_bytes(descriptor))?;
        }
        if let Some(size) = self.content_size {
            match content_size_bytes(descriptor) {
                2 => writer.write_u16::<LE>((size - 256) as u16)?,
                n => writer.write_uint::<LE>(size, n)?,
            }
        }
    }

    /// Length of the header after the magic number, given its first byte (the descriptor).
    pub fn required_len(descriptor: u8) -> usize {
        let window = if descriptor & Flags::SingleSegment.bits() != 0 { 0 } else { 1 };
        1 + window + dictionary_id_bytes(descriptor) + content_size_bytes(descriptor)
    }

    /// Parses the header that follows the magic number.
    #[throws(ParseError)]
    pub fn parse(data: &[u8]) -> Self {
        let mut reader = data;
        let descriptor = reader.read_u8().map_err(|_| ParseError::Truncated)?;
        let flags = Flags::parse(descriptor)?;
        if reader.len() + 1 < Self::required_len(descriptor) {
            throw!(ParseError::Truncated);
        }

        let window_size = if flags.single_segment() {
            None
        } else {
            let b = reader.read_u8().map_err(|_| ParseError::Truncated)?;
            let log = u32::from(MIN_WINDOW_LOG) + u32::from(b >> 3);
            let base = 1u64 << log;
            Some(base + (base / 8) * u64::from(b & 0b111))
        };

        let dictionary_id = match dictionary_id_bytes(descriptor) {
            0 => None,
            n => Some(reader.read_uint::<LE>(n).map_err(|_| ParseError::Truncated)? as u32),
        };

        let content_size = match content_size_bytes(descriptor) {
            0 => None,
            2 => Some(u64::from(reader.read_u16::<LE>().map_err(|_| ParseError::Truncated)?) + 256),
            n => Some(reader.read_uint::<LE>(n).map_err(|_| ParseError::Truncated)?),
        };

        FrameHeader {
            // single segment implies a content size field, so this is never 0 by accident
            window_size: window_size.or(content_size).unwrap_or(0),
            content_size,
            dictionary_id,
            content_checksum: flags.content_checksum(),
            single_segment: flags.single_segment(),
        }
    }

    /// Size of the written header, magic number included.
    pub fn encoded_len(&self) -> usize {
        4 + Self::required_len(self.descriptor())
    }
}
