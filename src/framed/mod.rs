//! The frame format.
//!
//! ```text
//! [magic:4][descriptor:1][window:0-1][dictionary id:0-4][content size:0-8][block]*[checksum:0-4]
//! ```
//!
//! Every block starts with a 3-byte header (last flag, type, size). Blocks may reference
//! data from earlier blocks of the same frame as long as it is inside the window.
//! A compressed stream may consist of several frames back to back, optionally interleaved
//! with skippable frames.

mod block;
mod compress;
mod decompress;
pub mod header;

/// The four magic bytes at the start of every frame.
pub const MAGIC: u32 = 0xFD2F_B5E7;
/// Skippable frames carry application data that decoders ignore.
/// The low nibble of their magic number is free for the application to choose.
pub const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;
pub const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;
/// No block ever regenerates more than this, whatever the window size.
pub const MAX_BLOCK_SIZE: usize = 128 * 1024;
/// The frame checksum is the low half of an XXH64 of the content.
pub const CHECKSUM_SIZE: usize = 4;

pub const MIN_WINDOW_LOG: u8 = 10;
pub const MAX_WINDOW_LOG: u8 = 27;
pub const DEFAULT_WINDOW_LOG: u8 = 20;

pub use block::{BlockHeader, BlockType};
pub use compress::*;
pub use decompress::*;
pub use header::FrameHeader;

/// Largest block a frame with this window may contain.
pub(crate) fn block_max(window_size: u64) -> usize {
    window_size.min(MAX_BLOCK_SIZE as u64) as usize
}
