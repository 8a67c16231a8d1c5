
//! Maps superblock grid coordinates to header positions and payload regions.
//! Without tiling, headers are stored in raster order.
//! With tiling, headers are grouped in tiles of 8×8 or 4×4 superblocks,
//! and the superblocks inside a tile follow a swizzled order.

use std::ops::Range;
use crate::math::*;
use crate::meta::{AddressingMode, FrameDescriptor, SuperblockLayout, HEADER_BYTE_SIZE};


/// Computes header indices and payload regions of a frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AddressResolver {
    layout: SuperblockLayout,
    tile_size: Vec2<usize>,
    tile_columns: usize,
    body_start: u64,
    max_payload: u64,
    tiled: bool,
}

impl AddressResolver {

    /// Precompute the tile grid of the frame.
    pub fn new(descriptor: &FrameDescriptor) -> Self {
        let tile_size = descriptor.tile_size();

        AddressResolver {
            layout: descriptor.layout,
            tile_columns: descriptor.tiled_superblock_count().0 / tile_size.0,
            body_start: descriptor.body_start(),
            max_payload: descriptor.max_superblock_payload_size(),
            tiled: descriptor.addressing == AddressingMode::Tiled,
            tile_size,
        }
    }

    /// Number of superblocks in one header tile.
    pub fn superblocks_per_tile(&self) -> usize {
        self.tile_size.area()
    }

    /// Index of the header tile that contains the superblock.
    pub fn tile_index(&self, superblock: Vec2<usize>) -> usize {
        let Vec2(x, y) = superblock;
        (y / self.tile_size.1) * self.tile_columns + x / self.tile_size.0
    }

    /// Position of the header in the header buffer, in headers.
    pub fn header_index(&self, superblock: Vec2<usize>) -> usize {
        let per_tile = self.superblocks_per_tile();
        let swizzled = self.layout.swizzle(superblock) & (per_tile - 1);
        self.tile_index(superblock) * per_tile | swizzled
    }

    /// Byte offset of the header in the header buffer.
    pub fn header_offset(&self, superblock: Vec2<usize>) -> usize {
        self.header_index(superblock) * HEADER_BYTE_SIZE
    }

    /// Start of the payload slot that belongs to the superblock in sparse placement.
    pub fn payload_slot(&self, superblock: Vec2<usize>) -> u64 {
        self.body_start + self.header_index(superblock) as u64 * self.max_payload
    }

    /// The body region that all payloads of the superblock's header tile must stay in.
    /// Covers the whole body if the frame is not tiled.
    pub fn paging_tile(&self, superblock: Vec2<usize>) -> Option<Range<u64>> {
        if !self.tiled { return None; }

        let tile_bytes = self.superblocks_per_tile() as u64 * self.max_payload;
        let start = self.body_start + self.tile_index(superblock) as u64 * tile_bytes;
        Some(start .. start + tile_bytes)
    }

    /// Whether the superblock has the first header of its tile.
    pub fn is_first_in_tile(&self, superblock: Vec2<usize>) -> bool {
        self.header_index(superblock) % self.superblocks_per_tile() == 0
    }
}
