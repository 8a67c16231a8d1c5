
//! Describes the format of a compressed surface: geometry, components,
//! bit depths, addressing, and all sizes derived from those.

pub mod layout;
pub mod header;

pub use self::layout::{SuperblockLayout, Subsampling, SubblockPosition};

use ::smallvec::SmallVec;
use crate::error::{Error, Result, UnitResult};
use crate::math::*;


/// Size of one superblock header in bytes.
pub const HEADER_BYTE_SIZE: usize = 16;

/// The body buffer of tiled surfaces starts at a multiple of this many bytes.
pub const TILED_BODY_ALIGNMENT: u64 = 4096;

/// The maximum superblock payload is rounded up to a multiple of this many bytes.
pub const PAYLOAD_ALIGNMENT: u64 = 128;

/// Compressed bit depths are limited by the width of the root bit count field.
pub const MAX_COMPRESSED_BITS: u32 = 17;


/// Where superblock payloads are placed in the body buffer,
/// and which placement rules a decoder verifies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AddressingMode {

    /// Payloads are packed back to back in raster order.
    Linear,

    /// Packed like `Linear`, but the payloads of each horizontal stripe
    /// must stay within the stripe's share of the body buffer.
    Striped {

        /// Height of one stripe in pixels.
        stripe_height: usize,
    },

    /// Each superblock owns a payload slot of the maximum payload size,
    /// selected by its header index.
    Sparse,

    /// Headers are grouped in tiles of superblocks,
    /// and each tile owns a contiguous paging region of the body buffer.
    Tiled,
}

/// A group of components that is coded together in each subblock.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PlaneDescription {

    /// Index of the first component in this plane.
    pub first_component: usize,

    /// Number of components in this plane.
    pub component_count: usize,

    /// Byte size of one subblock of this plane stored without compression.
    pub uncompressed_size: usize,

    /// Header size codes of this plane are multiplied by this to get the byte size.
    pub size_multiplier: usize,
}

/// The immutable format of one frame.
/// Constructed once per frame, then shared by all codec calls.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDescriptor {

    /// Width and height of the visible image in pixels.
    pub size: Vec2<usize>,

    /// Size and subblock order of each superblock.
    pub layout: SuperblockLayout,

    /// Number of superblocks horizontally and vertically.
    pub superblock_count: Vec2<usize>,

    /// One or two planes, depending on subsampling.
    pub planes: SmallVec<[PlaneDescription; 2]>,

    /// Total number of components, between 1 and 4.
    pub component_count: usize,

    /// Bit depth of each component before compression. Unused components are zero.
    pub input_bits: [u32; 4],

    /// Bit depth of each component inside the compressed trees.
    /// Chroma is one bit wider than the input when the color transform is used.
    pub compressed_bits: [u32; 4],

    /// The value that a compressed subblock can signal without storing it.
    pub default_color: [u32; 4],

    /// Whether RGB is converted to YUV before compression.
    pub color_transform: bool,

    /// Where payloads are placed in the body buffer.
    pub addressing: AddressingMode,

    /// The second half of each superblock payload starts
    /// at half the maximum payload size.
    pub block_split: bool,

    /// Number of pixels hidden at the left and top of the first superblocks.
    pub crop: Vec2<usize>,

    /// Copy codes are forbidden on the first subblock of each 8×8 region.
    pub disable_copies_crossing_8x8: bool,
}


impl FrameDescriptor {

    /// Derive the complete format description from the basic format parameters.
    /// The number of components is the length of `input_bits`.
    pub fn new(size: Vec2<usize>, layout: SuperblockLayout, input_bits: &[u32], color_transform: bool) -> Result<Self> {
        let component_count = input_bits.len();
        let subsampling = layout.subsampling();

        if size.0 == 0 || size.1 == 0 {
            return Err(Error::invalid("frame size must not be zero"));
        }

        if component_count == 0 || component_count > 4 {
            return Err(Error::unsupported("component count must be between 1 and 4"));
        }

        if input_bits.iter().any(|&bits| bits == 0 || bits > 16) {
            return Err(Error::unsupported("component bit depth must be between 1 and 16"));
        }

        if subsampling != Subsampling::None && component_count != 3 {
            return Err(Error::invalid("subsampled layouts require exactly three components"));
        }

        if color_transform {
            if component_count < 3 || subsampling != Subsampling::None {
                return Err(Error::unsupported("color transform requires three or four components without subsampling"));
            }

            if input_bits[0] != input_bits[1] || input_bits[2] != input_bits[1] {
                return Err(Error::unsupported("color transform requires equal red, green and blue bit depths"));
            }
        }

        let mut bits = [0_u32; 4];
        bits[.. component_count].copy_from_slice(input_bits);

        let uncompressed_size = |components: &[u32]| -> usize {
            (16 * components.iter().sum::<u32>() as usize + 7) >> 3
        };

        let mut compressed_bits = bits;
        let planes: SmallVec<[PlaneDescription; 2]> = match subsampling {
            Subsampling::None => {
                if color_transform {
                    compressed_bits[0] = bits[1];
                    compressed_bits[1] = bits[1] + 1;
                    compressed_bits[2] = bits[1] + 1;
                }

                let total_bits = bits.iter().sum::<u32>() as usize;

                smallvec::smallvec![ PlaneDescription {
                    first_component: 0,
                    component_count,
                    uncompressed_size: uncompressed_size(&bits),
                    size_multiplier: ((2 * total_bits + 63) / 64).max(1),
                } ]
            },

            Subsampling::Yuv420 | Subsampling::Yuv422 => {
                let narrow_chroma = bits[1] <= 8;

                let (luma_multiplier, chroma_multiplier) = match (subsampling, narrow_chroma) {
                    (Subsampling::Yuv420, true) => (1, 1),
                    (Subsampling::Yuv420, false) => (1, 2),
                    (_, true) => (1, 2),
                    (_, false) => (2, 3),
                };

                smallvec::smallvec![
                    PlaneDescription {
                        first_component: 0, component_count: 1,
                        uncompressed_size: uncompressed_size(&bits[0 .. 1]),
                        size_multiplier: luma_multiplier,
                    },
                    PlaneDescription {
                        first_component: 1, component_count: 2,
                        uncompressed_size: uncompressed_size(&bits[1 .. 3]),
                        size_multiplier: chroma_multiplier,
                    },
                ]
            },
        };

        let mut default_color = [0_u32; 4];
        for (component, default) in default_color.iter_mut().enumerate() {
            let depth = compressed_bits[component];

            *default = match component {
                0 | 3 => (1 << depth) - 1,
                _ if depth == 0 => 0,
                _ => 1 << (depth - 1),
            };
        }

        let superblock_size = layout.superblock_size();

        Ok(FrameDescriptor {
            size, layout, planes, component_count, compressed_bits, default_color, color_transform,
            superblock_count: Vec2(
                RoundingMode::Up.divide(size.0, superblock_size.0),
                RoundingMode::Up.divide(size.1, superblock_size.1),
            ),
            input_bits: bits,
            addressing: AddressingMode::Linear,
            block_split: false,
            crop: Vec2(0, 0),
            disable_copies_crossing_8x8: subsampling != Subsampling::None,
        })
    }

    /// Use a different payload placement.
    pub fn with_addressing(self, addressing: AddressingMode) -> Result<Self> {
        if let AddressingMode::Striped { stripe_height } = addressing {
            if stripe_height == 0 {
                return Err(Error::invalid("stripe height must not be zero"));
            }
        }

        Ok(FrameDescriptor { addressing, ..self })
    }

    /// Place the second half of each superblock payload at half the maximum payload size.
    pub fn with_block_split(self, block_split: bool) -> Self {
        FrameDescriptor { block_split, ..self }
    }

    /// Hide pixels at the left and top edge. The superblock grid grows to cover the cropped pixels.
    pub fn with_crop(self, crop: Vec2<usize>) -> Result<Self> {
        let superblock_size = self.layout.superblock_size();

        if crop.0 >= superblock_size.0 || crop.1 >= superblock_size.1 {
            return Err(Error::invalid("crop must be smaller than one superblock"));
        }

        let covered = self.size + crop;
        Ok(FrameDescriptor {
            crop,
            superblock_count: Vec2(
                RoundingMode::Up.divide(covered.0, superblock_size.0),
                RoundingMode::Up.divide(covered.1, superblock_size.1),
            ),
            ..self
        })
    }

    /// Allow or forbid copy codes on the first subblock of each 8×8 region.
    pub fn with_copies_crossing_8x8(self, allow: bool) -> Self {
        FrameDescriptor { disable_copies_crossing_8x8: !allow, ..self }
    }

    /// Validate the fields of a descriptor that was modified directly.
    pub fn validate(&self) -> UnitResult {
        if self.planes.is_empty() || self.component_count == 0 || self.component_count > 4 {
            return Err(Error::invalid("descriptor has no components"));
        }

        if self.compressed_bits.iter().any(|&bits| bits > MAX_COMPRESSED_BITS) {
            return Err(Error::unsupported("compressed bit depth too large"));
        }

        if self.superblock_count.area() == 0 {
            return Err(Error::invalid("descriptor covers no superblocks"));
        }

        Ok(())
    }


    /// How chroma is stored.
    pub fn subsampling(&self) -> Subsampling {
        self.layout.subsampling()
    }

    /// Pixel size of one superblock.
    pub fn superblock_size(&self) -> Vec2<usize> {
        self.layout.superblock_size()
    }

    /// Number of subblock slots per superblock.
    pub fn subblock_count(&self) -> usize {
        self.subsampling().subblock_count()
    }

    /// The plane that contains the component.
    pub fn plane_of_component(&self, component: usize) -> usize {
        self.planes.iter()
            .position(|plane| component >= plane.first_component && component < plane.first_component + plane.component_count)
            .unwrap_or(0)
    }

    /// The resolution divisor of a plane relative to the full image.
    pub fn plane_divisor(&self, plane: usize) -> Vec2<usize> {
        if plane == 0 { Vec2(1, 1) } else { self.subsampling().chroma_divisor() }
    }

    /// Pixel size of the samples of a component. Subsampled planes round up.
    pub fn component_size(&self, component: usize) -> Vec2<usize> {
        let divisor = self.plane_divisor(self.plane_of_component(component));
        Vec2(
            RoundingMode::Up.divide(self.size.0, divisor.0),
            RoundingMode::Up.divide(self.size.1, divisor.1),
        )
    }

    /// Whether the slot is the last one before the jump to the second payload half.
    pub fn is_last_before_split(&self, subblock: usize) -> bool {
        self.block_split && subblock + 1 == self.subsampling().split_index()
    }

    /// Number of superblocks per header tile in each direction.
    /// One unless the surface is tiled.
    pub fn tile_size(&self) -> Vec2<usize> {
        match self.addressing {
            AddressingMode::Tiled => {
                let total_bits: u32 = self.input_bits.iter().sum();
                let size = if total_bits > 32 { 4 } else { 8 };
                Vec2(size, size)
            },

            _ => Vec2(1, 1),
        }
    }

    /// The superblock grid, rounded up to whole header tiles.
    pub fn tiled_superblock_count(&self) -> Vec2<usize> {
        let tiles = self.tile_size();
        Vec2(
            RoundingMode::Up.divide(self.superblock_count.0, tiles.0) * tiles.0,
            RoundingMode::Up.divide(self.superblock_count.1, tiles.1) * tiles.1,
        )
    }

    /// Byte size of the header area, including padding superblocks of incomplete tiles.
    pub fn header_area_size(&self) -> u64 {
        (self.tiled_superblock_count().area() * HEADER_BYTE_SIZE) as u64
    }

    /// Byte offset where the body buffer starts.
    pub fn body_start(&self) -> u64 {
        let header_area = self.header_area_size();

        match self.addressing {
            AddressingMode::Tiled => round_up_to_multiple(header_area, TILED_BODY_ALIGNMENT),
            _ => header_area,
        }
    }

    /// Byte size of one superblock stored entirely uncompressed.
    pub fn uncompressed_superblock_size(&self) -> u64 {
        self.layout.subblock_order().iter()
            .map(|position| self.planes[position.plane].uncompressed_size as u64)
            .sum()
    }

    /// The largest payload one superblock may have, rounded up to 128 bytes.
    pub fn max_superblock_payload_size(&self) -> u64 {
        round_up_to_multiple(self.uncompressed_superblock_size(), PAYLOAD_ALIGNMENT)
    }

    /// A buffer of this size can hold any encoding of the frame.
    pub fn max_frame_size(&self) -> u64 {
        let body = self.tiled_superblock_count().area() as u64 * self.max_superblock_payload_size();
        self.body_start() + body
    }

    /// The byte size of all superblocks stored uncompressed, without headers.
    pub fn uncompressed_frame_size(&self) -> u64 {
        self.superblock_count.area() as u64 * self.uncompressed_superblock_size()
    }

    /// Whether each superblock is placed in its own fixed payload slot.
    pub fn uses_payload_slots(&self) -> bool {
        self.block_split || matches!(self.addressing, AddressingMode::Sparse | AddressingMode::Tiled)
    }
}
