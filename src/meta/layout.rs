
//! The seven superblock layouts and the fixed order
//! in which their subblocks are stored.

use crate::error::{Error, Result};
use crate::math::Vec2;


/// Where a subblock slot is located inside its superblock.
/// Chroma subblocks of subsampled layouts use chroma sample coordinates.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubblockPosition {

    /// Zero for luma or interleaved components, one for subsampled chroma.
    pub plane: usize,

    /// Horizontal sample offset inside the superblock.
    pub x: usize,

    /// Vertical sample offset inside the superblock.
    pub y: usize,
}

/// How chroma samples are reduced relative to luma.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Subsampling {

    /// All components are stored interleaved in one plane at full resolution.
    None,

    /// Chroma has half the horizontal and half the vertical resolution.
    Yuv420,

    /// Chroma has half the horizontal resolution.
    Yuv422,
}

/// The size of a superblock and the order of its subblocks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SuperblockLayout {

    /// 16×16 pixels, all components interleaved. Layout 0.
    Square,

    /// 16×16 pixels with 4:2:0 chroma. Layout 1.
    Square420,

    /// 16×16 pixels with 4:2:2 chroma. Layout 2.
    Square422,

    /// 32×8 pixels in plain raster order. Layout 3.
    WideFlat,

    /// 32×8 pixels, ordered for 16 bit per pixel formats. Layout 4.
    Wide,

    /// 32×8 pixels with 4:2:0 chroma. Layout 5.
    Wide420,

    /// 32×8 pixels with 4:2:2 chroma. Layout 6.
    Wide422,
}


/// Shorthand for the order tables.
const fn at(plane: usize, x: usize, y: usize) -> SubblockPosition {
    SubblockPosition { plane, x, y }
}

const SQUARE_ORDER: [SubblockPosition; 16] = [
    at(0,4,4),  at(0,0,4),  at(0,0,0),   at(0,4,0),
    at(0,8,0),  at(0,12,0), at(0,12,4),  at(0,8,4),
    at(0,8,8),  at(0,12,8), at(0,12,12), at(0,8,12),
    at(0,4,12), at(0,0,12), at(0,0,8),   at(0,4,8),
];

const SQUARE_420_ORDER: [SubblockPosition; 20] = [
    at(0,4,4),  at(0,0,4),  at(1,0,0), at(0,0,0),   at(0,4,0),
    at(0,8,0),  at(0,12,0), at(1,4,0), at(0,12,4),  at(0,8,4),
    at(0,8,8),  at(0,12,8), at(1,4,4), at(0,12,12), at(0,8,12),
    at(0,4,12), at(0,0,12), at(1,0,4), at(0,0,8),   at(0,4,8),
];

const SQUARE_422_ORDER: [SubblockPosition; 24] = [
    at(0,4,4),  at(1,0,4),  at(0,0,4),  at(0,0,0),   at(1,0,0),  at(0,4,0),
    at(0,8,0),  at(1,4,0),  at(0,12,0), at(0,12,4),  at(1,4,4),  at(0,8,4),
    at(0,8,8),  at(1,4,8),  at(0,12,8), at(0,12,12), at(1,4,12), at(0,8,12),
    at(0,4,12), at(1,0,12), at(0,0,12), at(0,0,8),   at(1,0,8),  at(0,4,8),
];

const WIDE_FLAT_ORDER: [SubblockPosition; 16] = [
    at(0,0,0), at(0,4,0), at(0,8,0), at(0,12,0), at(0,16,0), at(0,20,0), at(0,24,0), at(0,28,0),
    at(0,0,4), at(0,4,4), at(0,8,4), at(0,12,4), at(0,16,4), at(0,20,4), at(0,24,4), at(0,28,4),
];

const WIDE_ORDER: [SubblockPosition; 16] = [
    at(0,4,4),  at(0,0,4),  at(0,0,0),  at(0,4,0),  at(0,8,0),  at(0,12,0), at(0,12,4), at(0,8,4),
    at(0,20,4), at(0,16,4), at(0,16,0), at(0,20,0), at(0,24,0), at(0,28,0), at(0,28,4), at(0,24,4),
];

const WIDE_420_ORDER: [SubblockPosition; 20] = [
    at(0,4,4),  at(0,0,4),  at(1,0,0),  at(0,0,0),  at(0,4,0),
    at(0,8,0),  at(0,12,0), at(1,4,0),  at(0,12,4), at(0,8,4),
    at(0,20,4), at(0,16,4), at(1,8,0),  at(0,16,0), at(0,20,0),
    at(0,24,0), at(0,28,0), at(1,12,0), at(0,28,4), at(0,24,4),
];

const WIDE_422_ORDER: [SubblockPosition; 24] = [
    at(0,4,4),  at(1,0,4),  at(0,0,4),  at(0,0,0),  at(1,0,0),  at(0,4,0),
    at(0,8,0),  at(1,4,0),  at(0,12,0), at(0,12,4), at(1,4,4),  at(0,8,4),
    at(0,20,4), at(1,8,4),  at(0,16,4), at(0,16,0), at(1,8,0),  at(0,20,0),
    at(0,24,0), at(1,12,0), at(0,28,0), at(0,28,4), at(1,12,4), at(0,24,4),
];


impl SuperblockLayout {

    /// All layouts, ordered by their numeric index.
    pub const ALL: [SuperblockLayout; 7] = [
        SuperblockLayout::Square, SuperblockLayout::Square420, SuperblockLayout::Square422,
        SuperblockLayout::WideFlat, SuperblockLayout::Wide,
        SuperblockLayout::Wide420, SuperblockLayout::Wide422,
    ];

    /// Look up a layout by its numeric index.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied()
            .ok_or_else(|| Error::unsupported(format!("superblock layout {}", index)))
    }

    /// The numeric index of this layout.
    pub fn index(self) -> usize {
        match self {
            SuperblockLayout::Square => 0,
            SuperblockLayout::Square420 => 1,
            SuperblockLayout::Square422 => 2,
            SuperblockLayout::WideFlat => 3,
            SuperblockLayout::Wide => 4,
            SuperblockLayout::Wide420 => 5,
            SuperblockLayout::Wide422 => 6,
        }
    }

    /// Whether the superblock is 32×8 instead of 16×16 pixels.
    pub fn is_wide(self) -> bool {
        self.index() >= 3
    }

    /// The pixel size of one superblock.
    pub fn superblock_size(self) -> Vec2<usize> {
        if self.is_wide() { Vec2(32, 8) } else { Vec2(16, 16) }
    }

    /// How chroma is stored in this layout.
    pub fn subsampling(self) -> Subsampling {
        match self {
            SuperblockLayout::Square | SuperblockLayout::WideFlat | SuperblockLayout::Wide => Subsampling::None,
            SuperblockLayout::Square420 | SuperblockLayout::Wide420 => Subsampling::Yuv420,
            SuperblockLayout::Square422 | SuperblockLayout::Wide422 => Subsampling::Yuv422,
        }
    }

    /// Subblock slots in the order they are stored in the header and body.
    pub fn subblock_order(self) -> &'static [SubblockPosition] {
        match self {
            SuperblockLayout::Square => &SQUARE_ORDER,
            SuperblockLayout::Square420 => &SQUARE_420_ORDER,
            SuperblockLayout::Square422 => &SQUARE_422_ORDER,
            SuperblockLayout::WideFlat => &WIDE_FLAT_ORDER,
            SuperblockLayout::Wide => &WIDE_ORDER,
            SuperblockLayout::Wide420 => &WIDE_420_ORDER,
            SuperblockLayout::Wide422 => &WIDE_422_ORDER,
        }
    }

    /// Only layouts without subsampling may store a superblock as one solid color.
    pub fn allows_solid_color(self) -> bool {
        self.subsampling() == Subsampling::None
    }

    /// Interleave the low bits of the superblock coordinate.
    /// Wide layouts use `yxyyxx`, square layouts use `yxyxyx`.
    /// The result is not yet limited to the tile size.
    pub fn swizzle(self, superblock: Vec2<usize>) -> usize {
        let Vec2(x, y) = superblock;

        if self.is_wide() {
            (x & 3) | (y & 3) << 2 | (x & 4) << 2 | (y & 4) << 3
        }
        else {
            (x & 1) | (y & 1) << 1 | (x & 2) << 1 | (y & 2) << 2 | (x & 4) << 2 | (y & 4) << 3
        }
    }
}


impl Subsampling {

    /// Number of subblock slots in one superblock.
    pub fn subblock_count(self) -> usize {
        match self {
            Subsampling::None => 16,
            Subsampling::Yuv420 => 20,
            Subsampling::Yuv422 => 24,
        }
    }

    /// Width of the body base pointer field in the superblock header.
    pub fn body_base_bits(self) -> usize {
        match self {
            Subsampling::None => 32,
            Subsampling::Yuv420 => 28,
            Subsampling::Yuv422 => 32,
        }
    }

    /// Width of each subblock size field in the superblock header.
    pub fn size_code_bits(self) -> usize {
        match self {
            Subsampling::None => 6,
            Subsampling::Yuv420 => 5,
            Subsampling::Yuv422 => 4,
        }
    }

    /// The first subblock slot of the second half of a split superblock.
    pub fn split_index(self) -> usize {
        match self {
            Subsampling::None => 8,
            Subsampling::Yuv420 => 10,
            Subsampling::Yuv422 => 12,
        }
    }

    /// The first chroma slot of the second half, which also may not be a copy
    /// when copies between the halves are disabled.
    pub fn alternate_split_index(self) -> usize {
        match self {
            Subsampling::None => 8,
            Subsampling::Yuv420 => 12,
            Subsampling::Yuv422 => 13,
        }
    }

    /// Whether the subblock slot is the first one of an 8×8 pixel region.
    pub fn is_first_in_8x8(self, index: usize) -> bool {
        match self {
            Subsampling::None => index % 4 == 0,
            Subsampling::Yuv420 => index % 5 == 0 || (index >= 2 && (index - 2) % 5 == 0),
            Subsampling::Yuv422 => index % 6 == 0 || (index >= 1 && (index - 1) % 6 == 0),
        }
    }

    /// The factor by which chroma resolution is divided.
    pub fn chroma_divisor(self) -> Vec2<usize> {
        match self {
            Subsampling::None => Vec2(1, 1),
            Subsampling::Yuv420 => Vec2(2, 2),
            Subsampling::Yuv422 => Vec2(2, 1),
        }
    }
}
