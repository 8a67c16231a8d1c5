
//! Contains the subblock coding: the minimum value quadtree,
//! the reversible color transform, and the bit stream
//! layout of compressed and uncompressed subblocks.


// private modules make non-breaking changes easier
mod color;
mod decode;
mod encode;
pub mod tree;


pub use self::decode::decode_subblock;
pub use self::encode::{encode_subblock, EncodedSubblock};


/// The samples of one 4×4 subblock for up to four components.
/// Each component is stored in raster order.
/// Components of a plane start at index zero, regardless of
/// the index of the first component of the plane in the frame.
pub type SubblockSamples = [[u32; 16]; 4];

/// Compressed subblocks that need more bytes are stored uncompressed.
pub const MAX_COMPRESSED_SUBBLOCK_SIZE: usize = 256;
