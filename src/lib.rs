
//! Encode, decode and verify AFBC compressed pixel surfaces.
//!
//! A surface consists of one 16 byte header per superblock, followed by a body buffer
//! with the payload of each superblock. Each superblock is split into 4×4 subblocks,
//! which are stored as minimum value quadtrees, without compression, or as copies.
//!
//! Start with a `meta::FrameDescriptor`, then use `image::decode_frame`
//! or `image::encode_frame`. The `block` and `compression` modules
//! expose the individual superblock and subblock steps.

#![forbid(unsafe_code)]


pub mod io;
pub mod math;
pub mod address;
pub mod block;
pub mod compression;
pub mod conformance;
pub mod meta;
pub mod image;
pub mod error;


pub mod prelude {

    // main exports
    pub use crate::meta::{FrameDescriptor, AddressingMode, SuperblockLayout};

    // core data types
    pub use crate::image::{
        decode_frame, encode_frame,
        DecodeOptions, EncodeOptions,
        DecodedFrame, EncodedFrame,
        Frame, Plane,
    };

    pub use crate::conformance::{ConformanceChecks, ConformanceReport, Violation};
    pub use crate::block::BlockStatistics;

    // secondary data types
    pub use crate::meta;
    pub use crate::error;
    pub use crate::math::Vec2;
}
