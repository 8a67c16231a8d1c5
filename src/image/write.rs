
//! Encode a complete frame into a compressed buffer.

use super::{EncodeOptions, Frame};
use crate::address::AddressResolver;
use crate::block::BlockStatistics;
use crate::block::writer::encode_superblock;
use crate::error::{Result, u64_to_usize};
use crate::math::Vec2;
use crate::meta::{AddressingMode, FrameDescriptor};


/// The result of encoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {

    /// Headers and body. The length is the frame size:
    /// the maximum frame size for tiled frames, otherwise the end of the last payload.
    pub bytes: Vec<u8>,

    /// What the buffer consists of.
    pub statistics: BlockStatistics,
}


/// Encode all superblocks of a frame in raster order.
/// Payloads are packed back to back, or placed in fixed slots
/// for sparse, tiled and split frames.
pub fn encode_frame(descriptor: &FrameDescriptor, frame: &Frame, options: EncodeOptions) -> Result<EncodedFrame> {
    descriptor.validate()?;
    frame.validate(descriptor)?;

    let resolver = AddressResolver::new(descriptor);
    let max_frame_size = descriptor.max_frame_size();
    let mut bytes = vec![0_u8; u64_to_usize(max_frame_size, "frame too large for this machine")?];

    let mut statistics = BlockStatistics::default();
    let payload_slots = descriptor.uses_payload_slots();
    let mut body_position = descriptor.body_start();
    let mut end = body_position;

    for y in 0 .. descriptor.superblock_count.1 {
        for x in 0 .. descriptor.superblock_count.0 {
            let position = Vec2(x, y);
            let superblock = frame.extract_superblock(descriptor, position);
            let start = if payload_slots { resolver.payload_slot(position) } else { body_position };

            let next = encode_superblock(
                descriptor, &superblock, &options, &mut bytes,
                resolver.header_index(position), start, &mut statistics
            ).map_err(|error| error.at_superblock(position, None))?;

            if !payload_slots { body_position = next; }
            end = end.max(next);
        }
    }

    let frame_size = match descriptor.addressing {
        AddressingMode::Tiled => max_frame_size,
        _ => end,
    };

    bytes.truncate(u64_to_usize(frame_size, "frame too large for this machine")?);
    log::debug!("encoded {} superblocks into {} bytes", descriptor.superblock_count.area(), frame_size);

    Ok(EncodedFrame { bytes, statistics })
}
