
//! Encode one superblock: compress each subblock slot into the body buffer,
//! replace repeated subblocks by copies, and write the header.

use smallvec::SmallVec;
use super::{BlockStatistics, Superblock};
use crate::compression::{encode_subblock, SubblockSamples};
use crate::error::{Error, Result, u64_to_usize, usize_to_u32};
use crate::image::EncodeOptions;
use crate::meta::{FrameDescriptor, HEADER_BYTE_SIZE};
use crate::meta::header::{SizeCodes, SuperblockHeader, COPY_CODE, UNCOMPRESSED_CODE};


/// Encode a superblock into the frame buffer.
/// The header is written to header slot `header_index`,
/// and the payload starts at `body_position`.
/// Returns the body position after the payload, which is unchanged
/// for solid color superblocks.
pub fn encode_superblock(
    descriptor: &FrameDescriptor, superblock: &Superblock, options: &EncodeOptions,
    bytes: &mut [u8], header_index: usize, body_position: u64, statistics: &mut BlockStatistics,
) -> Result<u64>
{
    let header_offset = header_index * HEADER_BYTE_SIZE;

    if options.solid_color && descriptor.layout.allows_solid_color() {
        if let Some(color) = superblock.solid_color(descriptor) {
            let header = SuperblockHeader::Solid { body_base: 0, color };
            write_header(bytes, header_offset, &header.to_bytes(descriptor)?)?;

            statistics.solid_superblocks += 1;
            return Ok(body_position);
        }
    }

    let body_base = usize_to_u32(
        u64_to_usize(body_position, "body position too large for this machine")?,
        "body position does not fit into a header"
    )?;

    let subsampling = descriptor.subsampling();
    let code_limit = 1_usize << subsampling.size_code_bits();
    let half_payload = body_position + descriptor.max_superblock_payload_size() / 2;
    let copy_rows_disabled = options.disable_copy_rows || descriptor.block_split;

    let mut position = body_position;
    let mut size_codes: SizeCodes = SmallVec::with_capacity(subsampling.subblock_count());
    let mut previous_samples: [Option<SubblockSamples>; 2] = [None, None];
    let mut previous_color: [Option<u64>; 2] = [None, None];

    for (slot, subblock_position) in descriptor.layout.subblock_order().iter().enumerate() {
        let plane_index = subblock_position.plane;
        let plane = &descriptor.planes[plane_index];
        let samples = superblock.subblock(descriptor, *subblock_position);

        let same_pattern = options.copy_all_patterns && previous_samples[plane_index] == Some(samples);
        previous_samples[plane_index] = Some(samples);

        let start = u64_to_usize(position, "body position too large for this machine")?;
        let output = bytes.get_mut(start ..)
            .ok_or_else(|| Error::overflow("payload starts after the end of the buffer"))?;

        let encoded = encode_subblock(descriptor, plane_index, &samples, options, output)?;
        let same_color = encoded.color.is_some() && encoded.color == previous_color[plane_index];
        previous_color[plane_index] = encoded.color;

        let starts_row = slot == subsampling.split_index() || slot == subsampling.alternate_split_index();
        let copy_forbidden =
            (copy_rows_disabled && starts_row)
            || (descriptor.disable_copies_crossing_8x8 && subsampling.is_first_in_8x8(slot));

        let code = if (same_pattern || same_color) && !copy_forbidden {
            output[.. encoded.size].iter_mut().for_each(|byte| *byte = 0);
            statistics.copy_subblocks += 1;
            COPY_CODE
        }
        else {
            let code =
                if encoded.uncompressed { usize::from(UNCOMPRESSED_CODE) }
                else { (encoded.size / plane.size_multiplier).max(2) };

            if code >= code_limit {
                return Err(Error::unsupported(format!("subblock size code {} does not fit into the header", code)));
            }

            if encoded.uncompressed { statistics.uncompressed_subblocks += 1; }
            else { statistics.compressed_subblocks += 1; }

            statistics.payload_bytes += encoded.size as u64;
            position += encoded.size as u64;
            code as u8
        };

        size_codes.push(code);

        if descriptor.is_last_before_split(slot) {
            if position > half_payload {
                return Err(Error::invalid("first half of the split payload is too large"));
            }

            position = half_payload;
        }
    }

    let header = SuperblockHeader::Payload { body_base, size_codes };
    write_header(bytes, header_offset, &header.to_bytes(descriptor)?)?;
    Ok(position)
}

fn write_header(bytes: &mut [u8], offset: usize, header: &[u8; HEADER_BYTE_SIZE]) -> Result<()> {
    bytes.get_mut(offset .. offset + HEADER_BYTE_SIZE)
        .ok_or_else(|| Error::overflow("superblock header is outside the buffer"))?
        .copy_from_slice(header);

    Ok(())
}
