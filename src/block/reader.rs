
//! Decode one superblock: parse its header, locate its subblocks,
//! and reconstruct the samples of every subblock slot.

use super::{BlockStatistics, Superblock};
use crate::address::AddressResolver;
use crate::compression::{decode_subblock, SubblockSamples};
use crate::conformance::{ConformanceReport, Violation};
use crate::error::{Error, Result, u64_to_usize};
use crate::image::DecodeOptions;
use crate::math::*;
use crate::meta::{FrameDescriptor, HEADER_BYTE_SIZE};
use crate::meta::header::{SubblockEntry, SuperblockHeader, COPY_CODE};


/// The samples of a superblock and where its payload was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSuperblock {

    /// The reconstructed samples.
    pub superblock: Superblock,

    /// The body base of the header, or `None` for solid color superblocks.
    pub body_base: Option<u32>,
}


/// Decode the superblock at the grid position from the complete frame buffer.
/// `frame_size` is the number of bytes that belong to the frame,
/// while `bytes` may be shorter if the buffer was truncated.
/// Errors are attributed to the superblock and, if possible, the subblock slot.
pub fn decode_superblock(
    descriptor: &FrameDescriptor, resolver: &AddressResolver,
    bytes: &[u8], frame_size: u64, position: Vec2<usize>,
    options: &DecodeOptions, report: &mut ConformanceReport, statistics: &mut BlockStatistics,
) -> Result<DecodedSuperblock>
{
    report.set_location(Some(position));

    decode_located(descriptor, resolver, bytes, frame_size, position, options, report, statistics)
        .map_err(|error| error.at_superblock(position, None))
}

#[allow(clippy::too_many_arguments)]
fn decode_located(
    descriptor: &FrameDescriptor, resolver: &AddressResolver,
    bytes: &[u8], frame_size: u64, position: Vec2<usize>,
    options: &DecodeOptions, report: &mut ConformanceReport, statistics: &mut BlockStatistics,
) -> Result<DecodedSuperblock>
{
    let header_offset = resolver.header_offset(position);
    let header_bytes = bytes.get(header_offset .. header_offset + HEADER_BYTE_SIZE)
        .and_then(|header| <&[u8; HEADER_BYTE_SIZE]>::try_from(header).ok())
        .ok_or_else(|| Error::overflow("superblock header is outside the buffer"))?;

    let header = SuperblockHeader::parse(descriptor, header_bytes);
    header.check(descriptor, report);

    let body_base = match header {
        SuperblockHeader::Solid { color, .. } => {
            if !options.allow_zeroed_headers {
                return Err(Error::invalid("solid color superblock in a buffer without zeroed headers"));
            }

            log::trace!("superblock ({}, {}) has a solid color", position.0, position.1);
            statistics.solid_superblocks += 1;
            return Ok(DecodedSuperblock { superblock: Superblock::solid(descriptor, color), body_base: None });
        },

        SuperblockHeader::Payload { body_base, .. } => body_base,
    };

    if let Some(tile) = resolver.paging_tile(position) {
        let base = u64::from(body_base);
        let max_payload = descriptor.max_superblock_payload_size();

        if base < tile.start || base + max_payload > tile.end {
            return Err(Error::invalid(format!(
                "payload at {} is outside its paging tile {}..{}", base, tile.start, tile.end
            )));
        }

        if options.checks.first_superblock_tile_alignment && resolver.is_first_in_tile(position) && base != tile.start {
            report.record(Violation::FirstInTileMisaligned { tile_start: tile.start, superblock_start: base });
        }
    }

    let entries = header.resolve(descriptor)?;
    statistics.payload_bytes += header.payload_size(descriptor);

    let mut superblock = Superblock::new(descriptor);
    let mut previous: [Option<SubblockSamples>; 2] = [None, None];

    for (slot, (subblock_position, entry)) in descriptor.layout.subblock_order().iter().zip(entries.iter()).enumerate() {
        let plane = subblock_position.plane;

        let samples = match (entry.code, previous[plane]) {
            (COPY_CODE, Some(source)) => {
                statistics.copy_subblocks += 1;
                source
            },

            _ => {
                let samples = decode_slot(descriptor, plane, slot, entry, bytes, frame_size, options, report)
                    .map_err(|error| error.at_superblock(position, Some(slot)))?;

                if entry.uncompressed { statistics.uncompressed_subblocks += 1; }
                else { statistics.compressed_subblocks += 1; }

                samples
            },
        };

        previous[plane] = Some(samples);
        superblock.set_subblock(descriptor, *subblock_position, &samples);
    }

    Ok(DecodedSuperblock { superblock, body_base: Some(body_base) })
}

/// Decode one stored subblock and verify its declared size.
#[allow(clippy::too_many_arguments)]
fn decode_slot(
    descriptor: &FrameDescriptor, plane_index: usize, slot: usize, entry: &SubblockEntry,
    bytes: &[u8], frame_size: u64, options: &DecodeOptions, report: &mut ConformanceReport,
) -> Result<SubblockSamples>
{
    let end = entry.offset + entry.size as u64;

    if end > frame_size {
        if !options.zero_fill_outside_frame {
            return Err(Error::invalid(format!("subblock ends at {}, after the frame end at {}", end, frame_size)));
        }

        report.record(Violation::SubblockOutsideFrame { subblock: slot, end, frame_size });
        return Ok([[0; 16]; 4]);
    }

    let start = u64_to_usize(entry.offset, "subblock offset too large for this machine")?;
    if start >= bytes.len() {
        return Err(Error::overflow("subblock starts after the end of the buffer"));
    }

    let stop = start.saturating_add(entry.size).min(bytes.len());
    let truncated = stop < start + entry.size;

    let decoded = decode_subblock(
        descriptor, plane_index, &bytes[start .. stop],
        entry.uncompressed, options.max_bit_count, report
    );

    let (samples, size) = match decoded {
        Err(Error::Overflow(_)) if !truncated => {
            report.record(Violation::SubblockSizeMismatch { subblock: slot, declared: entry.size, decoded: None });
            return Err(Error::invalid("subblock is larger than its declared size"));
        },

        other => other?,
    };

    let plane = &descriptor.planes[plane_index];
    let size_multiplier = if entry.uncompressed { 1 } else { plane.size_multiplier };
    let size = size.max(2 * plane.size_multiplier);
    let expected = round_up_to_multiple(size as u64, size_multiplier as u64);

    if expected != entry.size as u64 {
        report.record(Violation::SubblockSizeMismatch { subblock: slot, declared: entry.size, decoded: Some(expected as usize) });
        return Err(Error::invalid(format!("subblock occupies {} bytes, but declares {}", expected, entry.size)));
    }

    Ok(samples)
}
