
//! The 16 byte header that precedes each superblock payload.
//! Contains either the payload location and the size code of each subblock,
//! or the single color of a solid superblock.

use ::bit_field::BitField;
use ::smallvec::SmallVec;
use crate::conformance::{ConformanceReport, Violation};
use crate::error::{Error, Result};
use crate::meta::{FrameDescriptor, HEADER_BYTE_SIZE};


/// Size codes of all subblock slots in a superblock.
pub type SizeCodes = SmallVec<[u8; 24]>;

/// Resolved location of all subblock slots in a superblock.
pub type SubblockEntries = SmallVec<[SubblockEntry; 24]>;

/// Size code which repeats the previous subblock of the same plane.
pub const COPY_CODE: u8 = 0;

/// Size code of a subblock stored without compression.
pub const UNCOMPRESSED_CODE: u8 = 1;

/// Solid color values start at this bit of the header.
const SOLID_COLOR_BIT: usize = 64;


/// A parsed superblock header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperblockHeader {

    /// The first size code is zero: every component
    /// has one value for the whole superblock, stored in the header.
    Solid {

        /// The body base field. Must be zero in a legal buffer.
        body_base: u32,

        /// One value per component, at input bit depth.
        color: [u32; 4],
    },

    /// The subblocks are stored in the body buffer.
    Payload {

        /// Byte offset of the first subblock, from the start of the header buffer.
        body_base: u32,

        /// One size code per subblock slot.
        size_codes: SizeCodes,
    },
}

/// The resolved location of one subblock slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubblockEntry {

    /// The raw size code from the header.
    pub code: u8,

    /// Absolute byte offset of the subblock payload.
    pub offset: u64,

    /// Byte size of the subblock payload.
    pub size: usize,

    /// Whether the payload is stored without compression.
    pub uncompressed: bool,
}


impl SuperblockHeader {

    /// Split the raw header bits into fields. Any bit pattern is a valid header.
    pub fn parse(descriptor: &FrameDescriptor, bytes: &[u8; HEADER_BYTE_SIZE]) -> Self {
        let bits = u128::from_le_bytes(*bytes);
        let subsampling = descriptor.subsampling();

        let base_bits = subsampling.body_base_bits();
        let code_bits = subsampling.size_code_bits();

        let body_base = bits.get_bits(0 .. base_bits) as u32;
        let size_codes: SizeCodes = (0 .. subsampling.subblock_count())
            .map(|slot| {
                let start = base_bits + slot * code_bits;
                bits.get_bits(start .. start + code_bits) as u8
            })
            .collect();

        if size_codes[0] != COPY_CODE {
            return SuperblockHeader::Payload { body_base, size_codes };
        }

        let mut color = [0_u32; 4];
        let mut position = SOLID_COLOR_BIT;

        for (component, value) in color.iter_mut().enumerate().take(descriptor.component_count) {
            let depth = descriptor.input_bits[component] as usize;
            *value = bits.get_bits(position .. position + depth) as u32;
            position += depth;
        }

        SuperblockHeader::Solid { body_base, color }
    }

    /// Pack the fields into the 16 header bytes.
    /// Fails if the body base or a size code does not fit its field.
    pub fn to_bytes(&self, descriptor: &FrameDescriptor) -> Result<[u8; HEADER_BYTE_SIZE]> {
        let subsampling = descriptor.subsampling();
        let base_bits = subsampling.body_base_bits();
        let mut bits: u128 = 0;

        match self {
            SuperblockHeader::Solid { color, .. } => {
                let mut position = SOLID_COLOR_BIT;

                for (component, &value) in color.iter().enumerate().take(descriptor.component_count) {
                    let depth = descriptor.input_bits[component] as usize;
                    bits.set_bits(position .. position + depth, u128::from(value) & ((1 << depth) - 1));
                    position += depth;
                }
            },

            SuperblockHeader::Payload { body_base, size_codes } => {
                let code_bits = subsampling.size_code_bits();

                if u128::from(*body_base) >> base_bits != 0 {
                    return Err(Error::unsupported("body base pointer does not fit into the header"));
                }

                if size_codes.len() != subsampling.subblock_count() {
                    return Err(Error::invalid("size code count does not match the superblock layout"));
                }

                bits.set_bits(0 .. base_bits, u128::from(*body_base));

                for (slot, &code) in size_codes.iter().enumerate() {
                    if u128::from(code) >> code_bits != 0 {
                        return Err(Error::unsupported(format!(
                            "subblock size code {} does not fit into {} header bits", code, code_bits
                        )));
                    }

                    let start = base_bits + slot * code_bits;
                    bits.set_bits(start .. start + code_bits, u128::from(code));
                }
            },
        }

        Ok(bits.to_le_bytes())
    }

    /// The body base field of either kind of header.
    pub fn body_base(&self) -> u32 {
        match *self {
            SuperblockHeader::Solid { body_base, .. } => body_base,
            SuperblockHeader::Payload { body_base, .. } => body_base,
        }
    }

    /// Compute offset and size of each subblock slot.
    /// Copy codes take the location of the previous slot of the same plane.
    /// Fails for a solid header, and for a copy without a preceding slot.
    pub fn resolve(&self, descriptor: &FrameDescriptor) -> Result<SubblockEntries> {
        let (body_base, size_codes) = match self {
            SuperblockHeader::Payload { body_base, size_codes } => (u64::from(*body_base), size_codes),
            SuperblockHeader::Solid { .. } => return Err(Error::invalid("solid color superblocks have no subblocks")),
        };

        let order = descriptor.layout.subblock_order();
        let half_payload = descriptor.max_superblock_payload_size() / 2;

        let mut previous: [Option<SubblockEntry>; 2] = [None, None];
        let mut entries = SubblockEntries::with_capacity(order.len());
        let mut offset = 0_u64;

        for (slot, (position, &code)) in order.iter().zip(size_codes.iter()).enumerate() {
            let plane = &descriptor.planes[position.plane];

            let entry = match code {
                COPY_CODE => {
                    let source = previous[position.plane].ok_or_else(|| Error::invalid(format!(
                        "subblock {} copies a subblock that does not exist", slot
                    )))?;

                    SubblockEntry { code, ..source }
                },

                _ => {
                    let uncompressed = code == UNCOMPRESSED_CODE;
                    let size = if uncompressed { plane.uncompressed_size } else { usize::from(code) * plane.size_multiplier };
                    let entry = SubblockEntry { code, offset: body_base + offset, size, uncompressed };

                    offset += size as u64;
                    previous[position.plane] = Some(entry);
                    entry
                },
            };

            entries.push(entry);

            if descriptor.is_last_before_split(slot) {
                offset = half_payload;
            }
        }

        Ok(entries)
    }

    /// Sum of the sizes of all stored subblocks, excluding copies.
    pub fn payload_size(&self, descriptor: &FrameDescriptor) -> u64 {
        match self {
            SuperblockHeader::Solid { .. } => 0,
            SuperblockHeader::Payload { size_codes, .. } => {
                descriptor.layout.subblock_order().iter().zip(size_codes.iter())
                    .map(|(position, &code)| {
                        let plane = &descriptor.planes[position.plane];
                        match code {
                            COPY_CODE => 0,
                            UNCOMPRESSED_CODE => plane.uncompressed_size as u64,
                            code => u64::from(code) * plane.size_multiplier as u64,
                        }
                    })
                    .sum()
            },
        }
    }

    /// Record every rule of a legal header that this header breaks.
    pub fn check(&self, descriptor: &FrameDescriptor, report: &mut ConformanceReport) {
        match self {
            SuperblockHeader::Solid { body_base, .. } => {
                if *body_base != 0 {
                    report.record(Violation::SolidColorWithPayloadBase { base: *body_base });
                }

                if !descriptor.layout.allows_solid_color() {
                    report.record(Violation::SolidColorNotAllowed { layout: descriptor.layout.index() });
                }
            },

            SuperblockHeader::Payload { body_base, size_codes } => {
                let order = descriptor.layout.subblock_order();
                let subsampling = descriptor.subsampling();

                for (slot, (position, &code)) in order.iter().zip(size_codes.iter()).enumerate() {
                    let plane = &descriptor.planes[position.plane];
                    let size = usize::from(code) * plane.size_multiplier;

                    if size >= plane.uncompressed_size {
                        report.record(Violation::SubblockTooLarge { subblock: slot, size, limit: plane.uncompressed_size });
                    }

                    if code == COPY_CODE && descriptor.disable_copies_crossing_8x8 && subsampling.is_first_in_8x8(slot) {
                        report.record(Violation::CopyCrossing8x8 { subblock: slot });
                    }
                }

                let size = self.payload_size(descriptor);
                let end = u64::from(*body_base) + size;

                if body_base & 0x8000_0000 != 0 && end & 0x8000_0000 == 0 {
                    report.record(Violation::PayloadStraddles4GiB { base: *body_base, size });
                }
            },
        }
    }
}
