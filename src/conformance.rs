
//! Rules that a legal compressed buffer must follow, beyond being decodable.
//! Violations never abort decoding. They are collected in a report
//! that is returned together with the decoded frame.

use std::fmt;
use crate::math::Vec2;
use crate::meta::{AddressingMode, FrameDescriptor};


/// Which conformance rules are verified while decoding.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct ConformanceChecks {

    /// Verify the rules at all. No other field has an effect without this.
    pub enabled: bool,

    /// In tiled buffers, the first superblock of each paging tile must start exactly at the tile.
    pub first_superblock_tile_alignment: bool,

    /// Payload data of the first superblock (or of each stripe) must start at a multiple of this.
    pub payload_alignment: Option<u64>,

    /// Subtracted from payload addresses before checking alignment and sparse spacing.
    pub payload_offset: u64,
}

/// A broken rule.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Violation {

    /// A quadrant bit count was negative before wrapping into the four bit range.
    NegativeBitCount { component: usize },

    /// A tree node needs more bits than the component has.
    BitCountExceedsDepth { component: usize, bit_count: u8, depth: u32 },

    /// All four one bit deltas of a node are one, so no child holds the minimum.
    MissingZeroDelta { component: usize },

    /// A compressed subblock is not smaller than the uncompressed subblock.
    SubblockTooLarge { subblock: usize, size: usize, limit: usize },

    /// A copy code on the first subblock of an 8×8 region, where such copies are disabled.
    CopyCrossing8x8 { subblock: usize },

    /// Payload data crosses the 4 GiB boundary.
    PayloadStraddles4GiB { base: u32, size: u64 },

    /// A solid color header has a non-zero body base.
    SolidColorWithPayloadBase { base: u32 },

    /// A solid color header in a layout that does not allow it.
    SolidColorNotAllowed { layout: usize },

    /// The inverse color transform produced a value outside the input bit depth.
    ColorOutOfRange,

    /// The declared subblock size differs from the minimal size of the decoded subblock.
    /// The decoded size is `None` if decoding ran past the declared size.
    SubblockSizeMismatch { subblock: usize, declared: usize, decoded: Option<usize> },

    /// The subblock lies beyond the end of the frame and was replaced by zeroes.
    SubblockOutsideFrame { subblock: usize, end: u64, frame_size: u64 },

    /// The first superblock of a paging tile does not start at the tile start.
    FirstInTileMisaligned { tile_start: u64, superblock_start: u64 },

    /// The payload buffer does not start at the requested alignment.
    PayloadMisaligned { address: u64, alignment: u64 },

    /// A sparse payload is not spaced a multiple of the maximum payload size from the others.
    SparseSpacing { address: u64, spacing: u64 },

    /// A stripe does not start at the requested alignment.
    StripeMisaligned { stripe: usize, address: u64, alignment: u64 },

    /// The payloads of a stripe cover more bytes than the stripe may use.
    StripeTooLarge { stripe: usize, size: u64, limit: u64 },
}

/// A violation together with the superblock where it was found.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct LocatedViolation {

    /// Grid coordinate of the superblock, if the violation belongs to one.
    pub superblock: Option<Vec2<usize>>,

    /// What is wrong.
    pub violation: Violation,
}

/// Collects the violations of one decoding pass.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConformanceReport {
    enabled: bool,
    location: Option<Vec2<usize>>,
    violations: Vec<LocatedViolation>,
}


impl ConformanceReport {

    /// A report that only records violations if `enabled` is true.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, location: None, violations: Vec::new() }
    }

    /// Whether violations are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Attribute subsequent violations to this superblock.
    pub fn set_location(&mut self, superblock: Option<Vec2<usize>>) {
        self.location = superblock;
    }

    /// Remember that a rule was broken. Ignored if checks are disabled.
    pub fn record(&mut self, violation: Violation) {
        if !self.enabled { return; }

        match self.location {
            Some(Vec2(x, y)) => log::warn!("illegal buffer at superblock ({}, {}): {}", x, y, violation),
            None => log::warn!("illegal buffer: {}", violation),
        }

        self.violations.push(LocatedViolation { superblock: self.location, violation });
    }

    /// Append all violations of another report.
    pub fn merge(&mut self, other: ConformanceReport) {
        self.violations.extend(other.violations);
    }

    /// True if no rule was broken. Always true if checks are disabled.
    pub fn is_conforming(&self) -> bool {
        self.violations.is_empty()
    }

    /// All recorded violations, in the order they were found.
    pub fn violations(&self) -> &[LocatedViolation] {
        &self.violations
    }
}


/// Payload address range and remaining superblocks of one stripe.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StripeBin {

    /// Lowest payload start seen in the stripe.
    pub start: Option<u64>,

    /// Highest payload end seen in the stripe, assuming maximum payload size.
    pub end: Option<u64>,

    /// Superblocks of the stripe that were not decoded yet.
    pub remaining_superblocks: usize,
}

/// Verifies payload placement across superblocks: first payload alignment,
/// sparse spacing and stripe spans. Must observe superblocks in raster order.
#[derive(Debug, Clone)]
pub struct PayloadTracker {
    checks: ConformanceChecks,
    max_payload: u64,
    superblock_columns: usize,
    sparse: bool,
    lowest_payload: Option<i64>,

    /// Empty if the surface is not striped.
    stripes: Vec<StripeBin>,
    rows_per_stripe: usize,
}

impl PayloadTracker {

    /// Prepare the stripe bins of the frame.
    pub fn new(descriptor: &FrameDescriptor, checks: ConformanceChecks) -> Self {
        let rows = descriptor.superblock_count.1;
        let columns = descriptor.superblock_count.0;

        let rows_per_stripe = match descriptor.addressing {
            AddressingMode::Striped { stripe_height } => (stripe_height / descriptor.superblock_size().1).max(1),
            _ => 0,
        };

        let stripes = if rows_per_stripe == 0 || !checks.enabled { Vec::new() } else {
            let stripe_count = (rows + rows_per_stripe - 1) / rows_per_stripe;

            (0 .. stripe_count).map(|stripe| {
                let stripe_rows =
                    if stripe + 1 == stripe_count && rows % rows_per_stripe != 0 { rows % rows_per_stripe }
                    else { rows_per_stripe };

                StripeBin { start: None, end: None, remaining_superblocks: stripe_rows * columns }
            }).collect()
        };

        Self {
            checks, stripes, rows_per_stripe,
            max_payload: descriptor.max_superblock_payload_size(),
            superblock_columns: columns,
            sparse: descriptor.uses_payload_slots(),
            lowest_payload: None,
        }
    }

    /// Check the payload of the next superblock.
    /// `body_base` is `None` for solid color superblocks.
    pub fn observe(&mut self, superblock: Vec2<usize>, body_base: Option<u32>, report: &mut ConformanceReport) {
        if !self.checks.enabled { return; }
        report.set_location(Some(superblock));

        let striped = !self.stripes.is_empty();
        let offset = self.checks.payload_offset as i64;

        if let Some(base) = body_base.map(u64::from) {
            if let Some(alignment) = self.checks.payload_alignment {
                if !striped && superblock == Vec2(0, 0) && (base as i64 - offset).rem_euclid(alignment as i64) != 0 {
                    report.record(Violation::PayloadMisaligned { address: base, alignment });
                }
            }

            if self.sparse {
                let address = base as i64 - offset;
                let lowest = self.lowest_payload.map_or(address, |lowest| lowest.min(address));
                self.lowest_payload = Some(lowest);

                if (address - lowest).rem_euclid(self.max_payload as i64) != 0 {
                    report.record(Violation::SparseSpacing { address: base, spacing: self.max_payload });
                }
            }
        }

        if striped {
            self.observe_stripe(superblock, body_base.map(u64::from), report);
        }
    }

    fn observe_stripe(&mut self, superblock: Vec2<usize>, body_base: Option<u64>, report: &mut ConformanceReport) {
        let index = superblock.1 / self.rows_per_stripe;
        let limit = self.max_payload * (self.superblock_columns * self.rows_per_stripe) as u64;
        let max_payload = self.max_payload;

        let bin = match self.stripes.get_mut(index) {
            Some(bin) => bin,
            None => return,
        };

        if let Some(base) = body_base {
            bin.start = Some(bin.start.map_or(base, |start| start.min(base)));
            bin.end = Some(bin.end.map_or(base + max_payload, |end| end.max(base + max_payload)));
        }

        bin.remaining_superblocks = bin.remaining_superblocks.saturating_sub(1);
        if bin.remaining_superblocks != 0 { return; }

        if let (Some(start), Some(end)) = (bin.start, bin.end) {
            if let Some(alignment) = self.checks.payload_alignment {
                let address = start as i64 - self.checks.payload_offset as i64;

                if address.rem_euclid(alignment as i64) != 0 {
                    report.record(Violation::StripeMisaligned { stripe: index, address: start, alignment });
                }
            }

            if end - start > limit {
                report.record(Violation::StripeTooLarge { stripe: index, size: end - start, limit });
            }
        }
    }

    /// The stripe bins, in stripe order.
    pub fn stripes(&self) -> &[StripeBin] {
        &self.stripes
    }
}


impl fmt::Display for Violation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Violation::NegativeBitCount { component } =>
                write!(formatter, "negative quadrant bit count in component {}", component),

            Violation::BitCountExceedsDepth { component, bit_count, depth } =>
                write!(formatter, "bit count {} of component {} exceeds its depth of {} bits", bit_count, component, depth),

            Violation::MissingZeroDelta { component } =>
                write!(formatter, "no zero delta among four one bit deltas in component {}", component),

            Violation::SubblockTooLarge { subblock, size, limit } =>
                write!(formatter, "subblock {} has {} bytes, but must be smaller than {}", subblock, size, limit),

            Violation::CopyCrossing8x8 { subblock } =>
                write!(formatter, "subblock {} must not be a copy", subblock),

            Violation::PayloadStraddles4GiB { base, size } =>
                write!(formatter, "payload at {:#x} with {:#x} bytes crosses the 4 GiB boundary", base, size),

            Violation::SolidColorWithPayloadBase { base } =>
                write!(formatter, "solid color header with payload base {:#x}", base),

            Violation::SolidColorNotAllowed { layout } =>
                write!(formatter, "solid color header in subsampled layout {}", layout),

            Violation::ColorOutOfRange =>
                write!(formatter, "color transform result out of range"),

            Violation::SubblockSizeMismatch { subblock, declared, decoded: Some(decoded) } =>
                write!(formatter, "subblock {} declares {} bytes but decodes to {}", subblock, declared, decoded),

            Violation::SubblockSizeMismatch { subblock, declared, decoded: None } =>
                write!(formatter, "subblock {} does not fit into its declared {} bytes", subblock, declared),

            Violation::SubblockOutsideFrame { subblock, end, frame_size } =>
                write!(formatter, "subblock {} ends at {}, after the frame end {}", subblock, end, frame_size),

            Violation::FirstInTileMisaligned { tile_start, superblock_start } =>
                write!(formatter, "first superblock of paging tile starts at {} instead of {}", superblock_start, tile_start),

            Violation::PayloadMisaligned { address, alignment } =>
                write!(formatter, "payload buffer at {} is not aligned to {} bytes", address, alignment),

            Violation::SparseSpacing { address, spacing } =>
                write!(formatter, "payload at {} is not spaced a multiple of {} bytes from the others", address, spacing),

            Violation::StripeMisaligned { stripe, address, alignment } =>
                write!(formatter, "stripe {} at {} is not aligned to {} bytes", stripe, address, alignment),

            Violation::StripeTooLarge { stripe, size, limit } =>
                write!(formatter, "stripe {} covers {} bytes, more than {}", stripe, size, limit),
        }
    }
}
