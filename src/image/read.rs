
//! Decode a complete frame from a compressed buffer.

use super::{DecodeOptions, Frame};
use crate::address::AddressResolver;
use crate::block::BlockStatistics;
use crate::block::reader::{decode_superblock, DecodedSuperblock};
use crate::conformance::{ConformanceReport, PayloadTracker};
use crate::error::Result;
use crate::math::Vec2;
use crate::meta::FrameDescriptor;


/// The result of decoding a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {

    /// The samples of all components.
    pub frame: Frame,

    /// All conformance violations, if checks were enabled.
    /// Decoding succeeds even if the buffer is not conforming.
    pub report: ConformanceReport,

    /// What the buffer consists of.
    pub statistics: BlockStatistics,
}

/// The decoded superblocks of one superblock row,
/// with the violations found while decoding them.
struct DecodedRow {
    superblocks: Vec<DecodedSuperblock>,
    report: ConformanceReport,
    statistics: BlockStatistics,
}

/// What remains of a row after its samples were placed in the frame.
struct RowSummary {
    body_bases: Vec<Option<u32>>,
    report: ConformanceReport,
    statistics: BlockStatistics,
}


/// Decode all superblocks of a buffer into a frame.
/// `frame_size` is the number of bytes that belong to the frame.
/// It may be smaller than the buffer, but subblocks must not reach beyond it.
/// Returns the first fatal error in raster order, attributed to its superblock.
pub fn decode_frame(descriptor: &FrameDescriptor, bytes: &[u8], frame_size: u64, options: DecodeOptions) -> Result<DecodedFrame> {
    descriptor.validate()?;

    let resolver = AddressResolver::new(descriptor);
    let mut frame = Frame::new(descriptor);

    let rows = decode_rows(descriptor, &resolver, bytes, frame_size, &options, &mut frame)?;

    let mut report = ConformanceReport::new(options.checks.enabled);
    let mut statistics = BlockStatistics::default();
    let mut tracker = PayloadTracker::new(descriptor, options.checks);

    for (y, row) in rows.into_iter().enumerate() {
        report.merge(row.report);
        statistics.merge(row.statistics);

        for (x, body_base) in row.body_bases.into_iter().enumerate() {
            tracker.observe(Vec2(x, y), body_base, &mut report);
        }
    }

    report.set_location(None);
    Ok(DecodedFrame { frame, report, statistics })
}

fn decode_rows(
    descriptor: &FrameDescriptor, resolver: &AddressResolver, bytes: &[u8], frame_size: u64,
    options: &DecodeOptions, frame: &mut Frame,
) -> Result<Vec<RowSummary>>
{
    #[cfg(feature = "rayon")]
    if options.parallel && descriptor.superblock_count.1 > 1 {
        if let Some(rows) = parallel::decode_rows(descriptor, resolver, bytes, frame_size, options, frame) {
            return rows;
        }
    }

    (0 .. descriptor.superblock_count.1)
        .map(|y| {
            let row = decode_row(descriptor, resolver, bytes, frame_size, y, options)?;
            Ok(place_row(descriptor, y, row, frame))
        })
        .collect()
}

fn decode_row(
    descriptor: &FrameDescriptor, resolver: &AddressResolver, bytes: &[u8], frame_size: u64,
    y: usize, options: &DecodeOptions,
) -> Result<DecodedRow>
{
    let mut report = ConformanceReport::new(options.checks.enabled);
    let mut statistics = BlockStatistics::default();

    let superblocks = (0 .. descriptor.superblock_count.0)
        .map(|x| decode_superblock(
            descriptor, resolver, bytes, frame_size, Vec2(x, y),
            options, &mut report, &mut statistics
        ))
        .collect::<Result<Vec<_>>>()
        .map_err(|error| {
            log::debug!("aborted decoding: {}", error);
            error
        })?;

    Ok(DecodedRow { superblocks, report, statistics })
}

/// Copy the samples of a row into the frame.
fn place_row(descriptor: &FrameDescriptor, y: usize, row: DecodedRow, frame: &mut Frame) -> RowSummary {
    let body_bases = row.superblocks.iter().enumerate()
        .map(|(x, decoded)| {
            frame.insert_superblock(descriptor, Vec2(x, y), &decoded.superblock);
            decoded.body_base
        })
        .collect();

    RowSummary { body_bases, report: row.report, statistics: row.statistics }
}


#[cfg(feature = "rayon")]
mod parallel {
    use super::*;
    use std::sync::mpsc;

    /// Decode each superblock row on the thread pool, placing rows as they finish.
    /// Returns `None` if no thread pool can be created.
    pub(super) fn decode_rows(
        descriptor: &FrameDescriptor, resolver: &AddressResolver, bytes: &[u8], frame_size: u64,
        options: &DecodeOptions, frame: &mut Frame,
    ) -> Option<Result<Vec<RowSummary>>>
    {
        let pool = rayon_core::ThreadPoolBuilder::new()
            .thread_name(|index| format!("AFBC Superblock Decoder Thread #{}", index))
            .build();

        // in case thread pool creation fails (for example on WASM currently),
        // we revert to sequential decoding
        let pool = match pool {
            Ok(pool) => pool,
            Err(error) => {
                log::debug!("decoding sequentially: {}", error);
                return None;
            },
        };

        let row_count = descriptor.superblock_count.1;
        let (sender, receiver) = mpsc::channel();
        let mut rows: Vec<Option<Result<RowSummary>>> = (0 .. row_count).map(|_| None).collect();

        pool.in_place_scope(|scope| {
            for y in 0 .. row_count {
                let sender = sender.clone();

                scope.spawn(move |_| {
                    let row = decode_row(descriptor, resolver, bytes, frame_size, y, options);

                    // the receiver only hangs up after all rows were sent
                    let _ = sender.send((y, row));
                });
            }

            drop(sender);

            for (y, row) in receiver.iter() {
                rows[y] = Some(row.map(|row| place_row(descriptor, y, row, frame)));
            }
        });

        Some(rows.into_iter()
            .map(|row| row.unwrap_or_else(|| Err(crate::error::Error::invalid("superblock row was not decoded"))))
            .collect())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::conformance::Violation;
    use crate::error::Error;
    use crate::image::{encode_frame, EncodeOptions};
    use crate::meta::{AddressingMode, SuperblockLayout};

    fn noise_frame(descriptor: &FrameDescriptor) -> Frame {
        let mut state = 0x1234_5678_u32;

        Frame::from_fn(descriptor, |component, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;

            let smooth = state % 4;
            (smooth + 40 * component as u32) & ((1 << descriptor.input_bits[component]) - 1)
        })
    }

    #[test]
    fn parallel_equals_sequential() {
        let descriptor = FrameDescriptor::new(Vec2(70, 50), SuperblockLayout::Square, &[8, 8, 8], false).unwrap()
            .with_addressing(AddressingMode::Sparse).unwrap();

        let frame = noise_frame(&descriptor);
        let encoded = encode_frame(&descriptor, &frame, EncodeOptions::default()).unwrap();

        let sequential = decode_frame(
            &descriptor, &encoded.bytes, encoded.bytes.len() as u64,
            DecodeOptions { parallel: false, ..DecodeOptions::conformance() }
        ).unwrap();

        let parallel = decode_frame(
            &descriptor, &encoded.bytes, encoded.bytes.len() as u64,
            DecodeOptions { parallel: true, ..DecodeOptions::conformance() }
        ).unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential.frame, frame);
        assert!(sequential.report.is_conforming());
    }

    #[test]
    fn first_error_in_raster_order() {
        let descriptor = FrameDescriptor::new(Vec2(64, 64), SuperblockLayout::Square, &[8], false).unwrap();
        let frame = noise_frame(&descriptor);
        let encoded = encode_frame(&descriptor, &frame, EncodeOptions::default()).unwrap();

        // cut the buffer in the middle of the body
        let length = encoded.bytes.len() / 2;

        for &parallel in &[false, true] {
            let options = DecodeOptions { parallel, ..DecodeOptions::default() };
            let error = decode_frame(&descriptor, &encoded.bytes[.. length], encoded.bytes.len() as u64, options).unwrap_err();

            match error {
                Error::Located { superblock, .. } => assert!(superblock.1 >= 1),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn zero_fill_outside_frame() {
        let descriptor = FrameDescriptor::new(Vec2(32, 16), SuperblockLayout::Square, &[8, 8, 8], false).unwrap();
        let frame = noise_frame(&descriptor);
        let encoded = encode_frame(&descriptor, &frame, EncodeOptions::default()).unwrap();
        let declared = encoded.bytes.len() as u64 - 20;

        assert!(decode_frame(&descriptor, &encoded.bytes, declared, DecodeOptions::default()).is_err());

        let options = DecodeOptions { zero_fill_outside_frame: true, ..DecodeOptions::conformance() };
        let decoded = decode_frame(&descriptor, &encoded.bytes, declared, options).unwrap();

        assert!(decoded.report.violations().iter()
            .any(|located| matches!(located.violation, Violation::SubblockOutsideFrame { .. })));

        assert_ne!(decoded.frame, frame);
    }
}
