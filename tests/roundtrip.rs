extern crate afbc;

use afbc::prelude::*;
use afbc::error::Error;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;


/// Each component wanders around its own base value, like a photograph.
fn smooth_frame(descriptor: &FrameDescriptor, random: &mut StdRng, spread: u32) -> Frame {
    let bases: Vec<u32> = (0 .. descriptor.component_count)
        .map(|component| random.random_range(0 .. 1_u32 << descriptor.input_bits[component]))
        .collect();

    Frame::from_fn(descriptor, |component, _| {
        let mask = (1_u32 << descriptor.input_bits[component]) - 1;
        (bases[component] + random.random_range(0 .. spread)) & mask
    })
}

fn decode_conforming(descriptor: &FrameDescriptor, encoded: &EncodedFrame) -> DecodedFrame {
    let decoded = decode_frame(descriptor, &encoded.bytes, encoded.bytes.len() as u64, DecodeOptions::conformance())
        .expect("decoding failed");

    assert!(decoded.report.is_conforming(), "{:?}", decoded.report.violations());
    assert_eq!(decoded.statistics, encoded.statistics);
    decoded
}

fn assert_round_trip(descriptor: &FrameDescriptor, frame: &Frame, options: EncodeOptions) -> EncodedFrame {
    let encoded = encode_frame(descriptor, frame, options).expect("encoding failed");
    let decoded = decode_conforming(descriptor, &encoded);
    assert_eq!(&decoded.frame, frame);
    encoded
}


#[test]
fn all_layouts_and_depths() {
    let mut random = StdRng::seed_from_u64(0x5eed);

    for &layout in SuperblockLayout::ALL.iter() {
        let subsampled = layout.subsampling() != meta::Subsampling::None;
        let component_counts: &[usize] = if subsampled { &[3] } else { &[1, 2, 3, 4] };

        for &component_count in component_counts {
            for &bits in &[5_u32, 8, 10, 16] {
                let input_bits = vec![bits; component_count];
                let descriptor = FrameDescriptor::new(Vec2(40, 24), layout, &input_bits, false).unwrap();

                let frame = smooth_frame(&descriptor, &mut random, 8);
                assert_round_trip(&descriptor, &frame, EncodeOptions::default());
            }
        }
    }
}

#[test]
fn deep_yuv422_chroma() {
    let mut random = StdRng::seed_from_u64(0x422);

    for &layout in &[SuperblockLayout::Square422, SuperblockLayout::Wide422] {
        let descriptor = FrameDescriptor::new(Vec2(64, 32), layout, &[16, 16, 16], false).unwrap();
        let frame = Frame::from_fn(&descriptor, |_, _| 0x4000 + random.random_range(0 .. 0x1000));

        let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());
        assert!(encoded.statistics.uncompressed_subblocks > 0);
    }
}

#[test]
fn mixed_depths() {
    let mut random = StdRng::seed_from_u64(565);

    let descriptor = FrameDescriptor::new(Vec2(48, 32), SuperblockLayout::Wide, &[5, 6, 5], false).unwrap();
    assert_round_trip(&descriptor, &smooth_frame(&descriptor, &mut random, 4), EncodeOptions::default());

    let descriptor = FrameDescriptor::new(Vec2(48, 32), SuperblockLayout::Square, &[10, 10, 10, 2], false).unwrap();
    assert_round_trip(&descriptor, &smooth_frame(&descriptor, &mut random, 4), EncodeOptions::default());
}

#[test]
fn solid_color_frame() {
    let descriptor = FrameDescriptor::new(Vec2(64, 48), SuperblockLayout::Square, &[8, 8, 8, 8], false).unwrap();
    let frame = Frame::from_fn(&descriptor, |component, _| 17 * component as u32 + 3);

    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());
    assert_eq!(encoded.statistics.solid_superblocks, 12);
    assert_eq!(encoded.statistics.payload_bytes, 0);
    assert_eq!(encoded.bytes.len() as u64, descriptor.header_area_size());

    // without solid colors, every subblock after the first is a copy
    let options = EncodeOptions { solid_color: false, ..EncodeOptions::default() };
    let encoded = assert_round_trip(&descriptor, &frame, options);
    assert_eq!(encoded.statistics.solid_superblocks, 0);
    assert_eq!(encoded.statistics.copy_subblocks, 12 * 15);
    assert_eq!(encoded.statistics.compressed_subblocks, 12);
}

#[test]
fn flat_gray_next_to_gradient() {
    let descriptor = FrameDescriptor::new(Vec2(32, 16), SuperblockLayout::Square, &[8, 8, 8], false).unwrap();
    assert_eq!(descriptor.superblock_count, Vec2(2, 1));
    assert_eq!(descriptor.uncompressed_frame_size(), 2 * 768);

    let frame = Frame::from_fn(&descriptor, |component, Vec2(x, y)| {
        if x < 16 { 128 }
        else {
            match component {
                0 => (x * 4) as u32,
                1 => (y * 8) as u32,
                _ => 255 - (x * 4) as u32,
            }
        }
    });

    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());
    assert_eq!(encoded.statistics.solid_superblocks, 1);
    assert!(encoded.statistics.compressed_subblocks > 0);
    assert!((encoded.bytes.len() as u64) < descriptor.header_area_size() + 768);
}

#[test]
fn uncompressed_frames() {
    let mut random = StdRng::seed_from_u64(7);
    let descriptor = FrameDescriptor::new(Vec2(32, 32), SuperblockLayout::Square422, &[10, 10, 10], false).unwrap();
    let frame = smooth_frame(&descriptor, &mut random, 1024);

    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::uncompressed());
    assert_eq!(encoded.statistics.uncompressed_subblocks, 4 * 24);
    assert_eq!(encoded.statistics.payload_bytes, descriptor.uncompressed_frame_size());
    assert_eq!(encoded.bytes.len() as u64, descriptor.header_area_size() + descriptor.uncompressed_frame_size());
}

#[test]
fn color_transform() {
    let mut random = StdRng::seed_from_u64(0xc010);

    for &bits in &[6_u32, 8, 10] {
        let descriptor = FrameDescriptor::new(Vec2(50, 30), SuperblockLayout::Square, &[bits, bits, bits, 8], true).unwrap();
        let frame = smooth_frame(&descriptor, &mut random, 16);

        let options = EncodeOptions { wraparound_minimum: true, ..EncodeOptions::default() };
        assert_round_trip(&descriptor, &frame, options);
    }
}

#[test]
fn cropped_frames() {
    let mut random = StdRng::seed_from_u64(0xc209);

    for &layout in &[SuperblockLayout::Square420, SuperblockLayout::Wide422, SuperblockLayout::Wide] {
        let descriptor = FrameDescriptor::new(Vec2(45, 29), layout, &[8, 8, 8], false).unwrap()
            .with_crop(Vec2(5, 3)).unwrap();

        let frame = smooth_frame(&descriptor, &mut random, 32);
        assert_round_trip(&descriptor, &frame, EncodeOptions::default());
    }
}

#[test]
fn sparse_payload_slots() {
    let mut random = StdRng::seed_from_u64(0x5ba5);
    let descriptor = FrameDescriptor::new(Vec2(64, 40), SuperblockLayout::Square, &[8, 8, 8], false).unwrap()
        .with_addressing(AddressingMode::Sparse).unwrap();

    let frame = smooth_frame(&descriptor, &mut random, 16);
    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());

    // the last superblock ends inside its own slot
    let last_slot = descriptor.body_start() + (descriptor.superblock_count.area() as u64 - 1) * descriptor.max_superblock_payload_size();
    assert!(encoded.bytes.len() as u64 > last_slot);
    assert!(encoded.bytes.len() as u64 <= descriptor.max_frame_size());
}

#[test]
fn striped_payloads() {
    let mut random = StdRng::seed_from_u64(0x57e1);
    let descriptor = FrameDescriptor::new(Vec2(48, 64), SuperblockLayout::Square, &[8, 8, 8, 8], false).unwrap()
        .with_addressing(AddressingMode::Striped { stripe_height: 32 }).unwrap();

    let frame = smooth_frame(&descriptor, &mut random, 64);
    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());

    // the body of this frame starts right after 12 headers
    let options = DecodeOptions {
        checks: ConformanceChecks { enabled: true, payload_alignment: Some(4096), ..ConformanceChecks::default() },
        ..DecodeOptions::default()
    };

    let decoded = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).unwrap();
    assert_eq!(decoded.frame, frame);
    assert!(decoded.report.violations().iter().any(|located|
        located.violation == Violation::StripeMisaligned { stripe: 0, address: 12 * 16, alignment: 4096 }
    ));

    // compensating the header area aligns the first stripe
    let options = DecodeOptions {
        checks: ConformanceChecks { enabled: true, payload_alignment: Some(4096), payload_offset: 12 * 16, ..ConformanceChecks::default() },
        ..DecodeOptions::default()
    };

    let decoded = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).unwrap();
    assert!(!decoded.report.violations().iter().any(|located|
        matches!(located.violation, Violation::StripeMisaligned { stripe: 0, .. })
    ));
}

#[test]
fn tiled_frames() {
    let mut random = StdRng::seed_from_u64(0x711e);
    let descriptor = FrameDescriptor::new(Vec2(160, 144), SuperblockLayout::Square, &[8, 8, 8], false).unwrap()
        .with_addressing(AddressingMode::Tiled).unwrap();

    let frame = smooth_frame(&descriptor, &mut random, 8);
    let options = EncodeOptions { solid_color: false, ..EncodeOptions::default() };
    let encoded = assert_round_trip(&descriptor, &frame, options);
    assert_eq!(encoded.bytes.len() as u64, descriptor.max_frame_size());

    // point the first superblock into the header area, outside of its paging tile
    let mut corrupted = encoded.bytes.clone();
    corrupted[0 .. 4].copy_from_slice(&16_u32.to_le_bytes());

    let error = decode_frame(&descriptor, &corrupted, corrupted.len() as u64, DecodeOptions::default()).unwrap_err();
    assert!(matches!(error.cause(), Error::Invalid(_)), "{:?}", error);

    match error {
        Error::Located { superblock, .. } => assert_eq!(superblock, Vec2(0, 0)),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn block_split() {
    let mut random = StdRng::seed_from_u64(0xb10c);

    for &layout in &[SuperblockLayout::Square, SuperblockLayout::Square420, SuperblockLayout::Wide422] {
        let descriptor = FrameDescriptor::new(Vec2(64, 32), layout, &[8, 8, 8], false).unwrap()
            .with_block_split(true);

        let frame = smooth_frame(&descriptor, &mut random, 4);
        assert_round_trip(&descriptor, &frame, EncodeOptions::default());

        let constant = Frame::from_fn(&descriptor, |component, _| component as u32 * 50);
        let options = EncodeOptions { solid_color: false, ..EncodeOptions::default() };
        let encoded = assert_round_trip(&descriptor, &constant, options);

        // the first subblock of the second half is never a copy
        assert!(encoded.statistics.compressed_subblocks >= 2 * descriptor.superblock_count.area());
    }
}

#[test]
fn repeated_patterns() {
    let descriptor = FrameDescriptor::new(Vec2(32, 32), SuperblockLayout::Square, &[8], false).unwrap();
    let frame = Frame::from_fn(&descriptor, |_, Vec2(x, y)| ((x % 4) * 50 + (y % 4) * 10) as u32);

    let plain = assert_round_trip(&descriptor, &frame, EncodeOptions::default());
    assert_eq!(plain.statistics.copy_subblocks, 0);

    let options = EncodeOptions { copy_all_patterns: true, ..EncodeOptions::default() };
    let copied = assert_round_trip(&descriptor, &frame, options);
    assert_eq!(copied.statistics.copy_subblocks, 4 * 15);
    assert!(copied.bytes.len() < plain.bytes.len());
}

#[test]
fn limited_bit_count() {
    let mut random = StdRng::seed_from_u64(0x1);
    let descriptor = FrameDescriptor::new(Vec2(32, 32), SuperblockLayout::Square, &[8, 8, 8], false).unwrap();
    let frame = smooth_frame(&descriptor, &mut random, 64);
    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());

    let options = DecodeOptions { max_bit_count: Some(1), ..DecodeOptions::default() };
    let limited = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).unwrap();
    assert_ne!(limited.frame, frame);

    let options = DecodeOptions { max_bit_count: Some(8), ..DecodeOptions::default() };
    let unlimited = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).unwrap();
    assert_eq!(unlimited.frame, frame);
}

#[test]
fn solid_headers_can_be_rejected() {
    let descriptor = FrameDescriptor::new(Vec2(16, 16), SuperblockLayout::Square, &[8, 8, 8], false).unwrap();
    let frame = Frame::from_fn(&descriptor, |_, _| 9);
    let encoded = assert_round_trip(&descriptor, &frame, EncodeOptions::default());

    let options = DecodeOptions { allow_zeroed_headers: false, ..DecodeOptions::default() };
    assert!(decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).is_err());
}
