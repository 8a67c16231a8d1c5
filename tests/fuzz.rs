//! Fuzzy testing.
//! Tries to discover panics with random and damaged buffers.
//! The long running test is marked with `#[ignore]`. To run it, use `cargo test -- --ignored`.

extern crate afbc;

use std::panic::catch_unwind;
use afbc::prelude::*;
use afbc::error::Error;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;


fn descriptors() -> Vec<FrameDescriptor> {
    let mut descriptors = Vec::new();

    for &layout in SuperblockLayout::ALL.iter() {
        let subsampled = layout.subsampling() != meta::Subsampling::None;

        for &bits in &[8_u32, 10] {
            let input_bits: &[u32] = if subsampled { &[bits, bits, bits] } else { &[bits, bits, bits, bits] };
            let descriptor = FrameDescriptor::new(Vec2(40, 24), layout, input_bits, false).unwrap();

            descriptors.push(descriptor.clone().with_addressing(AddressingMode::Sparse).unwrap());
            descriptors.push(descriptor.clone().with_block_split(true));
            descriptors.push(descriptor.with_crop(Vec2(3, 1)).unwrap());
        }
    }

    descriptors.push(
        FrameDescriptor::new(Vec2(40, 24), SuperblockLayout::Square, &[8, 8, 8, 8], true).unwrap()
            .with_addressing(AddressingMode::Tiled).unwrap()
    );

    descriptors
}

fn encoded_frame(descriptor: &FrameDescriptor, random: &mut StdRng) -> Vec<u8> {
    let frame = Frame::from_fn(descriptor, |component, Vec2(x, y)| {
        let mask = (1_u32 << descriptor.input_bits[component]) - 1;
        ((x + y * 2) as u32 + random.random_range(0 .. 8)) & mask
    });

    encode_frame(descriptor, &frame, EncodeOptions::default()).unwrap().bytes
}

/// Decode with every option enabled. Returns false if decoding panicked.
fn decodes_without_panic(descriptor: &FrameDescriptor, bytes: Vec<u8>, frame_size: u64, max_bit_count: Option<u8>) -> bool {
    let result = catch_unwind(move || {
        let options = DecodeOptions {
            max_bit_count,
            zero_fill_outside_frame: true,
            ..DecodeOptions::conformance()
        };

        decode_frame(descriptor, &bytes, frame_size, options)
    });

    match result {
        Ok(Ok(_)) => true,
        Ok(Err(error)) => match error.cause() {
            Error::Invalid(_) | Error::NotSupported(_) | Error::Overflow(_) => true,
            Error::Located { .. } => false,
        },
        Err(_) => false,
    }
}


#[test]
fn random_buffers() {
    let mut random = StdRng::seed_from_u64(0xf022);

    for descriptor in descriptors() {
        for _ in 0 .. 16 {
            let length = random.random_range(0 ..= descriptor.max_frame_size() as usize);
            let bytes: Vec<u8> = (0 .. length).map(|_| random.random::<u8>()).collect();
            let frame_size = random.random_range(0 ..= descriptor.max_frame_size());

            assert!(
                decodes_without_panic(&descriptor, bytes, frame_size, None),
                "random buffer panicked for {:?}", descriptor
            );
        }
    }
}

#[test]
fn damaged_frames() {
    let mut random = StdRng::seed_from_u64(0xda3a);

    for descriptor in descriptors() {
        let original = encoded_frame(&descriptor, &mut random);

        for _ in 0 .. 64 {
            let mut bytes = original.clone();

            for _ in 0 .. random.random_range(1 .. 4) {
                let index = random.random_range(0 .. bytes.len());
                bytes[index] = random.random();
            }

            if random.random_bool(0.25) {
                let length = random.random_range(0 .. bytes.len());
                bytes.truncate(length);
            }

            let frame_size = original.len() as u64;
            let max_bit_count = if random.random_bool(0.5) { Some(random.random_range(1 ..= 16)) } else { None };

            assert!(
                decodes_without_panic(&descriptor, bytes, frame_size, max_bit_count),
                "damaged buffer panicked for {:?}", descriptor
            );
        }
    }
}

#[test]
#[ignore]
pub fn fuzz() {
    println!("started fuzzing");
    let descriptors = descriptors();
    let mut random = StdRng::seed_from_u64(0x92_01_00_30);

    let originals: Vec<Vec<u8>> = descriptors.iter()
        .map(|descriptor| encoded_frame(descriptor, &mut random))
        .collect();

    let start_index = 0; // default is 0. increase this integer for debugging a specific fuzz case
    for fuzz_index in 0 .. 1024_u64 * 256 {
        let which = random.random_range(0 .. descriptors.len());
        let mutation_point = random.random::<f32>().powi(4);
        let mutation = random.random::<u8>();

        if fuzz_index >= start_index {
            let mut bytes = originals[which].clone();
            let index = (mutation_point * bytes.len() as f32) as usize % bytes.len();
            bytes[index] = mutation;

            let frame_size = bytes.len() as u64;
            if !decodes_without_panic(&descriptors[which], bytes, frame_size, None) {
                println!("!!! [{}]: panic in {:?}", fuzz_index, descriptors[which]);
            }
        }
    }
}
