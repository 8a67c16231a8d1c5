#[macro_use]
extern crate bencher;

extern crate afbc;
use afbc::prelude::*;

use bencher::Bencher;


fn descriptor() -> FrameDescriptor {
    FrameDescriptor::new(Vec2(512, 512), SuperblockLayout::Square, &[8, 8, 8, 8], false).unwrap()
}

/// Smooth gradients with a little noise, like a rendered user interface.
fn frame(descriptor: &FrameDescriptor) -> Frame {
    let mut state = 0x2545_f491_u32;

    Frame::from_fn(descriptor, |component, Vec2(x, y)| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;

        ((x / 2 + y / 3 + component * 40) as u32 + state % 3) & 255
    })
}

fn encode_rgba(bench: &mut Bencher) {
    let descriptor = descriptor();
    let frame = frame(&descriptor);

    bench.iter(||{
        let encoded = encode_frame(&descriptor, &frame, EncodeOptions::default()).unwrap();
        bencher::black_box(encoded);
    })
}

fn encode_rgba_uncompressed(bench: &mut Bencher) {
    let descriptor = descriptor();
    let frame = frame(&descriptor);

    bench.iter(||{
        let encoded = encode_frame(&descriptor, &frame, EncodeOptions::uncompressed()).unwrap();
        bencher::black_box(encoded);
    })
}

fn decode_rgba(bench: &mut Bencher) {
    let descriptor = descriptor();
    let encoded = encode_frame(&descriptor, &frame(&descriptor), EncodeOptions::default()).unwrap();

    bench.iter(||{
        let decoded = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, DecodeOptions::default()).unwrap();
        bencher::black_box(decoded);
    })
}

/// Decode on the current thread only
fn decode_rgba_non_parallel(bench: &mut Bencher) {
    let descriptor = descriptor();
    let encoded = encode_frame(&descriptor, &frame(&descriptor), EncodeOptions::default()).unwrap();
    let options = DecodeOptions { parallel: false, ..DecodeOptions::default() };

    bench.iter(||{
        let decoded = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, options).unwrap();
        bencher::black_box(decoded);
    })
}

/// Decode with all conformance checks enabled
fn decode_rgba_conformance(bench: &mut Bencher) {
    let descriptor = descriptor();
    let encoded = encode_frame(&descriptor, &frame(&descriptor), EncodeOptions::default()).unwrap();

    bench.iter(||{
        let decoded = decode_frame(&descriptor, &encoded.bytes, encoded.bytes.len() as u64, DecodeOptions::conformance()).unwrap();
        bencher::black_box(decoded);
    })
}


benchmark_group!(codec,
    encode_rgba,
    encode_rgba_uncompressed,
    decode_rgba,
    decode_rgba_non_parallel,
    decode_rgba_conformance
);

benchmark_main!(codec);
