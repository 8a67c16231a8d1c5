
//! The reversible integer transform between RGB and YUV.
//! Chroma needs one bit more than the input, luma keeps its depth.

use super::SubblockSamples;
use crate::error::{Error, UnitResult};
use crate::meta::FrameDescriptor;


/// Convert the first three components from RGB to YUV, in place.
pub fn forward(samples: &mut SubblockSamples, descriptor: &FrameDescriptor) {
    let offset = 1_u32 << descriptor.input_bits[1];

    for pixel in 0 .. 16 {
        let (red, green, blue) = (samples[0][pixel], samples[1][pixel], samples[2][pixel]);

        samples[0][pixel] = (red + 2 * green + blue) / 4;
        samples[1][pixel] = red + offset - green;
        samples[2][pixel] = blue + offset - green;
    }
}

/// Convert the first three components from YUV back to RGB, in place.
/// Fails if a resulting value does not fit the input bit depth,
/// which can only happen for data that was not produced by `forward`.
pub fn inverse(samples: &mut SubblockSamples, descriptor: &FrameDescriptor) -> UnitResult {
    let offset = 1_i64 << descriptor.input_bits[1];

    for pixel in 0 .. 16 {
        let luma = i64::from(samples[0][pixel]);
        let u = i64::from(samples[1][pixel]);
        let v = i64::from(samples[2][pixel]);

        let green = (4 * luma - u - v + 3 + 2 * offset) >> 2;
        let red = u + green - offset;
        let blue = v + green - offset;

        for (component, value) in [red, green, blue].iter().copied().enumerate() {
            if value < 0 || value >= 1_i64 << descriptor.input_bits[component] {
                return Err(Error::invalid("color transform result out of range"));
            }

            samples[component][pixel] = value as u32;
        }
    }

    Ok(())
}
