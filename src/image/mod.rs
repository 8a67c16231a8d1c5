
//! The `image` module converts between whole frames and compressed buffers.
//! A frame is a set of component planes with one `u32` per sample.
//! Decoding also produces a conformance report and statistics.

pub mod read;
pub mod write;

pub use self::read::{decode_frame, DecodedFrame};
pub use self::write::{encode_frame, EncodedFrame};

use smallvec::SmallVec;
use crate::block::Superblock;
use crate::conformance::ConformanceChecks;
use crate::error::{Error, UnitResult};
use crate::math::*;
use crate::meta::FrameDescriptor;


/// The samples of one component, in rows from top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {

    /// Width and height in samples. Subsampled chroma planes are smaller than the frame.
    pub size: Vec2<usize>,

    /// All samples, row by row. Has exactly `size.area()` entries.
    pub samples: Vec<u32>,
}

/// All components of one frame. Each component has its own plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {

    /// One plane per component, in component order.
    pub components: SmallVec<[Plane; 4]>,
}

/// How a buffer is decoded.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DecodeOptions {

    /// Which conformance rules are verified and reported.
    pub checks: ConformanceChecks,

    /// Accept superblock headers that store a solid color.
    /// If false, a solid color header aborts decoding.
    pub allow_zeroed_headers: bool,

    /// Emulate hardware that cannot decode nodes with more delta bits than this.
    pub max_bit_count: Option<u8>,

    /// Subblocks beyond the end of the frame are decoded as zero
    /// and reported, instead of aborting decoding.
    pub zero_fill_outside_frame: bool,

    /// Decode superblock rows on multiple threads, if the `rayon` feature is enabled.
    pub parallel: bool,
}

/// How a frame is encoded.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct EncodeOptions {

    /// Store constant superblocks in the header only.
    pub solid_color: bool,

    /// Replace any subblock that equals its predecessor in the same plane by a copy.
    /// Otherwise, only constant subblocks are replaced.
    pub copy_all_patterns: bool,

    /// Never compress subblocks.
    pub only_uncompressed: bool,

    /// Forbid copies on the first subblock of the lower half of a superblock.
    pub disable_copy_rows: bool,

    /// Treat values near both ends of the range as neighbours when building trees.
    pub wraparound_minimum: bool,

    /// Allow the default color signal for red, green and blue, not only for alpha.
    pub rgb_default_color: bool,
}


impl Plane {

    /// A plane with all samples zero.
    pub fn new(size: Vec2<usize>) -> Self {
        Plane { size, samples: vec![0; size.area()] }
    }

    /// A plane with each sample computed from its position.
    pub fn from_fn(size: Vec2<usize>, mut sample: impl FnMut(Vec2<usize>) -> u32) -> Self {
        let samples = (0 .. size.1)
            .flat_map(|y| (0 .. size.0).map(move |x| Vec2(x, y)))
            .map(|position| sample(position))
            .collect();

        Plane { size, samples }
    }

    /// The sample at the position. Panics if the position is outside the plane.
    pub fn get(&self, position: Vec2<usize>) -> u32 {
        self.samples[position.1 * self.size.0 + position.0]
    }

    /// Replace the sample at the position. Panics if the position is outside the plane.
    pub fn set(&mut self, position: Vec2<usize>, sample: u32) {
        let index = position.1 * self.size.0 + position.0;
        self.samples[index] = sample;
    }
}

impl Frame {

    /// A frame with all samples zero, with plane sizes matching the descriptor.
    pub fn new(descriptor: &FrameDescriptor) -> Self {
        Self::from_fn(descriptor, |_, _| 0)
    }

    /// A frame with each sample computed from its component index and position.
    pub fn from_fn(descriptor: &FrameDescriptor, mut sample: impl FnMut(usize, Vec2<usize>) -> u32) -> Self {
        let components = (0 .. descriptor.component_count)
            .map(|component| Plane::from_fn(descriptor.component_size(component), |position| sample(component, position)))
            .collect();

        Frame { components }
    }

    /// Fails if the number or sizes of the planes do not match the descriptor,
    /// or if a sample does not fit its bit depth.
    pub fn validate(&self, descriptor: &FrameDescriptor) -> UnitResult {
        if self.components.len() != descriptor.component_count {
            return Err(Error::invalid("frame component count does not match the descriptor"));
        }

        for (component, plane) in self.components.iter().enumerate() {
            if plane.size != descriptor.component_size(component) || plane.samples.len() != plane.size.area() {
                return Err(Error::invalid(format!("plane {} does not match the descriptor", component)));
            }

            let limit = 1_u64 << descriptor.input_bits[component];
            if plane.samples.iter().any(|&sample| u64::from(sample) >= limit) {
                return Err(Error::invalid(format!("plane {} has samples above its bit depth", component)));
            }
        }

        Ok(())
    }

    /// Place the samples of a decoded superblock.
    /// Samples that fall into the crop area or beyond the plane are dropped.
    pub(crate) fn insert_superblock(&mut self, descriptor: &FrameDescriptor, position: Vec2<usize>, superblock: &Superblock) {
        for (component, plane) in self.components.iter_mut().enumerate() {
            let area = SuperblockArea::new(descriptor, component, position);

            for y in 0 .. area.size.1 {
                let target_y = match area.target(y, 1, plane.size) { Some(y) => y, None => continue };

                for x in 0 .. area.size.0 {
                    if let Some(target_x) = area.target(x, 0, plane.size) {
                        plane.samples[target_y * plane.size.0 + target_x] = superblock.samples[component][y * superblock.stride + x];
                    }
                }
            }
        }
    }

    /// Gather the samples of one superblock.
    /// Positions in the crop area or beyond the plane repeat the nearest edge sample.
    pub(crate) fn extract_superblock(&self, descriptor: &FrameDescriptor, position: Vec2<usize>) -> Superblock {
        let mut superblock = Superblock::new(descriptor);

        for (component, plane) in self.components.iter().enumerate() {
            let area = SuperblockArea::new(descriptor, component, position);

            for y in 0 .. area.size.1 {
                let source_y = area.clamped(y, 1, plane.size);

                for x in 0 .. area.size.0 {
                    let source_x = area.clamped(x, 0, plane.size);
                    superblock.samples[component][y * superblock.stride + x] = plane.samples[source_y * plane.size.0 + source_x];
                }
            }
        }

        superblock
    }
}

/// The part of a component plane that one superblock covers.
struct SuperblockArea {

    /// Samples per row and rows of the component in one superblock.
    size: Vec2<usize>,

    /// Plane coordinate of the first superblock sample, before cropping.
    origin: Vec2<usize>,

    /// Samples at the left and top hidden by the crop.
    /// Rounded down for subsampled planes, so that the last sample still fits the grid.
    /// Decoders that round up instead place the chroma of odd crops one sample further.
    crop: Vec2<usize>,
}

impl SuperblockArea {
    fn new(descriptor: &FrameDescriptor, component: usize, position: Vec2<usize>) -> Self {
        let divisor = descriptor.plane_divisor(descriptor.plane_of_component(component));
        let size = descriptor.superblock_size() / divisor;

        SuperblockArea {
            size,
            origin: position * size,
            crop: Vec2(
                RoundingMode::Down.divide(descriptor.crop.0, divisor.0),
                RoundingMode::Down.divide(descriptor.crop.1, divisor.1),
            ),
        }
    }

    fn coordinate(&self, offset: usize, axis: usize) -> Option<usize> {
        let (origin, crop) = if axis == 0 { (self.origin.0, self.crop.0) } else { (self.origin.1, self.crop.1) };
        (origin + offset).checked_sub(crop)
    }

    /// Plane coordinate of the superblock sample, if it is visible.
    fn target(&self, offset: usize, axis: usize, plane_size: Vec2<usize>) -> Option<usize> {
        let limit = if axis == 0 { plane_size.0 } else { plane_size.1 };
        self.coordinate(offset, axis).filter(|&coordinate| coordinate < limit)
    }

    /// Plane coordinate of the superblock sample, moved into the plane.
    fn clamped(&self, offset: usize, axis: usize, plane_size: Vec2<usize>) -> usize {
        let limit = if axis == 0 { plane_size.0 } else { plane_size.1 };
        self.coordinate(offset, axis).unwrap_or(0).min(limit.saturating_sub(1))
    }
}


impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            checks: ConformanceChecks::default(),
            allow_zeroed_headers: true,
            max_bit_count: None,
            zero_fill_outside_frame: false,
            parallel: true,
        }
    }
}

impl DecodeOptions {

    /// Verify every conformance rule while decoding.
    pub fn conformance() -> Self {
        DecodeOptions {
            checks: ConformanceChecks { enabled: true, first_superblock_tile_alignment: true, ..ConformanceChecks::default() },
            ..Self::default()
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            solid_color: true,
            copy_all_patterns: false,
            only_uncompressed: false,
            disable_copy_rows: false,
            wraparound_minimum: false,
            rgb_default_color: false,
        }
    }
}

impl EncodeOptions {

    /// Store every subblock uncompressed, without solid colors or copies.
    pub fn uncompressed() -> Self {
        EncodeOptions { solid_color: false, only_uncompressed: true, ..Self::default() }
    }
}
