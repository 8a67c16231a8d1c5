
//! Handle superblocks: the samples of one superblock area,
//! and functions that decode or encode a superblock with its header.

pub mod reader;
pub mod writer;

use crate::compression::SubblockSamples;
use crate::meta::{FrameDescriptor, SubblockPosition};


/// Number of samples per component in one superblock.
pub const SUPERBLOCK_SAMPLES: usize = 256;

/// The samples of all components of one superblock.
/// Each component is stored in rows of the superblock width.
/// Subsampled chroma only occupies the top left part of its array,
/// but uses the same row stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {

    /// Width of each sample row.
    pub stride: usize,

    /// The samples of each component.
    pub samples: [[u32; SUPERBLOCK_SAMPLES]; 4],
}

impl Superblock {

    /// All samples zero.
    pub fn new(descriptor: &FrameDescriptor) -> Self {
        Superblock { stride: descriptor.superblock_size().0, samples: [[0; SUPERBLOCK_SAMPLES]; 4] }
    }

    /// Every sample of a component has the component's color.
    pub fn solid(descriptor: &FrameDescriptor, color: [u32; 4]) -> Self {
        let mut superblock = Self::new(descriptor);

        for (component, &value) in color.iter().enumerate().take(descriptor.component_count) {
            superblock.samples[component] = [value; SUPERBLOCK_SAMPLES];
        }

        superblock
    }

    /// The value of each component, if every sample of that component is the same.
    /// Returns `None` if any component varies.
    pub fn solid_color(&self, descriptor: &FrameDescriptor) -> Option<[u32; 4]> {
        let mut color = [0_u32; 4];

        for (component, samples) in self.samples.iter().enumerate().take(descriptor.component_count) {
            let first = samples[0];
            if samples.iter().any(|&sample| sample != first) { return None; }
            color[component] = first;
        }

        Some(color)
    }

    /// Copy the 4×4 samples of one subblock slot out of the superblock.
    pub fn subblock(&self, descriptor: &FrameDescriptor, position: SubblockPosition) -> SubblockSamples {
        let plane = &descriptor.planes[position.plane];
        let mut subblock: SubblockSamples = [[0; 16]; 4];

        for (index, target) in subblock.iter_mut().enumerate().take(plane.component_count) {
            let source = &self.samples[plane.first_component + index];

            for (pixel, sample) in target.iter_mut().enumerate() {
                *sample = source[self.index(position, pixel)];
            }
        }

        subblock
    }

    /// Copy the 4×4 samples of one subblock slot into the superblock.
    pub fn set_subblock(&mut self, descriptor: &FrameDescriptor, position: SubblockPosition, subblock: &SubblockSamples) {
        let plane = &descriptor.planes[position.plane];

        for (index, source) in subblock.iter().enumerate().take(plane.component_count) {
            for (pixel, &sample) in source.iter().enumerate() {
                let target = self.index(position, pixel);
                self.samples[plane.first_component + index][target] = sample;
            }
        }
    }

    /// Array index of a raster ordered pixel of the subblock.
    fn index(&self, position: SubblockPosition, pixel: usize) -> usize {
        (position.y + pixel / 4) * self.stride + position.x + pixel % 4
    }
}


/// Counts of what a coding pass encountered.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct BlockStatistics {

    /// Superblocks stored as a single color in the header.
    pub solid_superblocks: usize,

    /// Subblock slots that repeat the previous subblock.
    pub copy_subblocks: usize,

    /// Subblock slots stored without compression.
    pub uncompressed_subblocks: usize,

    /// Subblock slots stored as compressed trees.
    pub compressed_subblocks: usize,

    /// Total bytes of all subblock payloads, excluding copies.
    pub payload_bytes: u64,
}

impl BlockStatistics {

    /// Add the counts of another pass.
    pub fn merge(&mut self, other: BlockStatistics) {
        self.solid_superblocks += other.solid_superblocks;
        self.copy_subblocks += other.copy_subblocks;
        self.uncompressed_subblocks += other.uncompressed_subblocks;
        self.compressed_subblocks += other.compressed_subblocks;
        self.payload_bytes += other.payload_bytes;
    }
}
