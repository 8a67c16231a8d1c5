
//! Produce the bit stream of one subblock.
//! The field order mirrors the decoder, see `super::decode`.

use super::{color, SubblockSamples, MAX_COMPRESSED_SUBBLOCK_SIZE};
use super::tree::{BitCount, ComponentTree};
use crate::error::{Error, Result, UnitResult};
use crate::image::EncodeOptions;
use crate::io::BitWriter;
use crate::math::round_up_to_multiple;
use crate::meta::{FrameDescriptor, PlaneDescription};


/// The result of encoding one subblock.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct EncodedSubblock {

    /// Number of bytes written to the output.
    /// Compressed subblocks are padded to the plane's size multiplier.
    pub size: usize,

    /// If every component is constant, the constant values packed
    /// into one number, 16 bits apart, first component highest.
    /// `None` if a constant value needs more than 16 bits.
    /// Used to detect neighbouring subblocks that can be copies.
    pub color: Option<u64>,

    /// Whether the subblock was stored without compression.
    pub uncompressed: bool,
}


/// Encode the subblock of a plane to the start of `output`.
/// The samples contain one raster ordered 4×4 block per component of the plane.
/// Uses the uncompressed form if compression does not save any bytes.
pub fn encode_subblock(
    descriptor: &FrameDescriptor, plane_index: usize, samples: &SubblockSamples,
    options: &EncodeOptions, output: &mut [u8],
) -> Result<EncodedSubblock>
{
    let plane = descriptor.planes.get(plane_index)
        .ok_or_else(|| Error::invalid("plane index"))?;

    let mut transformed = *samples;
    if descriptor.color_transform && plane_index == 0 {
        color::forward(&mut transformed, descriptor);
    }

    let mut trees = [ComponentTree::default(); 4];
    let mut color = Some(0_u64);

    for (index, tree) in trees.iter_mut().enumerate().take(plane.component_count) {
        let component = plane.first_component + index;
        let depth = descriptor.compressed_bits[component];

        *tree = ComponentTree::build(&transformed[index], depth, options.wraparound_minimum)?;

        color = match (color, tree.root_count) {
            (Some(color), BitCount::Uniform) if tree.values.root >> 16 == 0 => Some((color << 16) | u64::from(tree.values.root)),
            _ => None,
        };

        let default_allowed = options.rgb_default_color || component == 3;
        if default_allowed && tree.root_count == BitCount::Uniform && tree.values.root == descriptor.default_color[component] {
            tree.root_count = BitCount::DefaultColor;
        }
    }

    let compressed_size =
        if options.only_uncompressed { None }
        else { write_compressed(descriptor, plane, &trees[.. plane.component_count], output)? };

    match compressed_size {
        Some(size) => Ok(EncodedSubblock { size, color, uncompressed: false }),
        None => {
            let size = write_uncompressed(descriptor, plane, samples, output)?;
            Ok(EncodedSubblock { size, color: None, uncompressed: true })
        },
    }
}

/// Write the trees to the output, padded to the plane's size multiplier.
/// Returns `None` if the result would not be smaller than the uncompressed subblock,
/// or if its size code would not fit into the header field.
fn write_compressed(
    descriptor: &FrameDescriptor, plane: &PlaneDescription, trees: &[ComponentTree], output: &mut [u8],
) -> Result<Option<usize>>
{
    // four bit fields cannot signal wider quadrant counts to the decoder
    let representable = trees.iter().all(|tree| tree.quadrant_counts.iter().all(|&count| count < 16));
    if !representable { return Ok(None); }

    let mut scratch = [0_u8; MAX_COMPRESSED_SUBBLOCK_SIZE];
    let mut writer = BitWriter::new(&mut scratch);
    let components = plane.first_component .. plane.first_component + plane.component_count;

    for (tree, component) in trees.iter().zip(components.clone()) {
        let field_bits = BitCount::field_bits(descriptor.compressed_bits[component])?;
        writer.write(tree.root_count.to_code(field_bits), field_bits);
    }

    for tree in trees {
        if let BitCount::Count(root_count) = tree.root_count {
            for &count in &tree.quadrant_counts {
                writer.write((i32::from(count) - i32::from(root_count)) as u32, 2);
            }
        }
    }

    for (tree, component) in trees.iter().zip(components) {
        if tree.root_count != BitCount::DefaultColor {
            writer.write(tree.values.root, descriptor.compressed_bits[component]);
        }
    }

    for tree in trees {
        if let BitCount::Count(count) = tree.root_count {
            write_node(&mut writer, count, &tree.values.quadrants)?;
        }
    }

    for quadrant in 0 .. 4 {
        for tree in trees {
            if let BitCount::Count(_) = tree.root_count {
                write_node(&mut writer, tree.quadrant_counts[quadrant], tree.values.quadrant_leaves(quadrant))?;
            }
        }
    }

    let written = match writer.written_bytes() {
        Some(written) => written,
        None => return Ok(None),
    };

    let multiplier = plane.size_multiplier;
    let size = (round_up_to_multiple(written as u64, multiplier as u64) as usize).max(2 * multiplier);

    let code_limit = 1_usize << descriptor.subsampling().size_code_bits();
    if size >= plane.uncompressed_size || size > scratch.len() || size / multiplier >= code_limit {
        return Ok(None);
    }

    let target = output.get_mut(.. size)
        .ok_or_else(|| Error::overflow("subblock does not fit into the payload"))?;

    target.copy_from_slice(&scratch[.. size]);
    Ok(Some(size))
}

/// Write the child deltas of one node, see `super::decode::read_node`.
fn write_node(writer: &mut BitWriter<'_>, bit_count: u8, children: &[u32]) -> UnitResult {
    match bit_count {
        0 => {},

        1 => {
            if children.iter().all(|&child| child == 1) {
                return Err(Error::invalid("single bit node without zero delta"));
            }

            for &child in children {
                writer.write(child, 1);
            }
        },

        _ => {
            let zero_child = children.iter().position(|&child| child == 0)
                .ok_or_else(|| Error::invalid("node without zero delta"))?;

            writer.write(zero_child as u32, 2);

            for bit in 0 .. u32::from(bit_count) {
                for (index, &child) in children.iter().enumerate() {
                    if index != zero_child {
                        writer.write(child >> bit, 1);
                    }
                }
            }
        },
    }

    Ok(())
}

/// Write the original samples in raster order, each component at its input depth.
fn write_uncompressed(
    descriptor: &FrameDescriptor, plane: &PlaneDescription, samples: &SubblockSamples, output: &mut [u8],
) -> Result<usize>
{
    let mut writer = BitWriter::new(output);

    for pixel in 0 .. 16 {
        for index in 0 .. plane.component_count {
            let component = plane.first_component + index;
            writer.write(samples[index][pixel], descriptor.input_bits[component]);
        }
    }

    writer.written_bytes()
        .ok_or_else(|| Error::overflow("uncompressed subblock does not fit into the payload"))
}
