
//! Reconstruct the samples of one subblock from its bit stream.
//!
//! A compressed subblock interleaves the trees of all components of its plane.
//! All root bit counts come first, then all quadrant bit count deltas,
//! then all root values. The root nodes of all components follow,
//! and finally the quadrant nodes, quadrant by quadrant.

use super::{color, SubblockSamples};
use super::tree::{BitCount, ComponentTree};
use crate::conformance::{ConformanceReport, Violation};
use crate::error::{Error, Result};
use crate::io::BitReader;
use crate::meta::FrameDescriptor;


/// Decode the subblock of a plane from the start of `bytes`.
/// Reading is bounded by the slice, which should end at the declared subblock size.
/// Returns the samples of each component of the plane,
/// and the number of bytes the subblock actually occupies.
///
/// Nodes with more than `max_bit_count` bits per delta are skipped
/// and their children read as zero.
pub fn decode_subblock(
    descriptor: &FrameDescriptor, plane_index: usize, bytes: &[u8], uncompressed: bool,
    max_bit_count: Option<u8>, report: &mut ConformanceReport,
) -> Result<(SubblockSamples, usize)>
{
    let plane = descriptor.planes.get(plane_index)
        .ok_or_else(|| Error::invalid("plane index"))?;

    let components = plane.first_component .. plane.first_component + plane.component_count;
    let mut reader = BitReader::new(bytes);
    let mut samples: SubblockSamples = [[0; 16]; 4];

    if uncompressed {
        for pixel in 0 .. 16 {
            for (index, component) in components.clone().enumerate() {
                samples[index][pixel] = reader.read(descriptor.input_bits[component]);
            }
        }

        // uncompressed subblocks are never color transformed
        let size = reader.consumed_bytes()?;
        return Ok((samples, size));
    }

    let mut trees = [ComponentTree::default(); 4];

    for (tree, component) in trees.iter_mut().zip(components.clone()) {
        let field_bits = BitCount::field_bits(descriptor.compressed_bits[component])?;
        tree.root_count = BitCount::from_code(reader.read(field_bits), field_bits);
    }

    for (tree, component) in trees.iter_mut().zip(components.clone()) {
        let root_count = match tree.root_count {
            BitCount::Count(count) => count,
            _ => continue,
        };

        for quadrant_count in &mut tree.quadrant_counts {
            let count = i32::from(root_count) + reader.read_signed(2);

            *quadrant_count =
                if count < 0 {
                    report.record(Violation::NegativeBitCount { component });
                    (count + 16) as u8
                }
                else { (count & 15) as u8 };
        }

        let depth = descriptor.compressed_bits[component];
        for &bit_count in std::iter::once(&root_count).chain(tree.quadrant_counts.iter()) {
            if u32::from(bit_count) > depth {
                report.record(Violation::BitCountExceedsDepth { component, bit_count, depth });
            }
        }
    }

    for (tree, component) in trees.iter_mut().zip(components.clone()) {
        tree.values.root = match tree.root_count {
            BitCount::DefaultColor => descriptor.default_color[component],
            _ => reader.read(descriptor.compressed_bits[component]),
        };
    }

    for (tree, component) in trees.iter_mut().zip(components.clone()) {
        if let BitCount::Count(count) = tree.root_count {
            read_node(&mut reader, count, &mut tree.values.quadrants, component, max_bit_count, report);
        }
    }

    for quadrant in 0 .. 4 {
        for (tree, component) in trees.iter_mut().zip(components.clone()) {
            if let BitCount::Count(_) = tree.root_count {
                let count = tree.quadrant_counts[quadrant];
                let leaves = tree.values.quadrant_leaves_mut(quadrant);
                read_node(&mut reader, count, leaves, component, max_bit_count, report);
            }
        }
    }

    let size = reader.consumed_bytes()?;

    for ((component_samples, tree), component) in samples.iter_mut().zip(trees.iter()).zip(components) {
        *component_samples = tree.reconstruct(descriptor.compressed_bits[component]);
    }

    if descriptor.color_transform {
        if let Err(error) = color::inverse(&mut samples, descriptor) {
            report.record(Violation::ColorOutOfRange);
            return Err(error);
        }
    }

    Ok((samples, size))
}

/// Read the four child deltas of a node with `bit_count` bits per delta.
/// Nodes with more than one bit name a child whose delta is zero and not stored,
/// then store the remaining three deltas bit plane by bit plane.
fn read_node(
    reader: &mut BitReader<'_>, bit_count: u8, children: &mut [u32],
    component: usize, max_bit_count: Option<u8>, report: &mut ConformanceReport,
) {
    match bit_count {
        0 => {},

        1 => {
            for child in children.iter_mut() {
                *child = reader.read(1);
            }

            if children.iter().all(|&child| child == 1) {
                report.record(Violation::MissingZeroDelta { component });
            }
        },

        _ => {
            let zero_child = reader.read(2) as usize;

            if max_bit_count.map_or(false, |max| bit_count > max) {
                reader.skip(3 * usize::from(bit_count));
                return;
            }

            for bit in 0 .. u32::from(bit_count) {
                for (index, child) in children.iter_mut().enumerate() {
                    if index != zero_child {
                        *child |= reader.read(1) << bit;
                    }
                }
            }
        },
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::io::BitWriter;
    use crate::math::Vec2;
    use crate::meta::SuperblockLayout;

    fn gray8() -> FrameDescriptor {
        FrameDescriptor::new(Vec2(16, 16), SuperblockLayout::Square, &[8], false).unwrap()
    }

    #[test]
    fn uniform_root() {
        let descriptor = gray8();
        let mut bytes = [0_u8; 2];

        {
            let mut writer = BitWriter::new(&mut bytes);
            writer.write(15, 4); // uniform
            writer.write(42, 8);
        }

        let mut report = ConformanceReport::new(true);
        let (samples, size) = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report).unwrap();

        assert_eq!(samples[0], [42; 16]);
        assert_eq!(size, 2);
        assert!(report.is_conforming());
    }

    #[test]
    fn default_color_root() {
        let descriptor = gray8();
        let bytes = [14_u8];

        let mut report = ConformanceReport::new(true);
        let (samples, size) = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report).unwrap();

        assert_eq!(samples[0], [255; 16]);
        assert_eq!(size, 1);
    }

    #[test]
    fn uncompressed_raster_order() {
        let descriptor = gray8();
        let bytes: Vec<u8> = (0 .. 16).collect();

        let mut report = ConformanceReport::new(true);
        let (samples, size) = decode_subblock(&descriptor, 0, &bytes, true, None, &mut report).unwrap();

        let expected: Vec<u32> = (0 .. 16).collect();
        assert_eq!(&samples[0][..], expected.as_slice());
        assert_eq!(size, 16);
    }

    #[test]
    fn all_ones_single_bit_node() {
        let descriptor = gray8();
        let mut bytes = [0_u8; 8];

        {
            let mut writer = BitWriter::new(&mut bytes);
            writer.write(1, 4); // root count
            for _ in 0 .. 4 { writer.write(0, 2); } // quadrant counts equal to root
            writer.write(100, 8);
            writer.write(0b1111, 4); // root node without a zero delta
            for _ in 0 .. 4 { writer.write(0b0001, 4); }
        }

        let mut report = ConformanceReport::new(true);
        let (samples, size) = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report).unwrap();

        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.violations()[0].violation, Violation::MissingZeroDelta { component: 0 });
        assert_eq!(samples[0][0], 102);
        assert_eq!(samples[0][1], 101);
        assert_eq!(size, 5);
    }

    #[test]
    fn negative_quadrant_count_wraps() {
        let descriptor = gray8();
        let mut bytes = [0_u8; 8];

        {
            let mut writer = BitWriter::new(&mut bytes);
            writer.write(0, 4);
            writer.write(0b11, 2); // minus one
            for _ in 0 .. 3 { writer.write(0, 2); }
        }

        let mut report = ConformanceReport::new(true);
        let result = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report);

        assert!(report.violations().iter().any(|located| located.violation == Violation::NegativeBitCount { component: 0 }));
        assert!(report.violations().iter().any(|located| matches!(located.violation, Violation::BitCountExceedsDepth { bit_count: 15, .. })));

        // the 45 delta bits of the first quadrant do not fit into eight bytes
        assert!(matches!(result, Err(Error::Overflow(_))));
    }

    #[test]
    fn truncated_stream_overflows() {
        let descriptor = gray8();
        let bytes = [0x04_u8];

        let mut report = ConformanceReport::new(false);
        let result = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report);
        assert!(matches!(result, Err(Error::Overflow(_))));
    }

    #[test]
    fn large_nodes_are_skipped_above_limit() {
        let descriptor = gray8();
        let mut bytes = [0_u8; 32];

        {
            let mut writer = BitWriter::new(&mut bytes);
            writer.write(3, 4);
            for _ in 0 .. 4 { writer.write(0, 2); }
            writer.write(7, 8);
            writer.write(0, 2); // zero child
            writer.write(0b111_111_111, 9); // all other quadrants at delta 7
            for _ in 0 .. 4 {
                writer.write(0, 2);
                writer.write_zeroes(9);
            }
        }

        let mut report = ConformanceReport::new(false);
        let (full, full_size) = decode_subblock(&descriptor, 0, &bytes, false, None, &mut report).unwrap();
        let (limited, limited_size) = decode_subblock(&descriptor, 0, &bytes, false, Some(2), &mut report).unwrap();

        assert_eq!(full_size, limited_size);
        assert_eq!(full[0][0], 7);
        assert_eq!(full[0][2], 14);
        assert_eq!(limited[0], [7; 16]);
    }
}
