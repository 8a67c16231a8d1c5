
//! The minimum value quadtree of one component of a 4×4 subblock.
//! The root holds the minimum of the whole subblock, each of the four
//! quadrant nodes holds the offset of its 2×2 minimum from the root,
//! and each of the sixteen leaves holds the offset of its pixel from its quadrant.

use crate::error::{Error, Result};
use crate::math::bit_count;


/// How many bits the children of a node need, or a signal
/// that the subblock component is constant.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BitCount {

    /// Each child delta has this many bits.
    Count(u8),

    /// All pixels have the root value. No deltas are stored.
    Uniform,

    /// All pixels have the default color of the component.
    /// Not even the root value is stored.
    DefaultColor,
}

/// Width of the root bit count field for each compressed bit depth.
const ROOT_COUNT_BITS: [u32; 18] = [0, 2, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5];

impl BitCount {

    /// Width of the root bit count field for a component of the specified depth.
    pub fn field_bits(depth: u32) -> Result<u32> {
        match ROOT_COUNT_BITS.get(depth as usize) {
            Some(&bits) if bits > 0 => Ok(bits),
            _ => Err(Error::unsupported(format!("compressed bit depth {}", depth))),
        }
    }

    /// Interpret a root bit count field of `field_bits` width.
    /// The two highest codes are reserved for the constant variants.
    pub fn from_code(code: u32, field_bits: u32) -> Self {
        let all_ones = (1 << field_bits) - 1;

        if code == all_ones { BitCount::Uniform }
        else if code == all_ones - 1 { BitCount::DefaultColor }
        else { BitCount::Count(code as u8) }
    }

    /// The root bit count field value of `field_bits` width.
    pub fn to_code(self, field_bits: u32) -> u32 {
        let all_ones = (1 << field_bits) - 1;

        match self {
            BitCount::Count(count) => u32::from(count),
            BitCount::Uniform => all_ones,
            BitCount::DefaultColor => all_ones - 1,
        }
    }
}


/// The three levels of a quadtree over a 4×4 subblock.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct QuadTree<T> {

    /// The node covering the whole subblock.
    pub root: T,

    /// The 2×2 quadrants: top left, top right, bottom left, bottom right.
    pub quadrants: [T; 4],

    /// The pixels, grouped by quadrant: leaf `4 * q + i` is child `i` of quadrant `q`.
    pub leaves: [T; 16],
}

impl<T> QuadTree<T> {

    /// The four leaves below the quadrant.
    pub fn quadrant_leaves(&self, quadrant: usize) -> &[T] {
        &self.leaves[quadrant * 4 .. quadrant * 4 + 4]
    }

    /// The four leaves below the quadrant.
    pub fn quadrant_leaves_mut(&mut self, quadrant: usize) -> &mut [T] {
        &mut self.leaves[quadrant * 4 .. quadrant * 4 + 4]
    }
}

/// Index of the pixel in a raster ordered 4×4 subblock
/// that corresponds to child `child` of quadrant `quadrant`.
#[inline]
pub fn pixel_index(quadrant: usize, child: usize) -> usize {
    let x = (quadrant & 1) * 2 + (child & 1);
    let y = (quadrant >> 1) * 2 + (child >> 1);
    y * 4 + x
}


/// The complete compressed description of one component of a subblock.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ComponentTree {

    /// Bit count of the quadrant deltas, or a constant signal.
    pub root_count: BitCount,

    /// Bit count of the leaf deltas of each quadrant.
    /// Only meaningful if the root count is a `Count`.
    pub quadrant_counts: [u8; 4],

    /// The absolute root value and all deltas.
    pub values: QuadTree<u32>,
}

impl Default for ComponentTree {
    fn default() -> Self {
        ComponentTree { root_count: BitCount::Uniform, quadrant_counts: [0; 4], values: QuadTree::default() }
    }
}

impl ComponentTree {

    /// Build the minimum tree of a raster ordered 4×4 block of a component with `depth` bits.
    /// The bit counts are constrained such that each quadrant count
    /// differs from the root count by -2 to +1.
    pub fn build(pixels: &[u32; 16], depth: u32, wraparound: bool) -> Result<Self> {
        let mask = (1_u32 << depth) - 1;
        let mut values = QuadTree::<u32>::default();
        let mut quadrant_counts = [0_i32; 4];
        let mut quadrant_minimums = [0_u32; 4];

        for quadrant in 0 .. 4 {
            let leaves = [0, 1, 2, 3].map(|child| pixels[pixel_index(quadrant, child)]);
            let (leaves, minimum, maximum) = select_minimum(leaves, depth, wraparound);

            for (delta, leaf) in values.quadrant_leaves_mut(quadrant).iter_mut().zip(leaves) {
                *delta = leaf.wrapping_sub(minimum) & mask;
            }

            quadrant_counts[quadrant] = bit_count(maximum - minimum) as i32;
            quadrant_minimums[quadrant] = minimum;
        }

        let (minimums, minimum, maximum) = select_minimum(quadrant_minimums, depth, wraparound);
        for (delta, quadrant) in values.quadrants.iter_mut().zip(minimums) {
            *delta = quadrant.wrapping_sub(minimum) & mask;
        }

        values.root = minimum & mask;
        let mut root_count = bit_count(maximum - minimum) as i32;

        if root_count == 0 && quadrant_counts.iter().all(|&count| count == 0) {
            return Ok(ComponentTree { root_count: BitCount::Uniform, quadrant_counts: [0; 4], values });
        }

        // the quadrant counts are stored as two bit deltas from the root count
        let highest_quadrant = quadrant_counts.iter().copied().max().unwrap_or(0);
        root_count = root_count.max(highest_quadrant - 1);

        for count in &mut quadrant_counts {
            *count = (*count).max(root_count - 2);
        }

        if quadrant_counts.iter().any(|&count| count < root_count - 2 || count > root_count + 1) {
            return Err(Error::invalid("bit count tree is not constrained"));
        }

        Ok(ComponentTree {
            root_count: BitCount::Count(root_count as u8),
            quadrant_counts: quadrant_counts.map(|count| count as u8),
            values,
        })
    }

    /// Compute the raster ordered 4×4 pixels of a component with `depth` bits.
    pub fn reconstruct(&self, depth: u32) -> [u32; 16] {
        let mask = ((1_u64 << depth) - 1) as u32;
        let mut pixels = [0_u32; 16];

        for quadrant in 0 .. 4 {
            let base = self.values.root.wrapping_add(self.values.quadrants[quadrant]);

            for (child, &delta) in self.values.quadrant_leaves(quadrant).iter().enumerate() {
                pixels[pixel_index(quadrant, child)] = base.wrapping_add(delta) & mask;
            }
        }

        pixels
    }
}


/// Minimum and maximum of four node values.
/// With `wraparound`, values clustered at both ends of the range are
/// treated as neighbours: if some values are in the lowest quarter,
/// some in the highest quarter and none in between, the low values
/// are moved above the range before taking minimum and maximum.
/// Returns the possibly moved values.
fn select_minimum(mut values: [u32; 4], depth: u32, wraparound: bool) -> ([u32; 4], u32, u32) {
    if wraparound && depth >= 2 {
        let mut quarters = [0_usize; 4];

        for value in values {
            quarters[((value >> (depth - 2)) & 3) as usize] += 1;
        }

        if quarters[0] > 0 && quarters[1] == 0 && quarters[2] == 0 && quarters[3] > 0 {
            for value in &mut values {
                if *value >> (depth - 1) == 0 {
                    *value += 1 << depth;
                }
            }
        }
    }

    let minimum = values.iter().copied().min().unwrap_or(0);
    let maximum = values.iter().copied().max().unwrap_or(0);
    (values, minimum, maximum)
}
