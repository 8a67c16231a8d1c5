
//! Simple math utilities.



/// Simple two-dimensional vector of any numerical type.
/// Used for pixel sizes, pixel positions and superblock grid coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2<T> (pub T, pub T);

impl<T> Vec2<T> {

    /// Maps all components of this vector to a new type, yielding a vector of that new type.
    pub fn map<B>(self, map: impl Fn(T) -> B) -> Vec2<B> {
        Vec2(map(self.0), map(self.1))
    }

    /// Try to convert all components of this vector to a new type,
    /// yielding either a vector of that new type, or an error.
    pub fn try_from<S>(value: Vec2<S>) -> std::result::Result<Self, T::Error> where T: TryFrom<S> {
        let x = T::try_from(value.0)?;
        let y = T::try_from(value.1)?;
        Ok(Vec2(x, y))
    }

    /// Seeing this vector as a dimension or size (width and height),
    /// this returns the area that this dimensions contains (`width * height`).
    pub fn area(self) -> T where T: std::ops::Mul<T, Output = T> {
        self.0 * self.1
    }

    /// The first component of this 2D vector.
    pub fn x(self) -> T { self.0 }

    /// The second component of this 2D vector.
    pub fn y(self) -> T { self.1 }

    /// The first component of this 2D vector.
    pub fn width(self) -> T { self.0 }

    /// The second component of this 2D vector.
    pub fn height(self) -> T { self.1 }
}


impl<T: std::ops::Add<T>> std::ops::Add<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn add(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 + other.0, self.1 + other.1)
    }
}

impl<T: std::ops::Sub<T>> std::ops::Sub<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn sub(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 - other.0, self.1 - other.1)
    }
}

impl<T: std::ops::Div<T>> std::ops::Div<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn div(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 / other.0, self.1 / other.1)
    }
}

impl<T: std::ops::Mul<T>> std::ops::Mul<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn mul(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 * other.0, self.1 * other.1)
    }
}

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self { Vec2(x, y) }
}

impl<T> From<Vec2<T>> for (T, T) {
    fn from(vec2: Vec2<T>) -> Self { (vec2.0, vec2.1) }
}


/// Number of bits required to represent the value,
/// that is, the position of the highest set bit plus one. Returns 0 for 0.
#[inline]
pub(crate) fn bit_count(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

/// Round the number up to the next multiple of `multiple`.
/// The multiple must not be zero.
#[inline]
pub(crate) fn round_up_to_multiple(number: u64, multiple: u64) -> u64 {
    RoundingMode::Up.divide(number, multiple) * multiple
}


/// Round up or down in specific calculations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RoundingMode {

    /// Round down.
    Down,

    /// Round up.
    Up,
}

impl RoundingMode {

    /// Divide, rounding the result as specified. Only works for positive numbers.
    pub(crate) fn divide<T>(self, dividend: T, divisor: T) -> T
        where T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Div<Output = T> + From<u8>
    {
        match self {
            RoundingMode::Up => (dividend + divisor - T::from(1_u8)) / divisor,
            RoundingMode::Down => dividend / divisor,
        }
    }
}
