
//! Error type definitions.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::num::TryFromIntError;
use crate::math::Vec2;


// Export types

/// A result that may contain an afbc error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains an afbc error.
pub type UnitResult = Result<()>;


/// A fatal error that may happen while encoding or decoding a surface.
/// Distinguishes between unsupported configurations, invalid data,
/// and buffer overflows. Conformance violations are not errors,
/// see `crate::conformance` for those.
#[derive(Debug)]
pub enum Error {

    /// The configuration is not supported by
    /// this specific implementation of afbc,
    /// even though it may be valid.
    NotSupported(Cow<'static, str>),

    /// The contents of the buffer are contradicting or insufficient.
    /// Also returned when the encoder detects an internal inconsistency.
    Invalid(Cow<'static, str>),

    /// A bit read or write would leave the physical bounds of a buffer.
    Overflow(Cow<'static, str>),

    /// Another error, attributed to the superblock
    /// (and optionally the subblock slot) where it happened.
    Located {

        /// Grid coordinate of the superblock, in superblock units.
        superblock: Vec2<usize>,

        /// Index of the subblock slot within the superblock layout, if known.
        subblock: Option<usize>,

        /// The actual error.
        error: Box<Error>,
    },
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create an error of the variant `Overflow`.
    pub(crate) fn overflow(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Overflow(message.into())
    }

    /// Attribute this error to a superblock. Does not wrap twice.
    pub(crate) fn at_superblock(self, superblock: Vec2<usize>, subblock: Option<usize>) -> Self {
        match self {
            located @ Error::Located { .. } => located,
            error => Error::Located { superblock, subblock, error: Box::new(error) },
        }
    }

    /// The innermost error, without location information.
    pub fn cause(&self) -> &Error {
        match self {
            Error::Located { error, .. } => error.cause(),
            other => other,
        }
    }
}

/// Enable using the `?` operator on integer conversions.
impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Self {
        Error::invalid("invalid size")
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Located { ref error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
            Error::Overflow(message) => write!(formatter, "buffer overflow: {}", message),

            Error::Located { superblock, subblock: Some(subblock), error } =>
                write!(formatter, "superblock ({}, {}) subblock {}: {}", superblock.0, superblock.1, subblock, error),

            Error::Located { superblock, subblock: None, error } =>
                write!(formatter, "superblock ({}, {}): {}", superblock.0, superblock.1, error),
        }
    }
}


/// Return error on invalid range.
#[inline]
pub(crate) fn u64_to_usize(value: u64, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on values that do not fit into a header field.
#[inline]
pub(crate) fn usize_to_u32(value: usize, error_message: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::unsupported(error_message))
}
