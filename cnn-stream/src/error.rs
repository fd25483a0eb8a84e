use std::fmt;

/// Errors reported before a pipeline starts.
///
/// Once the stages are running there is nothing left to reject: every
/// channel carries an element count fixed by the geometry, so a stream
/// ending early inside a run is a bug and panics instead of surfacing here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A geometry dimension is zero
    ZeroDimension(&'static str),
    /// A geometry dimension exceeds its compile-time maximum
    DimensionTooLarge {
        name: &'static str,
        value: usize,
        max: usize,
    },
    /// A supplied derived dimension disagrees with the base dimensions
    DerivedMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A buffer does not have the length the geometry requires
    BufferLen {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Paired operands differ in length
    OperandLen { left: usize, right: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroDimension(name) => write!(f, "{name} must be nonzero"),
            Error::DimensionTooLarge { name, value, max } => {
                write!(f, "{name} = {value} exceeds maximum {max}")
            }
            Error::DerivedMismatch {
                name,
                expected,
                actual,
            } => {
                write!(f, "{name} = {actual} but geometry requires {expected}")
            }
            Error::BufferLen {
                name,
                expected,
                actual,
            } => {
                write!(f, "{name} has {actual} elements, geometry requires {expected}")
            }
            Error::OperandLen { left, right } => {
                write!(f, "operand lengths differ: {left} vs {right}")
            }
        }
    }
}

impl std::error::Error for Error {}
