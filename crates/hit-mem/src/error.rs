//! Memory-layer error types.

use std::error::Error;
use std::fmt;

/// Recoverable failures reported by the memory primitives.
///
/// Contract violations (popping past the cursor, indexing out of range)
/// are not represented here: they panic, because continuing would operate
/// on corrupted bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// A zero-byte (or zero-element) allocation was requested.
    ZeroSize,
    /// `create` was called on an arena that already owns a buffer.
    AlreadyCreated {
        /// Capacity of the existing buffer in bytes.
        capacity: usize,
    },
    /// No free range is large enough for the request.
    OutOfSpace {
        /// Number of bytes requested.
        requested: u64,
        /// Size of the largest free range, 0 when the free list is empty.
        largest_free: u64,
    },
    /// A released range lies outside the managed region or is empty.
    InvalidRange {
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        size: u64,
        /// Size of the managed region.
        total: u64,
    },
    /// A released range overlaps space that is already free.
    DoubleFree {
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        size: u64,
    },
    /// A free list was asked to shrink.
    ShrinkRejected {
        /// Current managed size.
        current: u64,
        /// Requested managed size.
        requested: u64,
    },
    /// A configuration value failed validation.
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize => write!(f, "zero-sized allocation requested"),
            Self::AlreadyCreated { capacity } => {
                write!(f, "arena already created with {capacity} bytes")
            }
            Self::OutOfSpace {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of space: requested {requested} bytes, largest free range {largest_free} bytes"
                )
            }
            Self::InvalidRange {
                offset,
                size,
                total,
            } => {
                write!(
                    f,
                    "invalid range: [{offset}, {}) in a region of {total} bytes",
                    offset.saturating_add(*size)
                )
            }
            Self::DoubleFree { offset, size } => {
                write!(
                    f,
                    "range [{offset}, {}) overlaps free space",
                    offset.saturating_add(*size)
                )
            }
            Self::ShrinkRejected { current, requested } => {
                write!(
                    f,
                    "cannot shrink free list from {current} to {requested} bytes"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_range_bounds() {
        let err = MemoryError::DoubleFree {
            offset: 5,
            size: 10,
        };
        assert_eq!(err.to_string(), "range [5, 15) overlaps free space");
    }

    #[test]
    fn out_of_space_reports_largest_range() {
        let err = MemoryError::OutOfSpace {
            requested: 64,
            largest_free: 16,
        };
        assert!(err.to_string().contains("largest free range 16"));
    }
}
