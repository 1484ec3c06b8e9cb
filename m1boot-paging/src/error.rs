//! Mapping errors
//!
//! Every error here is a boot-time configuration mistake, so none of them is
//! retried. They are returned to the caller, which is expected to halt.

use core::fmt;

use crate::address::{PA, VA};

/// Which part of a mapping request failed the block alignment check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignField {
    /// Virtual start address
    Virtual,
    /// Physical start address
    Physical,
    /// Length in bytes
    Length,
}

impl fmt::Display for AlignField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtual => write!(f, "virtual address"),
            Self::Physical => write!(f, "physical address"),
            Self::Length => write!(f, "size"),
        }
    }
}

/// Errors that can occur while building the translation tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "mapping errors must be handled"]
pub enum MapError {
    /// A request value is not a multiple of the 32MB block size
    Misaligned {
        /// The offending part of the request
        field: AlignField,
        /// The offending value
        value: u64,
    },
    /// The leaf entry for this address is already populated
    AlreadyMapped {
        /// Virtual address of the block
        va: VA,
    },
    /// The virtual or physical range runs past the 48-bit address space
    OutOfRange {
        /// Virtual start address of the request
        va: VA,
        /// Physical start address of the request
        pa: PA,
        /// Length in bytes
        length: u64,
    },
    /// Every leaf table in the pool is already in use
    PoolExhausted {
        /// Virtual address that needed a new leaf table
        va: VA,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned { field, value } => {
                write!(f, "{field} not aligned to 32MB: {value:#x}")
            }
            Self::AlreadyMapped { va } => write!(f, "mapping for {va} already exists"),
            Self::OutOfRange { va, pa, length } => write!(
                f,
                "mapping {va} -> {pa} ({length:#x} bytes) exceeds the 48-bit address space"
            ),
            Self::PoolExhausted { va } => {
                write!(f, "not enough space to create an additional L2 table to map {va}")
            }
        }
    }
}
