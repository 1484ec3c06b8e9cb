//! Default address space layout
//!
//! ```text
//! VA                      PA                      Size     Type
//! 0x00_0000_0000          0x00_0000_0000          32GB     Device-nGnRnE
//! 0x08_0000_0000          0x08_0000_0000          16GB     Normal
//! 0xf0_0000_0000          0x00_0000_0000          32GB     Device-nGnRE
//! ```
//!
//! The low 32GB holds the SoC's MMIO space and is mapped twice: identity
//! with strict device ordering, and again at 0xf0_0000_0000 with posted
//! writes allowed. DRAM follows directly above it.

use crate::address::{PA, VA};
use crate::attributes::MemoryAttribute;

/// A contiguous run of block mappings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingRequest {
    pub va: VA,
    pub pa: PA,
    /// Length in bytes
    pub length: u64,
    pub attr: MemoryAttribute,
}

impl MappingRequest {
    pub const fn new(va: u64, pa: u64, length: u64, attr: MemoryAttribute) -> Self {
        Self {
            va: VA::new(va),
            pa: PA::new(pa),
            length,
            attr,
        }
    }
}

/// Size of the MMIO window
pub const MMIO_SIZE: u64 = 0x08_0000_0000;

/// Base of the DRAM window
pub const RAM_BASE: u64 = 0x08_0000_0000;

/// Size of the DRAM window
pub const RAM_SIZE: u64 = 0x04_0000_0000;

/// Virtual base of the posted-write MMIO alias
pub const MMIO_ALIAS_BASE: u64 = 0xf0_0000_0000;

/// MMIO, identity mapped
pub const MMIO_IDENTITY: MappingRequest =
    MappingRequest::new(0, 0, MMIO_SIZE, MemoryAttribute::DeviceNgnrne);

/// MMIO again, relocated, with early write acknowledgement
pub const MMIO_ALIAS: MappingRequest =
    MappingRequest::new(MMIO_ALIAS_BASE, 0, MMIO_SIZE, MemoryAttribute::DeviceNgnre);

/// DRAM, identity mapped
pub const RAM_IDENTITY: MappingRequest =
    MappingRequest::new(RAM_BASE, RAM_BASE, RAM_SIZE, MemoryAttribute::Normal);

/// Mappings installed at startup, in installation order
pub const DEFAULT_MAPPINGS: [MappingRequest; 3] = [MMIO_IDENTITY, MMIO_ALIAS, RAM_IDENTITY];

// MMIO and DRAM share the first leaf table
const _: () = assert!(RAM_BASE + RAM_SIZE <= 1 << 36);
const _: () = assert!(MMIO_ALIAS_BASE + MMIO_SIZE <= 1 << 48);
