//! Paging - Static translation tables for early boot
//!
//! This crate builds the EL2 stage 1 translation tables used while the
//! firmware brings the MMU up. The scheme is deliberately small: a 16KB
//! granule, and 32MB block mappings made directly from the third level, so a
//! virtual address only ever splits into
//!
//! ```text
//! [root index]  [L1 index]  [L2 index]  [block offset]
//!    1 bit       11 bits     11 bits       25 bits
//! ```
//!
//! # Architecture
//!
//! - `address`: Typed physical and virtual addresses (`PA`, `VA`)
//! - `codec`: Table index extraction and descriptor address decoding
//! - `attributes`: The three supported memory types and their MAIR slots
//! - `descriptor`: Typed table/block descriptors and their bit encoding
//! - `store`: The statically sized table hierarchy with its leaf table pool
//! - `mapping`: Block mapping construction
//! - `layout`: The fixed default mappings
//! - `walk`: Software table walks for verification and diagnostics

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod address;
pub mod attributes;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod mapping;
pub mod store;
pub mod walk;

// Re-export commonly used types
pub use address::{Address, MemKind, PA, Physical, VA, Virtual};
pub use attributes::MemoryAttribute;
pub use descriptor::Descriptor;
pub use error::{AlignField, MapError};
pub use layout::MappingRequest;
pub use mapping::{add_mapping, add_single_mapping, install_default_mappings};
pub use store::{LeafHandle, RootTable, TableStore, TranslationTable};
pub use walk::{MappedBlock, Translation, dump_mappings, mapped_blocks, mapped_ranges, translate};

/// Translation granule shift (16KB)
pub const GRANULE_SHIFT: u32 = 14;

/// Translation granule size; every table is this large and aligned to it
pub const GRANULE_SIZE: usize = 1 << GRANULE_SHIFT;

/// Shift of the region mapped by one leaf block entry (32MB)
pub const BLOCK_SHIFT: u32 = 25;

/// Size of the region mapped by one leaf block entry
pub const BLOCK_SIZE: u64 = 1 << BLOCK_SHIFT;

/// Size of the translated input and output address spaces (48 bits)
pub const ADDRESS_SPACE_SIZE: u64 = 1 << 48;

/// Number of entries in a first-level or leaf table
pub const ENTRIES_PER_TABLE: usize = 2048;

/// Number of entries in the root table
pub const ROOT_ENTRIES: usize = 2;

/// Number of leaf tables that can be allocated
pub const LEAF_POOL_CAPACITY: usize = 10;

// Compile-time verification of paging constants
const _: () = assert!(GRANULE_SIZE.is_power_of_two());
const _: () = assert!(
    ENTRIES_PER_TABLE * core::mem::size_of::<u64>() == GRANULE_SIZE,
    "a full table must fill exactly one granule"
);
const _: () = assert!(
    BLOCK_SIZE == (GRANULE_SIZE as u64) * (ENTRIES_PER_TABLE as u64),
    "16KB granule level 2 blocks are 32MB"
);
