//! Virtual address and descriptor field extraction
//!
//! With a 16KB granule the architecture would split a 48-bit address into
//! four levels of 1/11/11/11 index bits above a 14-bit page offset. Mapping
//! 32MB blocks straight from the third level folds the last index into the
//! offset, leaving:
//!
//! ```text
//! 47      46          36 35          25 24                 0
//! +-------+-------------+-------------+--------------------+
//! | root  |  L1 index   |  L2 index   |    block offset    |
//! +-------+-------------+-------------+--------------------+
//! ```
//!
//! All index functions are total: any 64-bit input yields an in-range index.

use crate::address::{PA, VA};
use crate::{BLOCK_SHIFT, ENTRIES_PER_TABLE, ROOT_ENTRIES};

const L2_INDEX_BITS: u32 = 11;
const L1_INDEX_BITS: u32 = 11;
const ROOT_INDEX_BITS: u32 = 1;

const L2_SHIFT: u32 = BLOCK_SHIFT;
const L1_SHIFT: u32 = L2_SHIFT + L2_INDEX_BITS;
const ROOT_SHIFT: u32 = L1_SHIFT + L1_INDEX_BITS;

const _: () = assert!(1 << L2_INDEX_BITS == ENTRIES_PER_TABLE);
const _: () = assert!(1 << L1_INDEX_BITS == ENTRIES_PER_TABLE);
const _: () = assert!(1 << ROOT_INDEX_BITS == ROOT_ENTRIES);
const _: () = assert!(ROOT_SHIFT + ROOT_INDEX_BITS == 48);

/// Output address bits [47:14] of a table or block descriptor
pub const OUTPUT_ADDRESS_MASK: u64 = 0x0000_FFFF_FFFF_C000;

#[inline]
const fn field(va: VA, shift: u32, bits: u32) -> usize {
    ((va.value() >> shift) & ((1 << bits) - 1)) as usize
}

/// Index into the root table
#[inline]
#[must_use]
pub const fn root_index(va: VA) -> usize {
    field(va, ROOT_SHIFT, ROOT_INDEX_BITS)
}

/// Index into the first-level table
#[inline]
#[must_use]
pub const fn l1_index(va: VA) -> usize {
    field(va, L1_SHIFT, L1_INDEX_BITS)
}

/// Index into the leaf table
#[inline]
#[must_use]
pub const fn l2_index(va: VA) -> usize {
    field(va, L2_SHIFT, L2_INDEX_BITS)
}

/// Offset of `va` within its 32MB block
#[inline]
#[must_use]
pub const fn block_offset(va: VA) -> u64 {
    va.value() & ((1 << BLOCK_SHIFT) - 1)
}

/// Rebuild the block-aligned virtual address selected by a set of indices
#[inline]
#[must_use]
pub const fn compose(root: usize, l1: usize, l2: usize) -> VA {
    VA::new(
        ((root as u64) << ROOT_SHIFT) | ((l1 as u64) << L1_SHIFT) | ((l2 as u64) << L2_SHIFT),
    )
}

/// Physical base address encoded in a table or block descriptor
///
/// Discards the attribute bits below bit 14 and everything above bit 47.
#[inline]
#[must_use]
pub const fn descriptor_address(raw: u64) -> PA {
    PA::new(raw & OUTPUT_ADDRESS_MASK)
}
