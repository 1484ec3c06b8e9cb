//! Block mapping construction
//!
//! Every mapping is made of 32MB block descriptors in leaf tables. There is
//! no fallback to smaller pages, so every request must be block aligned in
//! its virtual address, physical address and length.

use crate::address::{PA, VA};
use crate::attributes::MemoryAttribute;
use crate::codec::l2_index;
use crate::descriptor::Descriptor;
use crate::error::{AlignField, MapError};
use crate::layout::DEFAULT_MAPPINGS;
use crate::store::TableStore;
use crate::{ADDRESS_SPACE_SIZE, BLOCK_SIZE};

/// Map one 32MB block at `va` to `pa`
///
/// Allocates the leaf table for `va` if this is the first mapping in its
/// 64GB region. Fails without writing anything if the block entry is already
/// populated or the block lies outside the 48-bit address space.
pub fn add_single_mapping(
    store: &mut TableStore,
    va: VA,
    pa: PA,
    attr: MemoryAttribute,
) -> Result<(), MapError> {
    check_in_range(va, pa, BLOCK_SIZE)?;

    let handle = store.leaf_table_for(va)?;
    let table = store.leaf_table_mut(handle);
    let index = l2_index(va);

    if !table.is_vacant(index) {
        return Err(MapError::AlreadyMapped { va });
    }

    table.set(index, Descriptor::Block { pa, attr });
    Ok(())
}

/// Map `length` bytes at `va` to `pa`, one block at a time
///
/// Alignment and range are checked up front, so a misaligned request or one
/// that runs past the 48-bit address space changes nothing.
/// A request that runs into an existing mapping or out of leaf tables stops
/// there; the blocks before it stay mapped.
pub fn add_mapping(
    store: &mut TableStore,
    va: VA,
    pa: PA,
    length: u64,
    attr: MemoryAttribute,
) -> Result<(), MapError> {
    check_block_aligned(AlignField::Virtual, va.value())?;
    check_block_aligned(AlignField::Physical, pa.value())?;
    check_block_aligned(AlignField::Length, length)?;
    check_in_range(va, pa, length)?;

    log::debug!(
        "MMU: map {:#x}..{:#x} -> {:#x} ({:?}, {} blocks)",
        va.value(),
        va.value() + length,
        pa.value(),
        attr,
        length / BLOCK_SIZE
    );

    for block in 0..length / BLOCK_SIZE {
        let offset = block * BLOCK_SIZE;
        add_single_mapping(store, va + offset, pa + offset, attr)?;
    }

    Ok(())
}

/// Install the fixed boot layout into a freshly initialised store
pub fn install_default_mappings(store: &mut TableStore) -> Result<(), MapError> {
    for request in DEFAULT_MAPPINGS {
        add_mapping(store, request.va, request.pa, request.length, request.attr)?;
    }
    Ok(())
}

#[inline]
fn check_block_aligned(field: AlignField, value: u64) -> Result<(), MapError> {
    if value % BLOCK_SIZE == 0 {
        Ok(())
    } else {
        Err(MapError::Misaligned { field, value })
    }
}

/// Both `[va, va + length)` and `[pa, pa + length)` must end at or below 2^48
#[inline]
fn check_in_range(va: VA, pa: PA, length: u64) -> Result<(), MapError> {
    let fits = |start: u64| {
        start
            .checked_add(length)
            .is_some_and(|end| end <= ADDRESS_SPACE_SIZE)
    };

    if fits(va.value()) && fits(pa.value()) {
        Ok(())
    } else {
        Err(MapError::OutOfRange { va, pa, length })
    }
}
