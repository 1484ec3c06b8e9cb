//! Software translation table walks
//!
//! These follow descriptors the way the hardware does, starting from the
//! root table and resolving every table descriptor through its physical
//! address. They never look at the store's bookkeeping, so what they report
//! is what the MMU will see once TTBR0 points at the root table.

use core::fmt;
use core::iter;

use crate::address::{PA, VA};
use crate::attributes::MemoryAttribute;
use crate::codec::{block_offset, compose, l1_index, l2_index, root_index};
use crate::descriptor::Descriptor;
use crate::layout::MappingRequest;
use crate::store::{TableStore, TranslationTable};
use crate::{BLOCK_SIZE, ENTRIES_PER_TABLE, ROOT_ENTRIES};

/// Result of translating a virtual address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Translation {
    /// Output address, including the offset within the block
    pub pa: PA,
    pub attr: MemoryAttribute,
}

/// A populated leaf entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappedBlock {
    pub va: VA,
    pub pa: PA,
    pub attr: MemoryAttribute,
}

impl fmt::Display for MappedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({:?})", self.va, self.pa, self.attr)
    }
}

/// Translate `va` through the tables in `store`
///
/// Returns `None` if any level of the walk hits an empty or unexpected
/// entry.
pub fn translate(store: &TableStore, va: VA) -> Option<Translation> {
    let first_level = next_table(store, store.root_table().descriptor(root_index(va)))?;
    let leaf = next_table(store, first_level.descriptor(l1_index(va)))?;

    match leaf.descriptor(l2_index(va))? {
        Descriptor::Block { pa, attr } => Some(Translation {
            pa: pa + block_offset(va),
            attr,
        }),
        _ => None,
    }
}

/// Every block mapped in `store`, in ascending virtual address order
pub fn mapped_blocks(store: &TableStore) -> impl Iterator<Item = MappedBlock> + '_ {
    (0..ROOT_ENTRIES).flat_map(move |root| {
        next_table(store, store.root_table().descriptor(root))
            .into_iter()
            .flat_map(move |first_level| {
                (0..ENTRIES_PER_TABLE).flat_map(move |l1| {
                    next_table(store, first_level.descriptor(l1))
                        .into_iter()
                        .flat_map(move |leaf| {
                            (0..ENTRIES_PER_TABLE).filter_map(move |l2| {
                                match leaf.descriptor(l2)? {
                                    Descriptor::Block { pa, attr } => Some(MappedBlock {
                                        va: compose(root, l1, l2),
                                        pa,
                                        attr,
                                    }),
                                    _ => None,
                                }
                            })
                        })
                })
            })
    })
}

/// Mapped blocks merged into maximal contiguous runs
///
/// Adjacent blocks are merged when both their virtual and physical
/// addresses are consecutive and they share a memory type.
pub fn mapped_ranges(store: &TableStore) -> impl Iterator<Item = MappingRequest> + '_ {
    let mut blocks = mapped_blocks(store).peekable();
    iter::from_fn(move || {
        let first = blocks.next()?;
        let mut run = MappingRequest {
            va: first.va,
            pa: first.pa,
            length: BLOCK_SIZE,
            attr: first.attr,
        };
        while blocks
            .next_if(|block| {
                block.va == run.va + run.length
                    && block.pa == run.pa + run.length
                    && block.attr == run.attr
            })
            .is_some()
        {
            run.length += BLOCK_SIZE;
        }
        Some(run)
    })
}

/// Log every mapped range
pub fn dump_mappings(store: &TableStore) {
    for range in mapped_ranges(store) {
        log::debug!(
            "MMU:   {:#014x}..{:#014x} -> {:#014x} {:?}",
            range.va.value(),
            range.va.value() + range.length,
            range.pa.value(),
            range.attr
        );
    }
}

fn next_table(store: &TableStore, desc: Option<Descriptor>) -> Option<&TranslationTable> {
    match desc? {
        Descriptor::Table { pa } => store.table_at(pa),
        _ => None,
    }
}
