//! Translation table storage
//!
//! All table memory is part of [`TableStore`] and sized at compile time:
//!
//! - one root table with two entries, each pointing at a first-level table
//! - two first-level tables covering the whole 48-bit space
//! - a pool of [`LEAF_POOL_CAPACITY`] leaf tables handed out on demand
//!
//! Leaf tables are identified by [`LeafHandle`], an index into the pool. The
//! pool cursor only moves forward: a leaf table is never freed, reused or
//! moved once a first-level entry points at it.
//!
//! # Physical addresses
//!
//! Descriptors hold the physical address of the next table, which is the
//! table's address in memory since everything runs identity mapped with the
//! MMU off. The store must therefore stay where it is after [`TableStore::init`]
//! (in practice it is a `static`).

use crate::address::{PA, VA};
use crate::codec::{l1_index, root_index};
use crate::descriptor::Descriptor;
use crate::error::MapError;
use crate::{ENTRIES_PER_TABLE, LEAF_POOL_CAPACITY, ROOT_ENTRIES};

/// A first-level or leaf translation table (2048 entries, 16KB)
#[repr(C, align(16384))]
pub struct TranslationTable {
    entries: [u64; ENTRIES_PER_TABLE],
}

impl TranslationTable {
    /// Create an empty table
    pub const fn empty() -> Self {
        Self {
            entries: [0; ENTRIES_PER_TABLE],
        }
    }

    /// Get the raw entry at `index`
    #[inline]
    pub fn raw(&self, index: usize) -> u64 {
        self.entries[index]
    }

    /// Get the decoded entry at `index`
    #[inline]
    pub fn descriptor(&self, index: usize) -> Option<Descriptor> {
        Descriptor::decode(self.entries[index])
    }

    /// Check if the entry at `index` is empty
    #[inline]
    pub fn is_vacant(&self, index: usize) -> bool {
        self.entries[index] == 0
    }

    /// Store `desc` at `index`
    #[inline]
    pub(crate) fn set(&mut self, index: usize, desc: Descriptor) {
        self.entries[index] = desc.encode();
    }

    /// Physical address of this table
    #[inline]
    pub fn pa(&self) -> PA {
        PA::of(self)
    }

    fn clear(&mut self) {
        self.entries.fill(0);
    }
}

/// The root table
///
/// Only two entries are needed, but the table base register still requires
/// granule alignment.
#[repr(C, align(16384))]
pub struct RootTable {
    entries: [u64; ROOT_ENTRIES],
}

impl RootTable {
    /// Get the decoded entry at `index`
    #[inline]
    pub fn descriptor(&self, index: usize) -> Option<Descriptor> {
        Descriptor::decode(self.entries[index])
    }

    /// Physical address of this table, as programmed into TTBR0
    #[inline]
    pub fn pa(&self) -> PA {
        PA::of(self)
    }
}

/// Handle to a leaf table in the pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafHandle(usize);

impl LeafHandle {
    /// Position of this table in the pool
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The complete table hierarchy for one address space
pub struct TableStore {
    root: RootTable,
    first_level: [TranslationTable; ROOT_ENTRIES],
    leaves: [TranslationTable; LEAF_POOL_CAPACITY],
    next_leaf: usize,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore {
    /// Create a zeroed store
    ///
    /// The root entries are only installed by [`Self::init`], once the store
    /// is at its final address.
    pub const fn new() -> Self {
        Self {
            root: RootTable {
                entries: [0; ROOT_ENTRIES],
            },
            first_level: [const { TranslationTable::empty() }; ROOT_ENTRIES],
            leaves: [const { TranslationTable::empty() }; LEAF_POOL_CAPACITY],
            next_leaf: 0,
        }
    }

    /// Clear all tables and install the permanent root entries
    pub fn init(&mut self) {
        self.root.entries.fill(0);
        for table in self.first_level.iter_mut().chain(self.leaves.iter_mut()) {
            table.clear();
        }
        self.next_leaf = 0;

        for index in 0..ROOT_ENTRIES {
            let pa = self.first_level[index].pa();
            self.root.entries[index] = Descriptor::Table { pa }.encode();
        }
    }

    /// The root table
    #[inline]
    pub fn root_table(&self) -> &RootTable {
        &self.root
    }

    /// Physical address of the root table
    #[inline]
    pub fn root_table_pa(&self) -> PA {
        self.root.pa()
    }

    /// The first-level table covering `va`
    #[inline]
    pub fn first_level_table_for(&self, va: VA) -> &TranslationTable {
        &self.first_level[root_index(va)]
    }

    /// Raw first-level entry covering `va`
    #[inline]
    pub fn first_level_descriptor_for(&self, va: VA) -> u64 {
        self.first_level_table_for(va).raw(l1_index(va))
    }

    /// The leaf table backing `va`, allocated from the pool if needed
    ///
    /// A newly allocated table is linked into its first-level entry before
    /// this returns, so later calls for the same 64GB region get the same
    /// handle.
    pub fn leaf_table_for(&mut self, va: VA) -> Result<LeafHandle, MapError> {
        let root = root_index(va);
        let index = l1_index(va);

        match self.first_level[root].descriptor(index) {
            Some(Descriptor::Empty) => {}
            Some(Descriptor::Table { pa }) => {
                // A first-level entry only ever points into our own pool
                return self.handle_for_pa(pa).ok_or(MapError::AlreadyMapped { va });
            }
            // Blocks are never created at the first level
            _ => return Err(MapError::AlreadyMapped { va }),
        }

        if self.next_leaf == LEAF_POOL_CAPACITY {
            return Err(MapError::PoolExhausted { va });
        }

        let handle = LeafHandle(self.next_leaf);
        self.next_leaf += 1;

        let pa = self.leaves[handle.0].pa();
        self.first_level[root].set(index, Descriptor::Table { pa });

        log::debug!(
            "MMU: leaf table {} at {} covers {:#x}",
            handle.0,
            pa,
            va.value() & !LEAF_SPAN_MASK
        );

        Ok(handle)
    }

    /// The leaf table for `handle`
    #[inline]
    pub fn leaf_table(&self, handle: LeafHandle) -> &TranslationTable {
        &self.leaves[handle.0]
    }

    #[inline]
    pub(crate) fn leaf_table_mut(&mut self, handle: LeafHandle) -> &mut TranslationTable {
        &mut self.leaves[handle.0]
    }

    /// Physical address of the leaf table for `handle`
    #[inline]
    pub fn leaf_table_pa(&self, handle: LeafHandle) -> PA {
        self.leaves[handle.0].pa()
    }

    /// Find the allocated leaf table at physical address `pa`
    pub fn handle_for_pa(&self, pa: PA) -> Option<LeafHandle> {
        self.leaves[..self.next_leaf]
            .iter()
            .position(|table| table.pa() == pa)
            .map(LeafHandle)
    }

    /// Find any table of this store at physical address `pa`
    ///
    /// This is what the hardware walker does when it follows a table
    /// descriptor; unallocated leaf tables are not reachable.
    pub fn table_at(&self, pa: PA) -> Option<&TranslationTable> {
        self.first_level
            .iter()
            .chain(self.leaves[..self.next_leaf].iter())
            .find(|table| table.pa() == pa)
    }

    /// Number of leaf tables allocated so far
    #[inline]
    pub fn leaf_tables_used(&self) -> usize {
        self.next_leaf
    }
}

/// Bytes covered by one leaf table, minus one (64GB)
const LEAF_SPAN_MASK: u64 = (crate::BLOCK_SIZE * ENTRIES_PER_TABLE as u64) - 1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::descriptor_address;

    /// 64GB: the span of one first-level entry
    const L1_SPAN: u64 = LEAF_SPAN_MASK + 1;

    fn store() -> Box<TableStore> {
        let mut store = Box::new(TableStore::new());
        store.init();
        store
    }

    #[test]
    fn test_tables_are_granule_aligned() {
        let store = store();
        assert!(store.root_table_pa().is_granule_aligned());
        for table in &store.first_level {
            assert!(table.pa().is_granule_aligned());
        }
        for table in &store.leaves {
            assert!(table.pa().is_granule_aligned());
        }
    }

    #[test]
    fn test_init_installs_root_entries() {
        let store = store();
        for index in 0..ROOT_ENTRIES {
            assert_eq!(
                store.root_table().descriptor(index),
                Some(Descriptor::Table {
                    pa: store.first_level[index].pa()
                })
            );
        }
        assert_eq!(store.leaf_tables_used(), 0);
        assert_eq!(store.first_level_descriptor_for(VA::new(0)), 0);
    }

    #[test]
    fn test_first_level_lookup_uses_root_index() {
        let store = store();
        let low = store.first_level_table_for(VA::new(0x10_0000_0000)).pa();
        let high = store.first_level_table_for(VA::new(0x8000_0000_0000)).pa();
        assert_eq!(low, store.first_level[0].pa());
        assert_eq!(high, store.first_level[1].pa());
    }

    #[test]
    fn test_leaf_allocation_links_first_level_entry() {
        let mut store = store();
        let va = VA::new(0xf0_0000_0000);

        let handle = store.leaf_table_for(va).unwrap();
        assert_eq!(handle.index(), 0);
        assert_eq!(store.leaf_tables_used(), 1);
        assert_eq!(
            descriptor_address(store.first_level_descriptor_for(va)),
            store.leaf_table_pa(handle)
        );
    }

    #[test]
    fn test_same_region_reuses_leaf() {
        let mut store = store();
        let first = store.leaf_table_for(VA::new(0x8_0000_0000)).unwrap();
        let second = store.leaf_table_for(VA::new(0x8_0200_0000)).unwrap();
        let third = store.leaf_table_for(VA::new(L1_SPAN - 1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(store.leaf_tables_used(), 1);
    }

    #[test]
    fn test_codec_roundtrips_through_store() {
        let mut store = store();
        for raw in [0, 0x8_0000_0000, 0xf0_0000_0000, 0x8000_0000_0000, 0xffff_fe00_0000] {
            let va = VA::new(raw);
            let handle = store.leaf_table_for(va).unwrap();
            assert_eq!(
                descriptor_address(store.first_level_descriptor_for(va)),
                store.leaf_table_pa(handle)
            );
            assert_eq!(store.handle_for_pa(store.leaf_table_pa(handle)), Some(handle));
        }
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut store = store();
        for region in 0..LEAF_POOL_CAPACITY as u64 {
            let handle = store.leaf_table_for(VA::new(region * L1_SPAN)).unwrap();
            assert_eq!(handle.index(), region as usize);
        }

        let va = VA::new(LEAF_POOL_CAPACITY as u64 * L1_SPAN);
        assert_eq!(store.leaf_table_for(va), Err(MapError::PoolExhausted { va }));
        // The failed request left no dangling entry behind
        assert_eq!(store.first_level_descriptor_for(va), 0);

        // Regions that already have a table still resolve
        assert!(store.leaf_table_for(VA::new(0)).is_ok());
    }

    #[test]
    fn test_init_resets_pool() {
        let mut store = store();
        store.leaf_table_for(VA::new(0)).unwrap();
        store.init();

        assert_eq!(store.leaf_tables_used(), 0);
        assert_eq!(store.first_level_descriptor_for(VA::new(0)), 0);
    }

    #[test]
    fn test_table_at_only_finds_reachable_tables() {
        let mut store = store();
        let unallocated = store.leaves[0].pa();
        assert!(store.table_at(unallocated).is_none());

        let handle = store.leaf_table_for(VA::new(0)).unwrap();
        assert!(store.table_at(store.leaf_table_pa(handle)).is_some());
        assert!(store.table_at(store.first_level[1].pa()).is_some());
        assert!(store.table_at(store.root_table_pa()).is_none());
    }
}
