//! Typed physical and virtual addresses
//!
//! Provides compile-time distinction between physical and virtual addresses.
//! While the tables are being built the MMU is off, so a table's physical
//! address is simply where it sits in memory.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Add, Sub};

use crate::{BLOCK_SIZE, GRANULE_SIZE};

/// Marker trait for address kinds (physical or virtual)
pub trait MemKind: private::Sealed + Copy + Clone {}

/// Physical address space marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Physical;

/// Virtual address space marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Virtual;

impl MemKind for Physical {}
impl MemKind for Virtual {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Physical {}
    impl Sealed for super::Virtual {}
}

/// An address in either physical or virtual address space
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Address<K: MemKind> {
    value: u64,
    _kind: PhantomData<K>,
}

/// Physical address
pub type PA = Address<Physical>;

/// Virtual address
pub type VA = Address<Virtual>;

impl<K: MemKind> Address<K> {
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }

    /// Get the raw address value
    #[inline]
    pub const fn value(self) -> u64 {
        self.value
    }

    /// Check if address is aligned to the 16KB translation granule
    #[inline]
    pub const fn is_granule_aligned(self) -> bool {
        self.value & (GRANULE_SIZE as u64 - 1) == 0
    }

    /// Check if address is aligned to a 32MB block
    #[inline]
    pub const fn is_block_aligned(self) -> bool {
        self.value & (BLOCK_SIZE - 1) == 0
    }
}

impl PA {
    /// Physical address of an object in memory
    ///
    /// Only meaningful while running identity mapped or with the MMU off.
    #[inline]
    pub fn of<T>(object: &T) -> Self {
        Self::new(core::ptr::from_ref(object) as u64)
    }
}

// Arithmetic operations

impl<K: MemKind> Add<u64> for Address<K> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self::new(self.value + rhs)
    }
}

impl<K: MemKind> Sub for Address<K> {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.value - rhs.value
    }
}

// Formatting

impl<K: MemKind> fmt::Debug for Address<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#012x}", self.value)
    }
}

impl<K: MemKind> fmt::Display for Address<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.value)
    }
}

impl<K: MemKind> fmt::LowerHex for Address<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}
