//! Memory types

/// Memory type of a block mapping
///
/// Each variant owns one fixed slot of the memory attribute indirection
/// register; block descriptors carry the slot index, not the attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MemoryAttribute {
    /// Normal memory, inner/outer write-back non-transient, read/write allocate
    #[default]
    Normal = 0,
    /// Device memory: non-gathering, non-reordering, no early write acknowledgement
    DeviceNgnrne = 1,
    /// Device memory: non-gathering, non-reordering, early write acknowledgement
    DeviceNgnre = 2,
}

impl MemoryAttribute {
    /// Every supported memory type, in MAIR slot order
    pub const ALL: [Self; 3] = [Self::Normal, Self::DeviceNgnrne, Self::DeviceNgnre];

    /// Slot in MAIR, as stored in a descriptor's AttrIndx field
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Memory type stored in MAIR slot `index`, if it is one we program
    #[inline]
    #[must_use]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Normal),
            1 => Some(Self::DeviceNgnrne),
            2 => Some(Self::DeviceNgnre),
            _ => None,
        }
    }

    /// The 8-bit MAIR attribute encoding for this memory type
    #[inline]
    #[must_use]
    pub const fn mair_encoding(self) -> u8 {
        match self {
            Self::Normal => 0xff,
            Self::DeviceNgnrne => 0x00,
            Self::DeviceNgnre => 0x04,
        }
    }

    /// Bit position of this type's slot within MAIR
    #[inline]
    #[must_use]
    pub const fn mair_shift(self) -> u32 {
        self.index() as u32 * 8
    }
}
