//! Translation table descriptors
//!
//! Only two descriptor shapes are ever written by this crate, plus the empty
//! entry:
//!
//! ```text
//! +---------+--------------------------+-------+----+-------+------+------+
//! |  63:48  |  Output address [47:14]  | 13:11 | AF |  9:5  | INDX | T  V |
//! +---------+--------------------------+-------+----+-------+------+------+
//!                                               10            4:2    1  0
//! ```
//!
//! - Table: `V=1 T=1`, output address of the next-level table, AF set
//! - Block: `V=1 T=0`, output address of a 32MB region, AF set, AttrIndx
//! - Empty: all zero
//!
//! Everything else works on [`Descriptor`]; only [`Descriptor::encode`] and
//! [`Descriptor::decode`] touch the bit layout.

use tock_registers::{
    interfaces::{Readable, Writeable},
    register_bitfields,
    registers::InMemoryRegister,
};

use crate::{ADDRESS_SPACE_SIZE, GRANULE_SHIFT};
use crate::address::PA;
use crate::attributes::MemoryAttribute;
use crate::codec::descriptor_address;

register_bitfields![u64,
    /// Fields shared by table and block descriptors
    pub DescriptorFields [
        /// Valid bit - entry is valid when set
        VALID OFFSET(0) NUMBITS(1) [],

        /// Type bit - at levels 0 to 2: 0=Block, 1=Table
        TYPE OFFSET(1) NUMBITS(1) [
            Block = 0,
            Table = 1
        ],

        /// Memory attribute index into MAIR
        ATTR_INDEX OFFSET(2) NUMBITS(3) [],

        /// Access flag - set up front so the first access doesn't fault
        AF OFFSET(10) NUMBITS(1) [],

        /// Output address bits [47:14]
        OUTPUT_ADDR OFFSET(14) NUMBITS(34) []
    ]
];

type DescriptorRegister = InMemoryRegister<u64, DescriptorFields::Register>;

/// A decoded translation table entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Descriptor {
    /// No entry yet
    Empty,
    /// Points to a next-level table
    Table {
        /// Physical address of the next-level table
        pa: PA,
    },
    /// Maps a 32MB block
    Block {
        /// Physical base of the block
        pa: PA,
        /// Memory type
        attr: MemoryAttribute,
    },
}

impl Descriptor {
    /// Encode into the hardware format
    #[must_use]
    pub fn encode(self) -> u64 {
        if let Self::Table { pa } | Self::Block { pa, .. } = self {
            debug_assert!(pa.value() < ADDRESS_SPACE_SIZE, "output address above 48 bits");
        }

        let reg = DescriptorRegister::new(0);
        match self {
            Self::Empty => {}
            Self::Table { pa } => {
                debug_assert!(pa.is_granule_aligned(), "table address must be 16KB aligned");
                reg.write(
                    DescriptorFields::VALID::SET
                        + DescriptorFields::TYPE::Table
                        + DescriptorFields::AF::SET
                        + DescriptorFields::OUTPUT_ADDR.val(pa.value() >> GRANULE_SHIFT),
                );
            }
            Self::Block { pa, attr } => {
                debug_assert!(pa.is_block_aligned(), "block address must be 32MB aligned");
                reg.write(
                    DescriptorFields::VALID::SET
                        + DescriptorFields::TYPE::Block
                        + DescriptorFields::AF::SET
                        + DescriptorFields::ATTR_INDEX.val(u64::from(attr.index()))
                        + DescriptorFields::OUTPUT_ADDR.val(pa.value() >> GRANULE_SHIFT),
                );
            }
        }
        reg.get()
    }

    /// Decode a raw entry
    ///
    /// Zero is [`Descriptor::Empty`]. Returns `None` for bit patterns this
    /// crate never writes: invalid non-zero entries and blocks whose
    /// attribute index has no programmed MAIR slot.
    #[must_use]
    pub fn decode(raw: u64) -> Option<Self> {
        if raw == 0 {
            return Some(Self::Empty);
        }

        let reg = DescriptorRegister::new(raw);
        if !reg.is_set(DescriptorFields::VALID) {
            return None;
        }

        let pa = descriptor_address(raw);
        if reg.is_set(DescriptorFields::TYPE) {
            Some(Self::Table { pa })
        } else {
            let attr = MemoryAttribute::from_index(reg.read(DescriptorFields::ATTR_INDEX))?;
            Some(Self::Block { pa, attr })
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_encoding_matches_hardware_format() {
        let desc = Descriptor::Block {
            pa: PA::new(0x8_0000_0000),
            attr: MemoryAttribute::Normal,
        };
        assert_eq!(desc.encode(), 0x8_0000_0000 | (1 << 10) | 0b01);

        let desc = Descriptor::Block {
            pa: PA::new(0x0200_0000),
            attr: MemoryAttribute::DeviceNgnre,
        };
        assert_eq!(desc.encode(), 0x0200_0000 | (1 << 10) | (2 << 2) | 0b01);
    }

    #[test]
    fn test_table_encoding_matches_hardware_format() {
        let desc = Descriptor::Table {
            pa: PA::new(0x0012_3400_c000),
        };
        assert_eq!(desc.encode(), 0x0012_3400_c000 | (1 << 10) | 0b11);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(Descriptor::Empty.encode(), 0);
        assert_eq!(Descriptor::decode(0), Some(Descriptor::Empty));
    }

    #[test]
    #[should_panic(expected = "output address above 48 bits")]
    #[cfg(debug_assertions)]
    fn test_encode_rejects_wide_output_address() {
        let _ = Descriptor::Block {
            pa: PA::new(ADDRESS_SPACE_SIZE),
            attr: MemoryAttribute::Normal,
        }
        .encode();
    }

    #[test]
    fn test_decode_recovers_device_block() {
        let raw = 0xf0_0000_0000 | (1 << 10) | (1 << 2) | 0b01;
        assert_eq!(
            Descriptor::decode(raw),
            Some(Descriptor::Block {
                pa: PA::new(0xf0_0000_0000),
                attr: MemoryAttribute::DeviceNgnrne,
            })
        );
    }

    #[test]
    fn test_decode_rejects_foreign_patterns() {
        // Valid bit clear
        assert_eq!(Descriptor::decode(0x8_0000_0400), None);
        // AttrIndx 5 is not programmed
        assert_eq!(Descriptor::decode(0x8_0000_0000 | (5 << 2) | 0b01), None);
    }

    #[test]
    fn test_decode_ignores_upper_attribute_bits() {
        // PXN/UXN and software bits above 47 don't leak into the address
        let raw = (1 << 54) | (1 << 53) | 0x4000 | 0b11;
        assert_eq!(
            Descriptor::decode(raw),
            Some(Descriptor::Table {
                pa: PA::new(0x4000)
            })
        );
    }
}
