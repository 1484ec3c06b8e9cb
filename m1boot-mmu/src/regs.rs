//! Register values programmed during bring-up and teardown

use m1boot_paging::MemoryAttribute;
use tock_registers::{
    interfaces::{ReadWriteable, Readable},
    register_bitfields,
    registers::InMemoryRegister,
};

register_bitfields![u64,
    /// The SCTLR bits this crate controls
    pub Sctlr [
        /// Instruction cache enable
        I OFFSET(12) NUMBITS(1) [],
        /// Data cache enable
        C OFFSET(2) NUMBITS(1) [],
        /// Stage 1 translation enable
        M OFFSET(0) NUMBITS(1) []
    ],

    pub Tcr [
        /// Physical address size
        PS OFFSET(16) NUMBITS(3) [
            Bits32 = 0b000,
            Bits36 = 0b001,
            Bits40 = 0b010,
            Bits42 = 0b011,
            Bits44 = 0b100,
            Bits48 = 0b101
        ],
        /// Granule size for TTBR0
        TG0 OFFSET(14) NUMBITS(2) [
            Granule4K = 0b00,
            Granule64K = 0b01,
            Granule16K = 0b10
        ]
    ]
];

/// MAIR value with every [`MemoryAttribute`] in its slot
pub fn mair_value() -> u64 {
    MemoryAttribute::ALL
        .iter()
        .fold(0, |mair, attr| mair | (u64::from(attr.mair_encoding()) << attr.mair_shift()))
}

/// TCR value: 16KB granule, 40-bit physical addresses
pub fn tcr_value() -> u64 {
    let tcr = InMemoryRegister::<u64, Tcr::Register>::new(0);
    tcr.modify(Tcr::TG0::Granule16K + Tcr::PS::Bits40);
    tcr.get()
}

/// `sctlr` with translation and both caches turned on
pub fn sctlr_enable(sctlr: u64) -> u64 {
    let reg = InMemoryRegister::<u64, Sctlr::Register>::new(sctlr);
    reg.modify(Sctlr::I::SET + Sctlr::C::SET + Sctlr::M::SET);
    reg.get()
}

/// `sctlr` with translation and both caches turned off
pub fn sctlr_disable(sctlr: u64) -> u64 {
    let reg = InMemoryRegister::<u64, Sctlr::Register>::new(sctlr);
    reg.modify(Sctlr::I::CLEAR + Sctlr::C::CLEAR + Sctlr::M::CLEAR);
    reg.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mair_slots() {
        assert_eq!(mair_value(), 0x04_00_ff);
    }

    #[test]
    fn test_tcr_fields() {
        assert_eq!(tcr_value(), (0b10 << 14) | (0b010 << 16));
    }

    #[test]
    fn test_sctlr_bits_preserve_the_rest() {
        // RES1 bits of SCTLR_EL2 plus an unrelated alignment check bit
        let reset = 0x30c5_0830 | (1 << 1);
        let enabled = sctlr_enable(reset);
        assert_eq!(enabled, reset | (1 << 12) | (1 << 2) | 1);

        let disabled = sctlr_disable(enabled);
        assert_eq!(disabled, reset);
    }
}
