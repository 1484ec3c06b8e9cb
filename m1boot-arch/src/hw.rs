//! EL2 hardware backends
//!
//! [`El2Registers`] and [`HwCache`] are the real implementations of
//! [`SystemRegisters`] and [`CacheOps`]. They carry no state; every method is
//! a single instruction or register access.

use aarch64_cpu::registers::*;
use core::arch::asm;

use crate::cache::{CacheOps, LineOp, SetWayOp};
use crate::sysreg::SystemRegisters;

/// EL2 translation regime registers
pub struct El2Registers;

impl SystemRegisters for El2Registers {
    #[inline]
    fn read_sctlr(&mut self) -> u64 {
        SCTLR_EL2.get()
    }

    #[inline]
    fn write_sctlr(&mut self, value: u64) {
        SCTLR_EL2.set(value);
    }

    #[inline]
    fn write_mair(&mut self, value: u64) {
        MAIR_EL2.set(value);
    }

    #[inline]
    fn write_tcr(&mut self, value: u64) {
        TCR_EL2.set(value);
    }

    #[inline]
    fn write_ttbr0(&mut self, value: u64) {
        TTBR0_EL2.set(value);
    }

    #[inline]
    fn dsb_ishst(&mut self) {
        // SAFETY: Memory barrier is always safe
        unsafe {
            asm!("dsb ishst", options(nostack));
        }
    }

    #[inline]
    fn dsb_ish(&mut self) {
        // SAFETY: Memory barrier is always safe
        unsafe {
            asm!("dsb ish", options(nostack));
        }
    }

    #[inline]
    fn isb(&mut self) {
        // SAFETY: ISB is always safe
        unsafe {
            asm!("isb", options(nostack));
        }
    }

    #[inline]
    fn tlbi_all(&mut self) {
        // SAFETY: TLB invalidation only drops cached EL1&0 translations
        unsafe {
            asm!("tlbi vmalls12e1is", options(nostack));
        }
    }
}

/// Cache maintenance instructions
pub struct HwCache;

impl CacheOps for HwCache {
    #[inline]
    fn line_op(&mut self, op: LineOp, addr: u64) {
        // SAFETY: Maintenance by VA only affects cache state for that line.
        // DC ZVA writes zeroes, which is the caller's stated intent.
        unsafe {
            match op {
                LineOp::IcIvau => asm!("ic ivau, {}", in(reg) addr, options(nostack)),
                LineOp::DcIvac => asm!("dc ivac, {}", in(reg) addr, options(nostack)),
                LineOp::DcZva => asm!("dc zva, {}", in(reg) addr, options(nostack)),
                LineOp::DcCvac => asm!("dc cvac, {}", in(reg) addr, options(nostack)),
                LineOp::DcCvau => asm!("dc cvau, {}", in(reg) addr, options(nostack)),
                LineOp::DcCivac => asm!("dc civac, {}", in(reg) addr, options(nostack)),
            }
        }
    }

    #[inline]
    fn set_way_op(&mut self, op: SetWayOp, operand: u64) {
        // SAFETY: Set/way maintenance only affects cache state
        unsafe {
            match op {
                SetWayOp::Invalidate => asm!("dc isw, {}", in(reg) operand, options(nostack)),
                SetWayOp::CleanInvalidate => {
                    asm!("dc cisw, {}", in(reg) operand, options(nostack))
                }
                SetWayOp::Clean => asm!("dc csw, {}", in(reg) operand, options(nostack)),
            }
        }
    }

    #[inline]
    fn clidr(&mut self) -> u64 {
        CLIDR_EL1.get()
    }

    fn ccsidr(&mut self, level: u8) -> u64 {
        // InD = 0 selects the data or unified cache at this level
        CSSELR_EL1.set(u64::from(level) << 1);
        // SAFETY: ISB is always safe
        unsafe {
            asm!("isb", options(nostack));
        }
        CCSIDR_EL1.get()
    }

    #[inline]
    fn sync(&mut self) {
        // SAFETY: Barriers are always safe
        unsafe {
            asm!("dsb sy", "isb", options(nostack));
        }
    }
}
