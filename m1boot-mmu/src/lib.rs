//! # m1boot-mmu
//!
//! Brings the EL2 MMU up with the default block mappings, and tears it down
//! again before handing over to the next stage.
//!
//! The controller moves through three states:
//!
//! ```text
//!            init()                         shutdown()
//! Disabled ---------> Configuring ---------> Enabled ---------> Disabled
//!    ^                     |
//!    +------ error --------+
//! ```
//!
//! Translation is only switched on after the tables are complete, so any
//! mapping error is reported before a single system register is written.
//!
//! On `aarch64` the [`boot`] module holds the process-wide tables and
//! controller, and exposes [`mmu_init`] and [`mmu_shutdown`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod regs;

#[cfg(target_arch = "aarch64")]
pub mod boot;

use core::fmt;

use m1boot_arch::{CacheOps, SetWayOp, SystemRegisters, dcsw_op_all};
use m1boot_paging::{MapError, TableStore, dump_mappings, install_default_mappings};

pub use m1boot_arch::{
    dc_civac_range, dc_cvac_range, dc_cvau_range, dc_ivac_range, dc_zva_range, ic_ivau_range,
};

#[cfg(target_arch = "aarch64")]
pub use boot::{mmu_init, mmu_shutdown};

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmuState {
    /// Translation off, caches off
    Disabled,
    /// Building tables and programming registers
    Configuring,
    /// Translation and caches on
    Enabled,
}

/// MMU bring-up errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "MMU errors must be handled"]
pub enum MmuError {
    /// The default mappings could not be built
    Mapping(MapError),
    /// `init` was called while the MMU was already on
    AlreadyEnabled,
}

impl From<MapError> for MmuError {
    fn from(err: MapError) -> Self {
        Self::Mapping(err)
    }
}

impl fmt::Display for MmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapping(err) => write!(f, "failed to build translation tables: {err}"),
            Self::AlreadyEnabled => write!(f, "MMU is already enabled"),
        }
    }
}

/// MMU controller over a system register backend
pub struct MmuController<R: SystemRegisters> {
    regs: R,
    state: MmuState,
}

impl<R: SystemRegisters> MmuController<R> {
    /// Create a controller for an MMU that is currently off
    pub const fn new(regs: R) -> Self {
        Self {
            regs,
            state: MmuState::Disabled,
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> MmuState {
        self.state
    }

    /// The register backend
    #[inline]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Build the default tables in `store` and turn on translation and caches
    ///
    /// `store` must stay at its current address for as long as the MMU is on.
    pub fn init(&mut self, store: &mut TableStore) -> Result<(), MmuError> {
        if self.state != MmuState::Disabled {
            return Err(MmuError::AlreadyEnabled);
        }

        log::info!("MMU: initializing...");
        self.state = MmuState::Configuring;

        store.init();
        if let Err(err) = install_default_mappings(store) {
            log::error!("MMU: {}", err);
            self.state = MmuState::Disabled;
            return Err(err.into());
        }
        log::debug!(
            "MMU: {} leaf tables used, root table at {}",
            store.leaf_tables_used(),
            store.root_table_pa()
        );
        dump_mappings(store);

        self.regs.write_mair(regs::mair_value());
        self.regs.write_tcr(regs::tcr_value());
        self.regs.write_ttbr0(store.root_table_pa().value());

        // Make the table writes visible to the walker before translation starts
        self.regs.dsb_ishst();
        self.regs.tlbi_all();
        self.regs.dsb_ish();
        self.regs.isb();

        let old = self.read_sctlr();
        let new = regs::sctlr_enable(old);
        log::info!("MMU: SCTLR_EL2: {:#x} -> {:#x}", old, new);
        self.write_sctlr(new);

        self.state = MmuState::Enabled;
        log::info!("MMU: running with MMU and caches enabled!");
        Ok(())
    }

    /// Turn off translation and caches, then write back everything dirty
    ///
    /// Safe to call in any state; it always leaves the controller disabled.
    pub fn shutdown<C: CacheOps + ?Sized>(&mut self, cache: &mut C) {
        log::info!("MMU: shutting down...");

        let old = self.read_sctlr();
        let new = regs::sctlr_disable(old);
        log::info!("MMU: SCTLR_EL2: {:#x} -> {:#x}", old, new);
        self.write_sctlr(new);

        log::info!("MMU: cleaning caches");
        dcsw_op_all(cache, SetWayOp::CleanInvalidate);

        self.state = MmuState::Disabled;
        log::info!("MMU: shutdown complete");
    }

    fn read_sctlr(&mut self) -> u64 {
        self.regs.isb();
        self.regs.read_sctlr()
    }

    fn write_sctlr(&mut self, value: u64) {
        self.regs.write_sctlr(value);
        self.regs.isb();
    }
}
