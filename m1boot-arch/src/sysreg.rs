//! System register capability
//!
//! The MMU controller never touches a system register directly. Everything it
//! needs for bring-up and teardown goes through [`SystemRegisters`], which the
//! boot path implements with `msr`/`mrs` at EL2 ([`crate::hw::El2Registers`])
//! and tests implement with an in-memory register file.
//!
//! Every method is a side-effecting hardware operation, so all of them take
//! `&mut self`, including the reads.

/// Access to the translation and control registers of the current exception level
pub trait SystemRegisters {
    /// Read the system control register (SCTLR)
    fn read_sctlr(&mut self) -> u64;

    /// Write the system control register (SCTLR)
    fn write_sctlr(&mut self, value: u64);

    /// Write the memory attribute indirection register (MAIR)
    fn write_mair(&mut self, value: u64);

    /// Write the translation control register (TCR)
    fn write_tcr(&mut self, value: u64);

    /// Write translation table base register 0 (TTBR0)
    fn write_ttbr0(&mut self, value: u64);

    /// `dsb ishst`: wait for prior stores to the inner shareable domain
    fn dsb_ishst(&mut self);

    /// `dsb ish`: wait for all prior accesses in the inner shareable domain
    fn dsb_ish(&mut self);

    /// `isb`: flush the pipeline so later instructions see new system state
    fn isb(&mut self);

    /// Invalidate cached stage 1 and 2 EL1&0 translations for the current
    /// VMID, inner shareable (`tlbi vmalls12e1is`)
    ///
    /// EL2 regime entries, including any left by an earlier boot stage, are
    /// not affected.
    fn tlbi_all(&mut self);
}
