//! # m1boot-arch
//!
//! ARM64 architecture support for the m1boot environment.
//!
//! - [`cache`]: Range and set/way cache maintenance
//! - [`sysreg`]: The system register capability used by the MMU controller
//! - [`hw`]: Real EL2 backends for both (aarch64 only)
//!
//! # Host builds
//!
//! Everything that issues an instruction lives in [`hw`] and is only compiled
//! for `aarch64`. The rest is plain logic over the [`CacheOps`] and
//! [`SystemRegisters`] traits and runs on the host under `cargo test`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod cache;
pub mod sysreg;

#[cfg(target_arch = "aarch64")]
pub mod hw;

pub use cache::{
    CACHE_LINE_SIZE, CacheGeometry, CacheOps, LineOp, SetWayOp, dc_civac_range, dc_cvac_range,
    dc_cvau_range, dc_ivac_range, dc_zva_range, dcsw_op_all, ic_ivau_range,
};
pub use sysreg::SystemRegisters;
