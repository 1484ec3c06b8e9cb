//! ARM64 Cache Maintenance Operations
//!
//! Two families of operations are provided:
//!
//! - **Range operations** walk a virtual address range one cache line at a
//!   time and apply a single `ic`/`dc` instruction to each line.
//! - **Set/way operations** ([`dcsw_op_all`]) walk every set and way of every
//!   data or unified cache up to the Level of Coherence, using the geometry
//!   the CPU reports in `CLIDR_EL1` and `CCSIDR_EL1`.
//!
//! The instructions themselves are issued through [`CacheOps`], so the
//! iteration logic here is the same on hardware and in tests.
//!
//! # Coherency Model
//! - **Clean**: Write dirty cache lines to memory (DC CVAC / DC CVAU)
//! - **Invalidate**: Discard cache lines without writing (DC IVAC / IC IVAU)
//! - **Clean + Invalidate**: Both (DC CIVAC)
//! - **Zero**: Zero a whole line without reading it first (DC ZVA)

use tock_registers::interfaces::Readable;
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

/// Cache line size assumed by the range operations, in bytes
///
/// Fixed rather than read from `CTR_EL0`: every core this runs on has 64-byte
/// lines, and the range loops must not depend on a register read.
pub const CACHE_LINE_SIZE: u64 = 64;

const _: () = assert!(CACHE_LINE_SIZE.is_power_of_two());

register_bitfields![u64,
    /// Current Cache Size ID Register (without FEAT_CCIDX)
    pub CCSIDR [
        /// log2(line size in bytes) - 4
        LINE_SIZE OFFSET(0) NUMBITS(3) [],
        /// Associativity - 1
        ASSOCIATIVITY OFFSET(3) NUMBITS(10) [],
        /// Number of sets - 1
        NUM_SETS OFFSET(13) NUMBITS(15) []
    ],

    /// Cache Level ID Register (the fields used for set/way walks)
    pub CLIDR [
        /// Level of Coherence
        LOC OFFSET(24) NUMBITS(3) []
    ]
];

/// Maximum number of cache levels described by `CLIDR_EL1`
pub const MAX_CACHE_LEVELS: u8 = 7;

/// A single cache line operation by virtual address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOp {
    /// `ic ivau`: invalidate instruction cache line to PoU
    IcIvau,
    /// `dc ivac`: invalidate data cache line to PoC
    DcIvac,
    /// `dc zva`: zero data cache line
    DcZva,
    /// `dc cvac`: clean data cache line to PoC
    DcCvac,
    /// `dc cvau`: clean data cache line to PoU
    DcCvau,
    /// `dc civac`: clean and invalidate data cache line to PoC
    DcCivac,
}

/// A data cache operation by set/way
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SetWayOp {
    /// `dc isw`
    Invalidate = 0,
    /// `dc cisw`
    CleanInvalidate = 1,
    /// `dc csw`
    Clean = 2,
}

/// The cache instruction primitive
///
/// Implemented by [`crate::hw::HwCache`] on hardware. Every method issues (or
/// records) exactly one instruction or register access.
pub trait CacheOps {
    /// Apply `op` to the cache line containing `addr`
    fn line_op(&mut self, op: LineOp, addr: u64);

    /// Apply `op` to the line selected by a packed set/way operand
    fn set_way_op(&mut self, op: SetWayOp, operand: u64);

    /// Read `CLIDR_EL1`
    fn clidr(&mut self) -> u64;

    /// Select the data/unified cache at `level` (0-based) and read its `CCSIDR_EL1`
    fn ccsidr(&mut self, level: u8) -> u64;

    /// Wait for all outstanding maintenance to complete (`dsb sy; isb`)
    fn sync(&mut self);
}

/// Geometry of one cache level as reported by `CCSIDR_EL1`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    /// log2 of the line size in bytes
    pub line_shift: u32,
    /// Number of ways
    pub ways: u32,
    /// Number of sets
    pub sets: u32,
}

impl CacheGeometry {
    /// Decode a raw `CCSIDR_EL1` value
    #[must_use]
    pub fn from_ccsidr(ccsidr: u64) -> Self {
        let reg: InMemoryRegister<u64, CCSIDR::Register> = InMemoryRegister::new(ccsidr);
        Self {
            line_shift: reg.read(CCSIDR::LINE_SIZE) as u32 + 4,
            ways: reg.read(CCSIDR::ASSOCIATIVITY) as u32 + 1,
            sets: reg.read(CCSIDR::NUM_SETS) as u32 + 1,
        }
    }
}

/// Level of Coherence: the number of cache levels a set/way walk must cover
#[inline]
#[must_use]
pub fn level_of_coherence(clidr: u64) -> u8 {
    let reg: InMemoryRegister<u64, CLIDR::Register> = InMemoryRegister::new(clidr);
    reg.read(CLIDR::LOC) as u8
}

/// Whether cache `level` (0-based) holds data, i.e. is data-only, split or unified
#[inline]
#[must_use]
pub const fn has_data_cache(clidr: u64, level: u8) -> bool {
    let ctype = (clidr >> (3 * level as u64)) & 0b111;
    ctype >= 2
}

/// Pack a `dc isw/cisw/csw` operand
///
/// ```text
/// [31 .. 32-A] way   [L+S-1 .. L] set   [3:1] level
/// ```
/// where `A = ceil(log2(ways))` and `L = log2(line size)`.
#[inline]
#[must_use]
pub const fn set_way_operand(level: u8, set: u32, way: u32, geometry: CacheGeometry) -> u64 {
    let way_shift = (geometry.ways - 1).leading_zeros() as u64;
    ((way as u64) << way_shift) | ((set as u64) << geometry.line_shift) | ((level as u64) << 1)
}

fn range_op<C: CacheOps + ?Sized>(cache: &mut C, op: LineOp, addr: u64, length: usize) {
    if length == 0 {
        return;
    }

    let end = addr.saturating_add(length as u64);
    let mut line = addr & !(CACHE_LINE_SIZE - 1);
    while line < end {
        cache.line_op(op, line);
        line = match line.checked_add(CACHE_LINE_SIZE) {
            Some(next) => next,
            None => break,
        };
    }

    cache.sync();
}

/// Invalidate instruction cache lines covering `[addr, addr + length)` to PoU
pub fn ic_ivau_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::IcIvau, addr, length);
}

/// Invalidate data cache lines covering `[addr, addr + length)` to PoC
///
/// Dirty data in the range is discarded. Only use this when memory holds the
/// authoritative copy, e.g. after a device wrote it.
pub fn dc_ivac_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::DcIvac, addr, length);
}

/// Zero `[addr, addr + length)` line by line with `dc zva`
///
/// Requires the data cache to be enabled. Partial head and tail lines are
/// zeroed completely.
pub fn dc_zva_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::DcZva, addr, length);
}

/// Clean data cache lines covering `[addr, addr + length)` to PoC
pub fn dc_cvac_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::DcCvac, addr, length);
}

/// Clean data cache lines covering `[addr, addr + length)` to PoU
///
/// Sufficient before invalidating the instruction cache for freshly written code.
pub fn dc_cvau_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::DcCvau, addr, length);
}

/// Clean and invalidate data cache lines covering `[addr, addr + length)` to PoC
pub fn dc_civac_range<C: CacheOps + ?Sized>(cache: &mut C, addr: u64, length: usize) {
    range_op(cache, LineOp::DcCivac, addr, length);
}

/// Apply `op` to every line of every data or unified cache up to the Level of Coherence
///
/// This is the only way to reach lines whose virtual address is unknown, e.g.
/// when the MMU is being turned off and nothing may stay dirty.
pub fn dcsw_op_all<C: CacheOps + ?Sized>(cache: &mut C, op: SetWayOp) {
    let clidr = cache.clidr();
    let loc = level_of_coherence(clidr).min(MAX_CACHE_LEVELS);

    for level in 0..loc {
        if !has_data_cache(clidr, level) {
            continue;
        }

        let geometry = CacheGeometry::from_ccsidr(cache.ccsidr(level));
        for way in 0..geometry.ways {
            for set in 0..geometry.sets {
                cache.set_way_op(op, set_way_operand(level, set, way, geometry));
            }
        }
    }

    cache.sync();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Issued {
        Line(LineOp, u64),
        SetWay(SetWayOp, u64),
        Sync,
    }

    /// Records every instruction and reports a fixed cache hierarchy
    struct RecordingCache {
        clidr: u64,
        ccsidr: [u64; MAX_CACHE_LEVELS as usize],
        issued: Vec<Issued>,
    }

    impl RecordingCache {
        fn new() -> Self {
            Self {
                clidr: 0,
                ccsidr: [0; MAX_CACHE_LEVELS as usize],
                issued: Vec::new(),
            }
        }

        fn lines(&self) -> Vec<u64> {
            self.issued
                .iter()
                .filter_map(|i| match i {
                    Issued::Line(_, addr) => Some(*addr),
                    _ => None,
                })
                .collect()
        }

        fn set_way_ops(&self) -> Vec<(SetWayOp, u64)> {
            self.issued
                .iter()
                .filter_map(|i| match i {
                    Issued::SetWay(op, operand) => Some((*op, *operand)),
                    _ => None,
                })
                .collect()
        }
    }

    impl CacheOps for RecordingCache {
        fn line_op(&mut self, op: LineOp, addr: u64) {
            self.issued.push(Issued::Line(op, addr));
        }

        fn set_way_op(&mut self, op: SetWayOp, operand: u64) {
            self.issued.push(Issued::SetWay(op, operand));
        }

        fn clidr(&mut self) -> u64 {
            self.clidr
        }

        fn ccsidr(&mut self, level: u8) -> u64 {
            self.ccsidr[level as usize]
        }

        fn sync(&mut self) {
            self.issued.push(Issued::Sync);
        }
    }

    fn ccsidr(line_bytes: u64, ways: u64, sets: u64) -> u64 {
        let line_size = line_bytes.trailing_zeros() as u64 - 4;
        line_size | ((ways - 1) << 3) | ((sets - 1) << 13)
    }

    #[test]
    fn test_aligned_range_covers_each_line_once() {
        let mut cache = RecordingCache::new();
        dc_civac_range(&mut cache, 0x1000, 256);

        assert_eq!(cache.lines(), vec![0x1000, 0x1040, 0x1080, 0x10c0]);
        assert_eq!(cache.issued.last(), Some(&Issued::Sync));
    }

    #[test]
    fn test_unaligned_range_covers_head_and_tail_lines() {
        let mut cache = RecordingCache::new();
        // 0x1030..0x1090 touches the lines at 0x1000, 0x1040 and 0x1080
        dc_cvac_range(&mut cache, 0x1030, 0x60);

        assert_eq!(cache.lines(), vec![0x1000, 0x1040, 0x1080]);
    }

    #[test]
    fn test_single_byte_range() {
        let mut cache = RecordingCache::new();
        ic_ivau_range(&mut cache, 0x2003f, 1);

        assert_eq!(cache.issued[0], Issued::Line(LineOp::IcIvau, 0x20000));
        assert_eq!(cache.lines().len(), 1);
    }

    #[test]
    fn test_empty_range_issues_nothing() {
        let mut cache = RecordingCache::new();
        dc_ivac_range(&mut cache, 0x1010, 0);

        assert!(cache.issued.is_empty());
    }

    #[test]
    fn test_each_range_op_uses_its_instruction() {
        let ops: [(fn(&mut RecordingCache, u64, usize), LineOp); 6] = [
            (ic_ivau_range, LineOp::IcIvau),
            (dc_ivac_range, LineOp::DcIvac),
            (dc_zva_range, LineOp::DcZva),
            (dc_cvac_range, LineOp::DcCvac),
            (dc_cvau_range, LineOp::DcCvau),
            (dc_civac_range, LineOp::DcCivac),
        ];

        for (range_fn, expected) in ops {
            let mut cache = RecordingCache::new();
            range_fn(&mut cache, 0x4000, 64);
            assert_eq!(cache.issued, vec![Issued::Line(expected, 0x4000), Issued::Sync]);
        }
    }

    #[test]
    fn test_range_at_top_of_address_space_terminates() {
        let mut cache = RecordingCache::new();
        dc_cvac_range(&mut cache, u64::MAX - 0x7f, 0x100);

        assert_eq!(cache.lines(), vec![u64::MAX - 0x7f, u64::MAX - 0x3f]);
    }

    #[test]
    fn test_geometry_decode() {
        let geometry = CacheGeometry::from_ccsidr(ccsidr(64, 8, 256));
        assert_eq!(
            geometry,
            CacheGeometry {
                line_shift: 6,
                ways: 8,
                sets: 256
            }
        );
    }

    #[test]
    fn test_clidr_decode() {
        // L1 split I+D, L2 unified, LoC = 2
        let clidr = 0b011 | (0b100 << 3) | (2 << 24);
        assert_eq!(level_of_coherence(clidr), 2);
        assert!(has_data_cache(clidr, 0));
        assert!(has_data_cache(clidr, 1));
        assert!(!has_data_cache(clidr, 2));

        // Instruction-only L1
        assert!(!has_data_cache(0b001, 0));
    }

    #[test]
    fn test_set_way_operand_packing() {
        let geometry = CacheGeometry {
            line_shift: 6,
            ways: 4,
            sets: 2,
        };
        assert_eq!(set_way_operand(1, 1, 3, geometry), 0xc000_0042);
        assert_eq!(set_way_operand(0, 0, 0, geometry), 0);
    }

    #[test]
    fn test_direct_mapped_cache_has_no_way_bits() {
        let geometry = CacheGeometry {
            line_shift: 6,
            ways: 1,
            sets: 4,
        };
        assert_eq!(set_way_operand(0, 3, 0, geometry), 3 << 6);
    }

    #[test]
    fn test_dcsw_walks_every_data_level_up_to_loc() {
        let mut cache = RecordingCache::new();
        // L1 split, L2 unified, L3 unified but beyond LoC
        cache.clidr = 0b011 | (0b100 << 3) | (0b100 << 6) | (2 << 24);
        cache.ccsidr[0] = ccsidr(64, 2, 4);
        cache.ccsidr[1] = ccsidr(128, 4, 8);
        cache.ccsidr[2] = ccsidr(64, 16, 1024);

        dcsw_op_all(&mut cache, SetWayOp::CleanInvalidate);

        let ops = cache.set_way_ops();
        assert_eq!(ops.len(), 2 * 4 + 4 * 8);
        assert!(ops.iter().all(|(op, _)| *op == SetWayOp::CleanInvalidate));

        // Level field distinguishes the two caches
        let l1 = ops.iter().filter(|(_, operand)| (operand >> 1) & 0b111 == 0).count();
        let l2 = ops.iter().filter(|(_, operand)| (operand >> 1) & 0b111 == 1).count();
        assert_eq!((l1, l2), (8, 32));

        assert_eq!(cache.issued.last(), Some(&Issued::Sync));
    }

    #[test]
    fn test_dcsw_without_caches_only_syncs() {
        let mut cache = RecordingCache::new();
        dcsw_op_all(&mut cache, SetWayOp::Clean);

        assert_eq!(cache.issued, vec![Issued::Sync]);
    }
}
