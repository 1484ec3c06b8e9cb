//! Process-wide MMU state for the boot path

use m1boot_arch::hw::{El2Registers, HwCache};
use m1boot_paging::TableStore;
use spin::Mutex;

use crate::{MmuController, MmuError};

/// The translation tables; referenced by TTBR0_EL2 while the MMU is on
static TABLES: Mutex<TableStore> = Mutex::new(TableStore::new());

/// Global MMU instance
static MMU: Mutex<MmuController<El2Registers>> = Mutex::new(MmuController::new(El2Registers));

/// Build the default mappings and enable the MMU and caches at EL2
pub fn mmu_init() -> Result<(), MmuError> {
    let mut tables = TABLES.lock();
    MMU.lock().init(&mut tables)
}

/// Disable the MMU and caches, then clean and invalidate all data caches
pub fn mmu_shutdown() {
    MMU.lock().shutdown(&mut HwCache);
}
