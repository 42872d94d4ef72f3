/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains the emulated register bus. Plain registers are backed by
    a map; the token allocator, mutex slots, scrubber and target control
    have behavior attached.

--*/

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use booter_drivers::memory_layout::MUTEX_SLOT_COUNT;
use booter_drivers::{
    BootId, Bus, PlatformOps, RegisterMap, ARCH_GA10X, ARCH_TU10X, BOOT_ID_REG,
};
use booter_error::{BooterError, BooterResult};

use crate::memory::SharedMemory;

const MUTEX_ID_FIRST: u32 = 0x01;
const MUTEX_ID_LAST: u32 = 0xfe;
const SCRUB_STATUS_DONE: u32 = 1;
const SCRUB_GRANULE_SHIFT: u32 = 12;

/// Status reads the scrubber answers "busy" after it is started.
const SCRUB_LATENCY: u32 = 3;

pub struct EmuBus {
    platform: &'static dyn PlatformOps,
    global: RefCell<HashMap<u32, u32>>,
    local: RefCell<HashMap<u32, u32>>,
    memory: Option<SharedMemory>,
    next_token: Cell<u32>,
    scrub_pending: Cell<u32>,
    boot_vector: Cell<Option<u64>>,
    faults: RefCell<HashSet<u32>>,
}

fn arch(platform: &dyn PlatformOps) -> u32 {
    match platform.name() {
        "ga10x" => ARCH_GA10X,
        _ => ARCH_TU10X,
    }
}

impl EmuBus {
    /// # Arguments
    ///
    /// * `platform` - Chip the bus identifies as
    /// * `fb_size_mb` - FB size strap in MiB
    pub fn new(platform: &'static dyn PlatformOps, fb_size_mb: u32) -> Self {
        let mut boot_id = BootId(0);
        boot_id.set_arch(arch(platform));
        boot_id.set_revision(0xa1);

        let mut global = HashMap::new();
        global.insert(BOOT_ID_REG, boot_id.0);
        global.insert(platform.regs().fb_size_mb, fb_size_mb);

        Self {
            platform,
            global: RefCell::new(global),
            local: RefCell::new(HashMap::new()),
            memory: None,
            next_token: Cell::new(MUTEX_ID_FIRST),
            scrub_pending: Cell::new(0),
            boot_vector: Cell::new(None),
            faults: RefCell::new(HashSet::new()),
        }
    }

    /// Attach the FB the scrubber clears.
    pub fn with_memory(mut self, memory: SharedMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn platform(&self) -> &'static dyn PlatformOps {
        self.platform
    }

    /// Raw register value, bypassing side effects.
    pub fn peek(&self, offset: u32) -> u32 {
        self.global.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// Raw register write, bypassing side effects.
    pub fn poke(&self, offset: u32, val: u32) {
        self.global.borrow_mut().insert(offset, val);
    }

    pub fn peek_local(&self, offset: u32) -> u32 {
        self.local.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn poke_local(&self, offset: u32, val: u32) {
        self.local.borrow_mut().insert(offset, val);
    }

    /// Make every global access to `offset` fail.
    pub fn inject_fault(&self, offset: u32) {
        self.faults.borrow_mut().insert(offset);
    }

    pub fn clear_faults(&self) {
        self.faults.borrow_mut().clear();
    }

    /// Boot vector of the last target start, if the target was started.
    pub fn target_boot_vector(&self) -> Option<u64> {
        self.boot_vector.get()
    }

    pub fn clear_target(&self) {
        self.boot_vector.set(None);
    }

    fn regs(&self) -> &'static RegisterMap {
        self.platform.regs()
    }

    fn is_mutex_slot(&self, offset: u32) -> bool {
        let regs = self.regs();
        (0..MUTEX_SLOT_COUNT).any(|slot| regs.mutex_slot(slot) == offset)
    }

    fn allocate_token(&self) -> u32 {
        let token = self.next_token.get();
        self.next_token.set(if token == MUTEX_ID_LAST {
            MUTEX_ID_FIRST
        } else {
            token + 1
        });
        token
    }

    fn start_scrub(&self) {
        let regs = self.regs();
        let start = u64::from(self.peek(regs.scrub_start)) << SCRUB_GRANULE_SHIFT;
        let end = u64::from(self.peek(regs.scrub_end)) << SCRUB_GRANULE_SHIFT;
        if let Some(memory) = &self.memory {
            let mut memory = memory.borrow_mut();
            let len = memory.fb.len() as u64;
            let (start, end) = (start.min(len) as usize, end.min(len) as usize);
            if start < end {
                memory.fb[start..end].fill(0);
            }
        }
        self.scrub_pending.set(SCRUB_LATENCY);
    }

    fn scrub_status(&self) -> u32 {
        match self.scrub_pending.get() {
            0 => SCRUB_STATUS_DONE,
            pending => {
                self.scrub_pending.set(pending - 1);
                0
            }
        }
    }

    fn check_fault(&self, offset: u32) -> BooterResult<()> {
        if self.faults.borrow().contains(&offset) {
            return Err(BooterError::DRIVER_BUS_ERROR);
        }
        Ok(())
    }
}

impl Bus for EmuBus {
    fn read_local(&self, offset: u32) -> u32 {
        self.peek_local(offset)
    }

    fn write_local(&self, offset: u32, val: u32) {
        self.poke_local(offset, val)
    }

    fn read_global(&self, offset: u32) -> BooterResult<u32> {
        self.check_fault(offset)?;
        let regs = self.regs();
        if offset == regs.mutex_id_acquire {
            return Ok(self.allocate_token());
        }
        if offset == regs.scrub_status {
            return Ok(self.scrub_status());
        }
        Ok(self.peek(offset))
    }

    fn write_global(&self, offset: u32, val: u32) -> BooterResult<()> {
        self.check_fault(offset)?;
        let regs = self.regs();
        if self.is_mutex_slot(offset) {
            // A held slot only accepts the release value
            if self.peek(offset) == 0 || val == 0 {
                self.poke(offset, val);
            }
            return Ok(());
        }
        self.poke(offset, val);
        if offset == regs.scrub_ctrl && val & 1 != 0 {
            self.start_scrub();
        } else if offset == regs.target_cpuctl && val != 0 {
            let lo = u64::from(self.peek(regs.target_boot_vector_lo));
            let hi = u64::from(self.peek(regs.target_boot_vector_hi));
            self.boot_vector.set(Some(lo | (hi << 32)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Memory, SysMem};
    use booter_drivers::{probe, GA10X, TU10X};

    #[test]
    fn test_identifies_as_platform() {
        assert_eq!(probe(&EmuBus::new(&TU10X, 64)).unwrap().name(), "tu10x");
        assert_eq!(probe(&EmuBus::new(&GA10X, 64)).unwrap().name(), "ga10x");
    }

    #[test]
    fn test_tokens_skip_reserved_values() {
        let bus = EmuBus::new(&TU10X, 64);
        let acquire = TU10X.regs().mutex_id_acquire;
        let tokens: Vec<u32> = (0..0x100).map(|_| bus.read_global(acquire).unwrap()).collect();
        assert_eq!(tokens[0], 1);
        assert_eq!(tokens[0xfd], 0xfe);
        assert_eq!(tokens[0xfe], 1);
        assert!(!tokens.contains(&0) && !tokens.contains(&0xff));
    }

    #[test]
    fn test_held_slot_rejects_other_tokens() {
        let bus = EmuBus::new(&TU10X, 64);
        let slot = TU10X.regs().mutex_slot(0);
        bus.write_global(slot, 5).unwrap();
        bus.write_global(slot, 6).unwrap();
        assert_eq!(bus.read_global(slot), Ok(5));
        bus.write_global(slot, 0).unwrap();
        bus.write_global(slot, 6).unwrap();
        assert_eq!(bus.read_global(slot), Ok(6));
    }

    #[test]
    fn test_scrubber_clears_fb() {
        let memory = Memory::new_shared(SysMem::default(), 0x4000);
        memory.borrow_mut().fb.fill(0x5a);
        let bus = EmuBus::new(&TU10X, 64).with_memory(memory.clone());
        let regs = TU10X.regs();
        bus.write_global(regs.scrub_start, 1).unwrap();
        bus.write_global(regs.scrub_end, 3).unwrap();
        bus.write_global(regs.scrub_ctrl, 1).unwrap();

        let polls = (0..5)
            .take_while(|_| bus.read_global(regs.scrub_status).unwrap() == 0)
            .count();
        assert_eq!(polls, SCRUB_LATENCY as usize);

        let fb = &memory.borrow().fb;
        assert!(fb[..0x1000].iter().all(|&b| b == 0x5a));
        assert!(fb[0x1000..0x3000].iter().all(|&b| b == 0));
        assert!(fb[0x3000..].iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn test_target_start_records_vector() {
        let bus = EmuBus::new(&GA10X, 64);
        assert_eq!(bus.target_boot_vector(), None);
        GA10X.start_target(&bus, 0x3ef_e100).unwrap();
        assert_eq!(bus.target_boot_vector(), Some(0x3ef_e100));
    }

    #[test]
    fn test_fault_injection() {
        let bus = EmuBus::new(&TU10X, 64);
        let reg = TU10X.regs().handoff;
        bus.inject_fault(reg);
        assert_eq!(bus.read_global(reg), Err(BooterError::DRIVER_BUS_ERROR));
        assert_eq!(bus.write_global(reg, 1), Err(BooterError::DRIVER_BUS_ERROR));
        bus.clear_faults();
        assert_eq!(bus.read_global(reg), Ok(0));
    }
}
