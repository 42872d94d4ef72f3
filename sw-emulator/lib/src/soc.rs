/*++

Licensed under the Apache-2.0 license.

File Name:

    soc.rs

Abstract:

    File contains the emulated SoC: one bus, timer and engine set over a
    shared system memory and FB.

--*/

use booter_drivers::{
    report_status, Bus, HandoffMutex, HandoffState, MutexGuard, PlatformOps, SecureScratch, Soc,
    SubWindowCfg, WprRange, MAILBOX0_REG, MAILBOX1_REG,
};
use booter_error::BooterResult;

use crate::memory::{Memory, SharedMemory, SysMem};
use crate::{EmuBus, EmuDma, EmuPka, EmuSha, EmuTimer};

pub struct EmuSoc {
    pub bus: EmuBus,
    pub timer: EmuTimer,
    pub dma: EmuDma,
    pub sha: EmuSha,
    pub pka: EmuPka,
    memory: SharedMemory,
}

impl EmuSoc {
    /// # Arguments
    ///
    /// * `platform` - Chip to emulate
    /// * `fb_size` - FB size in bytes, a whole number of MiB
    pub fn new(platform: &'static dyn PlatformOps, fb_size: u64) -> Self {
        let memory = Memory::new_shared(SysMem::default(), fb_size as usize);
        Self {
            bus: EmuBus::new(platform, (fb_size >> 20) as u32).with_memory(memory.clone()),
            timer: EmuTimer::default(),
            dma: EmuDma::with_memory(memory.clone()),
            sha: EmuSha::new(memory.clone()),
            pka: EmuPka::default(),
            memory,
        }
    }

    /// Collaborators for one stage run.
    pub fn soc(&mut self) -> Soc<'_> {
        Soc {
            bus: &self.bus,
            timer: &self.timer,
            dma: &mut self.dma,
            sha: &mut self.sha,
            pka: &mut self.pka,
        }
    }

    pub fn platform(&self) -> &'static dyn PlatformOps {
        self.bus.platform()
    }

    pub fn memory(&self) -> SharedMemory {
        self.memory.clone()
    }

    pub fn write_sysmem(&self, addr: u64, data: &[u8]) {
        self.memory.borrow_mut().sysmem.write(addr, data);
    }

    pub fn read_fb(&self, offset: u64, len: usize) -> Vec<u8> {
        self.memory.borrow().fb_range(offset, len).to_vec()
    }

    pub fn write_fb(&self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        self.memory.borrow_mut().fb[start..start + data.len()].copy_from_slice(data);
    }

    /// Leave the stage argument in the requester mailbox.
    pub fn set_mailbox_argument(&self, arg: u64) {
        self.bus.poke_local(MAILBOX0_REG, arg as u32);
        self.bus.poke_local(MAILBOX1_REG, (arg >> 32) as u32);
    }

    /// Status the last stage left in the mailbox.
    pub fn status(&self) -> u32 {
        self.bus.peek_local(MAILBOX0_REG)
    }

    pub fn clear_status(&self) {
        report_status(&self.bus, 0);
    }

    pub fn boot_status(&self) -> u32 {
        self.bus.peek(self.platform().regs().boot_status)
    }

    pub fn target_boot_vector(&self) -> Option<u64> {
        self.bus.target_boot_vector()
    }

    pub fn set_debug_mode(&self, debug: bool) {
        let regs = self.platform().regs();
        self.bus.poke(regs.debug_ctrl, if debug { 0xffff_ffff } else { 0 });
    }

    /// Burn `version` fuse bits.
    pub fn set_fuse_version(&self, version: u32) {
        let bits = match version {
            0 => 0,
            1..=31 => (1 << version) - 1,
            _ => u32::MAX,
        };
        self.bus.poke(self.platform().regs().fuse_version, bits);
    }

    pub fn set_revocation(&self, index: usize, floor: u32) {
        self.bus.poke(self.platform().regs().revocation[index], floor);
    }

    /// Program a protected region the way earlier boot firmware would.
    pub fn preset_wpr(&self, range: WprRange) {
        let regs = self.platform().regs();
        let shift = self.platform().wpr_addr_shift();
        self.bus.poke(regs.wpr_lo, (range.start >> shift) as u32);
        self.bus.poke(regs.wpr_hi, (range.end >> shift) as u32);
    }

    /// The programmed protected region, if any.
    pub fn wpr(&self) -> Option<WprRange> {
        let regs = self.platform().regs();
        let shift = self.platform().wpr_addr_shift();
        let lo = u64::from(self.bus.peek(regs.wpr_lo));
        let hi = u64::from(self.bus.peek(regs.wpr_hi));
        if lo == 0 && hi == 0 {
            return None;
        }
        Some(WprRange::new(lo << shift, hi << shift))
    }

    /// Sub-window `index` as programmed.
    pub fn sub_window(&self, index: usize) -> (WprRange, SubWindowCfg) {
        let window = &self.platform().regs().sub_windows[index];
        let lo = u64::from(self.bus.peek(window.lo));
        let hi = u64::from(self.bus.peek(window.hi));
        (
            WprRange::new(lo << 12, hi << 12),
            SubWindowCfg(self.bus.peek(window.cfg)),
        )
    }

    /// Take the handoff mutex the way the target firmware does.
    pub fn handoff_guard(&self) -> BooterResult<MutexGuard<'_, HandoffMutex>> {
        MutexGuard::acquire(&self.bus, self.platform().regs(), &self.timer)
    }

    pub fn handoff_state(&self) -> BooterResult<HandoffState> {
        SecureScratch::read(&mut self.handoff_guard()?)
    }

    pub fn read_global(&self, offset: u32) -> BooterResult<u32> {
        self.bus.read_global(offset)
    }
}
