/*++

Licensed under the Apache-2.0 license.

File Name:

    testing.rs

Abstract:

    In-memory stand-ins for the bus, timer and engines used by unit tests.

--*/

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use booter_error::BooterResult;
use booter_image_types::RSA3072_WORD_SIZE;

use crate::{
    Bus, DmaContext, DmaDirection, DmaEngine, DmaSync, DmaTarget, PkaEngine, PkaOperand,
    PkaOperation, PkaWords, ShaChunk, ShaContext, ShaEngine, ShaTask, Timer,
};

/// Register file where every unwritten register reads zero.
#[derive(Default)]
pub struct FakeBus {
    global: RefCell<HashMap<u32, u32>>,
    local: RefCell<HashMap<u32, u32>>,
}

impl FakeBus {
    pub fn set(&self, offset: u32, val: u32) {
        self.global.borrow_mut().insert(offset, val);
    }

    pub fn get(&self, offset: u32) -> u32 {
        self.global.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn set_local(&self, offset: u32, val: u32) {
        self.local.borrow_mut().insert(offset, val);
    }

    pub fn get_local(&self, offset: u32) -> u32 {
        self.local.borrow().get(&offset).copied().unwrap_or(0)
    }
}

impl Bus for FakeBus {
    fn read_local(&self, offset: u32) -> u32 {
        self.get_local(offset)
    }

    fn write_local(&self, offset: u32, val: u32) {
        self.set_local(offset, val)
    }

    fn read_global(&self, offset: u32) -> BooterResult<u32> {
        Ok(self.get(offset))
    }

    fn write_global(&self, offset: u32, val: u32) -> BooterResult<()> {
        self.set(offset, val);
        Ok(())
    }
}

/// Clock that moves forward by `step` every time it is read.
pub struct FakeTimer {
    now: Cell<u64>,
    step: u64,
}

impl FakeTimer {
    pub fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }
}

impl Timer for FakeTimer {
    fn now_ns(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// SHA engine that records the task plan instead of hashing.
#[derive(Default)]
pub struct RecordingSha {
    pub tasks: Vec<(u64, bool)>,
    pub msg_len: u64,
    pub scrubbed: bool,
    pub owner: Option<u32>,
}

impl ShaEngine for RecordingSha {
    fn reset(&mut self) -> BooterResult<()> {
        Ok(())
    }

    fn acquire_mutex(&mut self, token: u32) -> bool {
        match self.owner {
            Some(owner) if owner != token => false,
            _ => {
                self.owner = Some(token);
                true
            }
        }
    }

    fn release_mutex(&mut self, token: u32) {
        if self.owner == Some(token) {
            self.owner = None;
        }
    }

    fn init_operation(&mut self, ctx: &ShaContext) -> BooterResult<()> {
        self.msg_len = ctx.msg_len;
        Ok(())
    }

    fn insert_task(&mut self, _ctx: &ShaContext, task: &ShaTask<'_>) -> BooterResult<()> {
        let len = match task.chunk {
            ShaChunk::Local(data) => data.len() as u64,
            ShaChunk::Fb { len, .. } => len,
        };
        self.tasks.push((len, task.last));
        Ok(())
    }

    fn busy(&self) -> bool {
        false
    }

    fn read_result(&mut self, _ctx: &ShaContext, out: &mut [u8], scrub: bool) -> BooterResult<()> {
        out.fill(0xa5);
        self.scrubbed = scrub;
        Ok(())
    }
}

/// PKA that only looks at the least significant word of each operand.
pub struct SquaringPka {
    pub(crate) base: PkaWords,
    pub(crate) exponent: PkaWords,
    pub(crate) modulus: PkaWords,
    pub(crate) result: PkaWords,
    pub scrubbed: bool,
    pub owner: Option<u32>,
    pub stuck: bool,
}

impl Default for SquaringPka {
    fn default() -> Self {
        Self {
            base: [0; RSA3072_WORD_SIZE],
            exponent: [0; RSA3072_WORD_SIZE],
            modulus: [0; RSA3072_WORD_SIZE],
            result: [0; RSA3072_WORD_SIZE],
            scrubbed: false,
            owner: None,
            stuck: false,
        }
    }
}

impl PkaEngine for SquaringPka {
    fn acquire_mutex(&mut self, token: u32) -> bool {
        match self.owner {
            Some(owner) if owner != token => false,
            _ => {
                self.owner = Some(token);
                true
            }
        }
    }

    fn release_mutex(&mut self, token: u32) {
        if self.owner == Some(token) {
            self.owner = None;
        }
    }

    fn load_operand(&mut self, operand: PkaOperand, words: &PkaWords) -> BooterResult<()> {
        match operand {
            PkaOperand::Base => self.base = *words,
            PkaOperand::Exponent => self.exponent = *words,
            PkaOperand::Modulus => self.modulus = *words,
        }
        Ok(())
    }

    fn start(&mut self, _op: PkaOperation) -> BooterResult<()> {
        self.result = [0; RSA3072_WORD_SIZE];
        let modulus = u64::from(self.modulus[0]);
        if modulus != 0 {
            let base = u64::from(self.base[0]) % modulus;
            let mut acc = 1 % modulus;
            for _ in 0..self.exponent[0] {
                acc = acc * base % modulus;
            }
            self.result[0] = acc as u32;
        }
        Ok(())
    }

    fn busy(&self) -> bool {
        self.stuck
    }

    fn read_result(&mut self, out: &mut PkaWords) -> BooterResult<()> {
        *out = self.result;
        Ok(())
    }

    fn scrub(&mut self) {
        self.base = [0; RSA3072_WORD_SIZE];
        self.exponent = [0; RSA3072_WORD_SIZE];
        self.modulus = [0; RSA3072_WORD_SIZE];
        self.result = [0; RSA3072_WORD_SIZE];
        self.scrubbed = true;
    }
}

/// DMA engine over one flat memory shared by both targets.
pub struct FlatDma {
    mem: Vec<u8>,
    pub requests: Vec<(DmaTarget, u64, u32)>,
}

impl FlatDma {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size],
            requests: Vec::new(),
        }
    }
}

impl DmaEngine for FlatDma {
    fn transfer(
        &mut self,
        dir: DmaDirection<'_>,
        offset: u64,
        size: u32,
        _sync: DmaSync,
        ctx: DmaContext,
    ) -> u32 {
        self.requests.push((ctx.target, offset, size));
        let start = offset.min(self.mem.len() as u64) as usize;
        let count = (size as usize).min(self.mem.len() - start);
        match dir {
            DmaDirection::ToLocal(buf) => buf[..count].copy_from_slice(&self.mem[start..start + count]),
            DmaDirection::FromLocal(buf) => {
                self.mem[start..start + count].copy_from_slice(&buf[..count])
            }
        }
        count as u32
    }

    fn idle(&self) -> bool {
        true
    }
}
