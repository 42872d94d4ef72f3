/*++

Licensed under the Apache-2.0 license.

File Name:

    sha.rs

Abstract:

    File contains the emulated SHA-256 accelerator. Tasks are hashed into a
    running state as they arrive; FB tasks are read straight from FB.

--*/

use booter_drivers::{ShaChunk, ShaContext, ShaEngine, ShaTask};
use booter_error::{BooterError, BooterResult};
use booter_image_types::{Sha256Digest, SHA256_BLOCK_BYTE_SIZE};
use sha2::digest::block_buffer::Block;
use sha2::digest::consts::U64;

use crate::memory::SharedMemory;

const SHA256_H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

pub struct EmuSha {
    memory: SharedMemory,
    owner: Option<u32>,
    hash: [u32; 8],
    pending: Vec<u8>,
    hashed: u64,
    result: Option<Sha256Digest>,

    /// Number of tasks accepted since the last init.
    pub tasks: usize,
}

impl EmuSha {
    pub fn new(memory: SharedMemory) -> Self {
        Self {
            memory,
            owner: None,
            hash: SHA256_H0,
            pending: Vec::new(),
            hashed: 0,
            result: None,
            tasks: 0,
        }
    }

    pub fn owner(&self) -> Option<u32> {
        self.owner
    }

    /// Hold the engine lock on behalf of another agent.
    pub fn hold(&mut self, token: u32) {
        self.owner = Some(token);
    }

    fn compress(&mut self) {
        let full = self.pending.len() - self.pending.len() % SHA256_BLOCK_BYTE_SIZE;
        for block in self.pending[..full].chunks_exact(SHA256_BLOCK_BYTE_SIZE) {
            let block = *Block::<U64>::from_slice(block);
            sha2::compress256(&mut self.hash, &[block]);
        }
        self.pending.drain(..full);
    }

    fn finish(&mut self) -> Sha256Digest {
        let bit_len = self.hashed * 8;
        self.pending.push(0x80);
        while self.pending.len() % SHA256_BLOCK_BYTE_SIZE != SHA256_BLOCK_BYTE_SIZE - 8 {
            self.pending.push(0);
        }
        self.pending.extend_from_slice(&bit_len.to_be_bytes());
        self.compress();

        let mut digest = [0u8; 32];
        for (out, word) in digest.chunks_exact_mut(4).zip(self.hash.iter()) {
            out.copy_from_slice(&word.to_be_bytes());
        }
        digest
    }
}

impl ShaEngine for EmuSha {
    fn reset(&mut self) -> BooterResult<()> {
        self.hash = SHA256_H0;
        self.pending.clear();
        self.hashed = 0;
        self.result = None;
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

    fn init_operation(&mut self, _ctx: &ShaContext) -> BooterResult<()> {
        self.tasks = 0;
        self.reset()
    }

    fn insert_task(&mut self, ctx: &ShaContext, task: &ShaTask<'_>) -> BooterResult<()> {
        if !self.pending.is_empty() || self.result.is_some() {
            return Err(BooterError::DRIVER_SHA256_INVALID_TASK);
        }
        match task.chunk {
            ShaChunk::Local(data) => self.pending.extend_from_slice(data),
            ShaChunk::Fb { offset, len } => {
                let memory = self.memory.borrow();
                let len = usize::try_from(len).map_err(|_| BooterError::DRIVER_SHA256_INVALID_LENGTH)?;
                let data = memory.fb_range(offset, len);
                if data.len() != len {
                    return Err(BooterError::DRIVER_SHA256_INVALID_LENGTH);
                }
                self.pending.extend_from_slice(data);
            }
        }
        self.hashed += task.chunk.len();
        self.tasks += 1;
        self.compress();

        if task.last {
            if self.hashed != ctx.msg_len {
                return Err(BooterError::DRIVER_SHA256_INVALID_LENGTH);
            }
            self.result = Some(self.finish());
        } else if !self.pending.is_empty() {
            return Err(BooterError::DRIVER_SHA256_INVALID_TASK);
        }
        Ok(())
    }

    fn busy(&self) -> bool {
        false
    }

    fn read_result(&mut self, _ctx: &ShaContext, out: &mut [u8], scrub: bool) -> BooterResult<()> {
        let digest = self
            .result
            .as_ref()
            .ok_or(BooterError::DRIVER_SHA256_INVALID_LENGTH)?;
        if out.len() != digest.len() {
            return Err(BooterError::DRIVER_BAD_ARGUMENT);
        }
        out.copy_from_slice(digest);
        if scrub {
            self.result = None;
            self.hash = [0; 8];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Memory, SysMem};
    use crate::{EmuBus, EmuTimer};
    use booter_drivers::{CryptoMutex, MutexGuard, PlatformOps, Sha256, ShaAlgo, TU10X};

    fn message(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_digest_matches_reference() {
        let memory = Memory::new_shared(SysMem::default(), 0x1000);
        let mut sha = EmuSha::new(memory);
        let bus = EmuBus::new(&TU10X, 64);
        let timer = EmuTimer::default();
        let crypto = MutexGuard::<CryptoMutex>::acquire(&bus, TU10X.regs(), &timer).unwrap();

        for len in [0, 3, 55, 56, 64, 119, 1000] {
            let data = message(len);
            let digest = Sha256::new(&mut sha, &timer).digest(&crypto, &data).unwrap();
            assert_eq!(digest, openssl::sha::sha256(&data), "len {len}");
        }
        assert_eq!(sha.owner(), None);
    }

    #[test]
    fn test_fb_and_local_chunks() {
        let data = message(300);
        let memory = Memory::new_shared(SysMem::default(), 0x1000);
        memory.borrow_mut().fb[0x100..0x100 + 256].copy_from_slice(&data[..256]);
        let mut sha = EmuSha::new(memory);
        let bus = EmuBus::new(&TU10X, 64);
        let timer = EmuTimer::default();
        let crypto = MutexGuard::<CryptoMutex>::acquire(&bus, TU10X.regs(), &timer).unwrap();

        let mut chunks = [
            ShaChunk::Fb {
                offset: 0x100,
                len: 192,
            },
            ShaChunk::Fb {
                offset: 0x1c0,
                len: 64,
            },
            ShaChunk::Local(&data[256..]),
        ]
        .into_iter();
        let digest = Sha256::new(&mut sha, &timer)
            .digest_chunks(&crypto, 300, &mut chunks)
            .unwrap();
        assert_eq!(digest, openssl::sha::sha256(&data));
        assert_eq!(sha.tasks, 3);
    }

    #[test]
    fn test_unaligned_task_rejected_by_engine() {
        let memory = Memory::new_shared(SysMem::default(), 0x1000);
        let mut sha = EmuSha::new(memory);
        let ctx = ShaContext {
            algo: ShaAlgo::Sha256,
            msg_len: 20,
        };
        sha.init_operation(&ctx).unwrap();
        assert_eq!(
            sha.insert_task(
                &ctx,
                &ShaTask {
                    chunk: ShaChunk::Local(&[0; 10]),
                    last: false
                }
            ),
            Err(BooterError::DRIVER_SHA256_INVALID_TASK)
        );
        let mut out = [0u8; 32];
        assert_eq!(
            sha.read_result(&ctx, &mut out, true),
            Err(BooterError::DRIVER_SHA256_INVALID_LENGTH)
        );
    }

    #[test]
    fn test_fb_task_past_end() {
        let memory = Memory::new_shared(SysMem::default(), 0x1000);
        let mut sha = EmuSha::new(memory);
        let ctx = ShaContext {
            algo: ShaAlgo::Sha256,
            msg_len: 128,
        };
        sha.init_operation(&ctx).unwrap();
        assert_eq!(
            sha.insert_task(
                &ctx,
                &ShaTask {
                    chunk: ShaChunk::Fb {
                        offset: 0xfc0,
                        len: 128
                    },
                    last: true
                }
            ),
            Err(BooterError::DRIVER_SHA256_INVALID_LENGTH)
        );
    }
}
