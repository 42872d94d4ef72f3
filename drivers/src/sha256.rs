/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains API for the SHA-256 accelerator.

--*/

use booter_error::{BooterError, BooterResult};
use booter_image_types::{Sha256Digest, SHA256_DIGEST_BYTE_SIZE};

use crate::memory_layout::{SHA_BLOCK_SIZE, SHA_MAX_TASK_SIZE, SHA_TIMEOUT_NS};
use crate::{wait, CryptoMutex, MutexGuard, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaAlgo {
    Sha256,
}

/// Per-operation context handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaContext {
    pub algo: ShaAlgo,

    /// Total message length across all tasks.
    pub msg_len: u64,
}

/// One slice of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaChunk<'b> {
    /// Bytes resident in local memory.
    Local(&'b [u8]),

    /// Bytes the engine fetches from FB itself.
    Fb { offset: u64, len: u64 },
}

impl ShaChunk<'_> {
    pub fn len(&self) -> u64 {
        match self {
            ShaChunk::Local(data) => data.len() as u64,
            ShaChunk::Fb { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaTask<'b> {
    pub chunk: ShaChunk<'b>,

    /// All but the last task must be block aligned.
    pub last: bool,
}

/// SHA accelerator programming interface.
pub trait ShaEngine {
    fn reset(&mut self) -> BooterResult<()>;

    /// Take the engine's own lock with a hardware mutex token.
    fn acquire_mutex(&mut self, token: u32) -> bool;

    fn release_mutex(&mut self, token: u32);

    fn init_operation(&mut self, ctx: &ShaContext) -> BooterResult<()>;

    fn insert_task(&mut self, ctx: &ShaContext, task: &ShaTask<'_>) -> BooterResult<()>;

    fn busy(&self) -> bool;

    /// Copy out the digest, optionally scrubbing the engine's copy.
    fn read_result(&mut self, ctx: &ShaContext, out: &mut [u8], scrub: bool) -> BooterResult<()>;
}

/// Holds the engine lock for one digest operation.
struct ShaOp<'e> {
    engine: &'e mut dyn ShaEngine,
    token: u32,
}

impl Drop for ShaOp<'_> {
    fn drop(&mut self) {
        let _ = self.engine.reset();
        self.engine.release_mutex(self.token);
    }
}

pub struct Sha256<'a> {
    engine: &'a mut dyn ShaEngine,
    timer: &'a dyn Timer,
}

impl<'a> Sha256<'a> {
    pub fn new(engine: &'a mut dyn ShaEngine, timer: &'a dyn Timer) -> Self {
        Self { engine, timer }
    }

    /// Digest a local buffer.
    pub fn digest(
        &mut self,
        crypto: &MutexGuard<'_, CryptoMutex>,
        data: &[u8],
    ) -> BooterResult<Sha256Digest> {
        self.digest_chunks(
            crypto,
            data.len() as u64,
            &mut core::iter::once(ShaChunk::Local(data)),
        )
    }

    /// Digest a message delivered as a sequence of chunks under one running
    /// hash context.
    ///
    /// # Arguments
    ///
    /// * `crypto` - Held crypto mutex
    /// * `total_len` - Sum of all chunk lengths
    /// * `chunks` - Message slices in order; all but the last must be a
    ///   multiple of the block size, and none may exceed the task limit
    pub fn digest_chunks<'b>(
        &mut self,
        crypto: &MutexGuard<'_, CryptoMutex>,
        total_len: u64,
        chunks: &mut dyn Iterator<Item = ShaChunk<'b>>,
    ) -> BooterResult<Sha256Digest> {
        let token = crypto.token();
        if !self.engine.acquire_mutex(token) {
            return Err(BooterError::DRIVER_SHA256_ENGINE_BUSY);
        }
        let op = ShaOp {
            engine: &mut *self.engine,
            token,
        };

        let ctx = ShaContext {
            algo: ShaAlgo::Sha256,
            msg_len: total_len,
        };
        op.engine.reset()?;
        op.engine.init_operation(&ctx)?;

        let mut chunks = chunks.peekable();
        let mut hashed = 0u64;
        let mut tasks = 0usize;
        while let Some(chunk) = chunks.next() {
            let last = chunks.peek().is_none();
            let len = chunk.len();
            if len > SHA_MAX_TASK_SIZE || (!last && len % SHA_BLOCK_SIZE != 0) {
                return Err(BooterError::DRIVER_SHA256_INVALID_TASK);
            }
            hashed = hashed
                .checked_add(len)
                .ok_or(BooterError::DRIVER_SHA256_INVALID_LENGTH)?;

            op.engine.insert_task(&ctx, &ShaTask { chunk, last })?;
            wait::until(
                self.timer,
                SHA_TIMEOUT_NS,
                BooterError::DRIVER_SHA256_TIMEOUT,
                || Ok(!op.engine.busy()),
            )?;
            tasks += 1;
        }
        if tasks == 0 || hashed != total_len {
            return Err(BooterError::DRIVER_SHA256_INVALID_LENGTH);
        }

        let mut digest = [0u8; SHA256_DIGEST_BYTE_SIZE];
        op.engine.read_result(&ctx, &mut digest, true)?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBus, FakeTimer, RecordingSha};
    use crate::{PlatformOps, TU10X};

    fn with_crypto<R>(f: impl FnOnce(&MutexGuard<'_, CryptoMutex>, &FakeTimer) -> R) -> R {
        let regs = TU10X.regs();
        let bus = FakeBus::default();
        bus.set(regs.mutex_id_acquire, 4);
        let timer = FakeTimer::new(1);
        let guard = MutexGuard::<CryptoMutex>::acquire(&bus, regs, &timer).unwrap();
        f(&guard, &timer)
    }

    #[test]
    fn test_chunk_plan_reaches_engine() {
        let mut engine = RecordingSha::default();
        with_crypto(|crypto, timer| {
            let tail = [0u8; 20];
            let mut chunks = [
                ShaChunk::Fb { offset: 0, len: 128 },
                ShaChunk::Fb { offset: 128, len: 64 },
                ShaChunk::Local(&tail),
            ]
            .into_iter();
            Sha256::new(&mut engine, timer)
                .digest_chunks(crypto, 212, &mut chunks)
                .unwrap();
        });
        assert_eq!(engine.tasks, vec![(128, false), (64, false), (20, true)]);
        assert_eq!(engine.msg_len, 212);
        assert!(engine.scrubbed);
        assert_eq!(engine.owner, None);
    }

    #[test]
    fn test_unaligned_middle_chunk_rejected() {
        let mut engine = RecordingSha::default();
        let result = with_crypto(|crypto, timer| {
            let mut chunks = [
                ShaChunk::Fb { offset: 0, len: 100 },
                ShaChunk::Local(&[1, 2, 3]),
            ]
            .into_iter();
            Sha256::new(&mut engine, timer).digest_chunks(crypto, 103, &mut chunks)
        });
        assert_eq!(result, Err(BooterError::DRIVER_SHA256_INVALID_TASK));
        // the engine lock is released on the error path
        assert_eq!(engine.owner, None);
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut engine = RecordingSha::default();
        let result = with_crypto(|crypto, timer| {
            let mut chunks = [ShaChunk::Fb {
                offset: 0,
                len: SHA_MAX_TASK_SIZE + SHA_BLOCK_SIZE,
            }]
            .into_iter();
            Sha256::new(&mut engine, timer).digest_chunks(
                crypto,
                SHA_MAX_TASK_SIZE + SHA_BLOCK_SIZE,
                &mut chunks,
            )
        });
        assert_eq!(result, Err(BooterError::DRIVER_SHA256_INVALID_TASK));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut engine = RecordingSha::default();
        let result = with_crypto(|crypto, timer| {
            Sha256::new(&mut engine, timer).digest_chunks(
                crypto,
                10,
                &mut [ShaChunk::Local(&[0; 9])].into_iter(),
            )
        });
        assert_eq!(result, Err(BooterError::DRIVER_SHA256_INVALID_LENGTH));
    }

    #[test]
    fn test_engine_held_elsewhere() {
        let mut engine = RecordingSha {
            owner: Some(99),
            ..Default::default()
        };
        let result = with_crypto(|crypto, timer| Sha256::new(&mut engine, timer).digest(crypto, b"abc"));
        assert_eq!(result, Err(BooterError::DRIVER_SHA256_ENGINE_BUSY));
        assert_eq!(engine.owner, Some(99));
    }
}
