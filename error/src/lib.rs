/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the booter for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Booter Error Type
///
/// The upper 16 bits identify the component that raised the error, the
/// lower 16 bits the condition within that component.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BooterError(pub NonZeroU32);

/// Coarse error taxonomy used when deciding what leaves the chip.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorClass {
    /// Malformed input or structure; never retried.
    Argument,

    /// A mutex or engine stayed busy past its timeout.
    Contention,

    /// Sequencing, version, revocation or signature failure.
    Policy,

    /// DMA or bus transfer failure; the destination is not trusted.
    Transfer,
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: BooterError = BooterError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

const COMPONENT_CONTENTION: u32 = 0x0002;
const COMPONENT_TRANSFER: u32 = 0x0003;
const COMPONENT_HANDOFF: u32 = 0x0006;
const COMPONENT_REVOCATION: u32 = 0x0007;
const COMPONENT_IMAGE_VERIFIER: u32 = 0x0008;
const COMPONENT_REPORTING: u32 = 0x000B;

impl BooterError {
    /// Create a booter error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a BooterError from a u32 is to
    /// use `BooterError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BooterError cannot be 0"),
        }
    }

    define_error_constants![
        (DRIVER_BAD_ARGUMENT, 0x0001_0001, "Driver Error: Bad argument"),
        (
            DRIVER_ADDRESS_OVERFLOW,
            0x0001_0002,
            "Driver Error: Address arithmetic overflow"
        ),
        (
            DRIVER_ADDRESS_OUT_OF_APERTURE,
            0x0001_0003,
            "Driver Error: Address outside of the permitted aperture"
        ),
        (
            DRIVER_UNSUPPORTED_CHIP,
            0x0001_0004,
            "Driver Error: Boot ID does not match a supported chip"
        ),
        (
            DRIVER_SHA256_INVALID_TASK,
            0x0001_0005,
            "Driver Error: SHA256 task is not block aligned or too large"
        ),
        (
            DRIVER_SHA256_INVALID_LENGTH,
            0x0001_0006,
            "Driver Error: SHA256 chunk lengths do not add up to the message length"
        ),
        (
            DRIVER_PKA_INVALID_OPERAND,
            0x0001_0007,
            "Driver Error: PKA operand rejected by the engine"
        ),
        (
            DRIVER_WPR_INVALID_RANGE,
            0x0001_0008,
            "Driver Error: WPR range is empty or not granule aligned"
        ),
        (
            DRIVER_MUTEX_ACQUIRE_TIMEOUT,
            0x0002_0001,
            "Driver Error: Hardware mutex acquire timed out"
        ),
        (
            DRIVER_MUTEX_ID_UNAVAILABLE,
            0x0002_0002,
            "Driver Error: No hardware mutex token available"
        ),
        (
            DRIVER_SHA256_ENGINE_BUSY,
            0x0002_0003,
            "Driver Error: SHA256 engine mutex is held by another owner"
        ),
        (
            DRIVER_SHA256_TIMEOUT,
            0x0002_0004,
            "Driver Error: SHA256 task timed out"
        ),
        (
            DRIVER_PKA_ENGINE_BUSY,
            0x0002_0005,
            "Driver Error: PKA engine mutex is held by another owner"
        ),
        (
            DRIVER_PKA_TIMEOUT,
            0x0002_0006,
            "Driver Error: PKA operation timed out"
        ),
        (
            DRIVER_DMA_TIMEOUT,
            0x0002_0007,
            "Driver Error: DMA engine did not go idle"
        ),
        (
            DRIVER_WPR_SCRUB_TIMEOUT,
            0x0002_0008,
            "Driver Error: Memory scrubber did not complete"
        ),
        (
            DRIVER_DMA_SHORT_TRANSFER,
            0x0003_0001,
            "Driver Error: DMA moved fewer bytes than requested"
        ),
        (
            DRIVER_BUS_ERROR,
            0x0003_0002,
            "Driver Error: Global register bus access failed"
        ),
        (
            LAYOUT_INSUFFICIENT_SPACE,
            0x0004_0001,
            "Layout Error: Firmware does not fit in device memory"
        ),
        (
            LAYOUT_INVALID_ALIGNMENT,
            0x0004_0002,
            "Layout Error: Alignment is zero, not a power of two, or out of order"
        ),
        (
            LAYOUT_EMPTY_IMAGE,
            0x0004_0003,
            "Layout Error: Firmware image size is zero"
        ),
        (
            RADIX3_BAD_TABLE,
            0x0005_0001,
            "Radix3 Error: Page table entry is outside the aperture or misaligned"
        ),
        (
            HANDOFF_SEQUENCE_BROKEN,
            0x0006_0001,
            "Handoff Error: Stage flags do not permit this stage"
        ),
        (
            HANDOFF_VERSION_MISMATCH,
            0x0006_0002,
            "Handoff Error: Recorded booter version differs from this stage"
        ),
        (
            REVOCATION_REVOKED,
            0x0007_0001,
            "Revocation Error: Firmware revision is below the revocation floor"
        ),
        (
            REVOCATION_FUSE_VERSION,
            0x0007_0002,
            "Revocation Error: Booter version is below the fuse version"
        ),
        (
            IMAGE_VERIFIER_SIGNATURE_INVALID,
            0x0008_0001,
            "Image Verifier Error: Signature verification failed"
        ),
        (
            IMAGE_VERIFIER_DESCRIPTOR_MALFORMED,
            0x0008_0002,
            "Image Verifier Error: Signature descriptor is malformed"
        ),
        (
            WPR_META_BAD_MAGIC,
            0x0009_0001,
            "WPR Metadata Error: Magic number mismatch"
        ),
        (
            WPR_META_BAD_REVISION,
            0x0009_0002,
            "WPR Metadata Error: Revision mismatch"
        ),
        (
            WPR_META_INVALID_LAYOUT,
            0x0009_0003,
            "WPR Metadata Error: Offsets are not ordered or not contained"
        ),
        (
            WPR_META_FB_SIZE_MISMATCH,
            0x0009_0004,
            "WPR Metadata Error: FB size differs from the hardware"
        ),
        (
            WPR_META_NOT_VERIFIED,
            0x0009_0005,
            "WPR Metadata Error: Recorded metadata was never verified"
        ),
        (
            WPR_META_SIGNATURE_TOO_LARGE,
            0x0009_0006,
            "WPR Metadata Error: Signature blob exceeds its header page"
        ),
        (
            BOOTER_LOAD_FRTS_MISMATCH,
            0x000A_0001,
            "Booter Error: Pre-existing protected region is not the planned FRTS range"
        ),
        (
            BOOTER_WPR_MISMATCH,
            0x000A_0002,
            "Booter Error: Protected region differs from the recorded layout"
        ),
        (
            BOOTER_POLICY_FAILURE,
            0x000B_0001,
            "Booter Error: Generic policy failure"
        ),
    ];

    /// Component field of the error code.
    pub const fn component(self) -> u32 {
        self.0.get() >> 16
    }

    /// Classify the error.
    pub const fn class(self) -> ErrorClass {
        match self.component() {
            COMPONENT_CONTENTION => ErrorClass::Contention,
            COMPONENT_TRANSFER => ErrorClass::Transfer,
            COMPONENT_HANDOFF
            | COMPONENT_REVOCATION
            | COMPONENT_IMAGE_VERIFIER
            | COMPONENT_REPORTING => ErrorClass::Policy,
            _ => ErrorClass::Argument,
        }
    }

    /// Code written to the status mailbox. Policy failures are not
    /// distinguished outside the chip.
    pub const fn reported(self) -> BooterError {
        match self.class() {
            ErrorClass::Policy => Self::BOOTER_POLICY_FAILURE,
            _ => self,
        }
    }
}

impl From<core::num::NonZeroU32> for crate::BooterError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::BooterError(val)
    }
}

impl From<BooterError> for core::num::NonZeroU32 {
    fn from(val: BooterError) -> Self {
        val.0
    }
}

impl From<BooterError> for u32 {
    fn from(val: BooterError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for BooterError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(BooterError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type BooterResult<T> = Result<T, BooterError>;
