//! This module contains a patcher which adjusts memory permissions to patch read-only code

use region::Protection;
use thiserror::Error;

use super::Patcher;

/// Errors when using permission patching
#[derive(Debug, Error)]
pub enum PermissionError<E> {
    /// Error when querying or setting memory protections
    #[error("Error setting memory protections: {0}")]
    ProtectionError(#[from] region::Error),
    /// The memory to be read is mapped but not readable
    #[error("Memory at {0:#010X} is not readable")]
    Unreadable(usize),
    /// Custom error type from the underlying patcher
    #[error("{0}")]
    CustomError(E),
}

/// Changes and restores page protections on behalf of [`PermissionWrapper`]
///
/// # Safety
///
/// `unprotect` must leave `location..location + len` writable and executable until the returned guard is dropped,
/// and dropping the guard must restore the previous protection.
pub unsafe trait Protect {
    /// Guard returned by [`Protect::unprotect`]. The previous protection is restored when it is dropped.
    type Guard;

    /// Makes `len` bytes at `location` readable, writable and executable.
    ///
    /// # Safety
    ///
    /// Changing the protection of memory that is in use elsewhere in the process can make it writable from other threads.
    unsafe fn unprotect(&self, location: *const u8, len: usize) -> Result<Self::Guard, region::Error>;

    /// Returns whether every page covering `len` bytes at `location` is readable
    fn is_readable(&self, location: *const u8, len: usize) -> Result<bool, region::Error>;

    /// Makes freshly written code visible to instruction fetches
    ///
    /// # Safety
    ///
    /// `location` must be mapped for `len` bytes
    unsafe fn flush(&self, location: *const u8, len: usize);
}

/// [`Protect`] implementation backed by the `region` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct RegionProtector;
unsafe impl Protect for RegionProtector {
    type Guard = region::ProtectGuard;

    unsafe fn unprotect(&self, location: *const u8, len: usize) -> Result<Self::Guard, region::Error> {
        region::protect_with_handle(location, len, Protection::READ_WRITE_EXECUTE)
    }

    fn is_readable(&self, location: *const u8, len: usize) -> Result<bool, region::Error> {
        for region in region::query_range(location, len)? {
            if !region?.protection().contains(Protection::READ) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    unsafe fn flush(&self, location: *const u8, len: usize) {
        flush_instruction_cache(location, len);
    }
}

/// Flushes the instruction cache of the current process for `len` bytes at `location`
#[cfg(windows)]
unsafe fn flush_instruction_cache(location: *const u8, len: usize) {
    use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    FlushInstructionCache(GetCurrentProcess(), location.cast(), len);
}

/// Flushes the instruction cache of the current process for `len` bytes at `location`
///
/// x86 and x86-64 keep instruction fetch coherent with stores on the writing core.
#[cfg(not(windows))]
unsafe fn flush_instruction_cache(_location: *const u8, _len: usize) {}

/// This struct wraps patchers to allow them to write to code that's normally unwritable.
/// It achieves this result by changing the memory permissions of the target byte, triggering the patch,
/// flushing the instruction cache and then reverting the permissions.
///
/// # Safety
///
/// `PermissionWrapper` only changes the protection of the single byte it was asked to overwrite,
/// pairing `PermissionWrapper` with a patcher that writes more memory than that is undefined behavior.
///
/// The target address **MUST** be memory not tracked by Rust, such as the code of the host executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionWrapper<P, M = RegionProtector> {
    /// Underlying patcher.
    patcher: P,
    /// Changes page protection around the write
    protector: M,
}
impl<P: Patcher> PermissionWrapper<P> {
    /// Creates a new PermissionWrapper using [`RegionProtector`]
    pub const fn new(patcher: P) -> Self {
        Self::with_protector(patcher, RegionProtector)
    }
}
impl<P, M> PermissionWrapper<P, M> {
    /// Creates a new PermissionWrapper with a custom protection strategy
    pub const fn with_protector(patcher: P, protector: M) -> Self {
        Self { patcher, protector }
    }
}

unsafe impl<P, M> Patcher for PermissionWrapper<P, M>
where
    P: Patcher,
    M: Protect,
{
    type Error = PermissionError<P::Error>;

    unsafe fn overwrite(&self, address: usize, value: u8) -> Result<(), Self::Error> {
        let location = address as *const u8;

        // restores the previous protection when dropped, after the flush below
        let _guard = self.protector.unprotect(location, 1)?;

        self.patcher
            .overwrite(address, value)
            .map_err(PermissionError::CustomError)?;

        self.protector.flush(location, 1);
        Ok(())
    }

    unsafe fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        if !self.protector.is_readable(address as *const u8, buf.len())? {
            return Err(PermissionError::Unreadable(address));
        }
        self.patcher
            .read(address, buf)
            .map_err(PermissionError::CustomError)
    }
}
