//! # Patcher
//!
//! This module covers patchers, which are used to overwrite single bytes of code in the running process

pub mod byte;
pub mod mem;

/// Patchers write one byte at an absolute address of the current process and never restore it
///
/// # Safety
///
/// Patchers are inherently unsafe. The implementor must ensure that the implementation of `overwrite` works correctly and is properly documented for avoiding undefined behavior
pub unsafe trait Patcher {
    /// Error type that can occur when patching. If patching always succeeds, use [`std::convert::Infallible`].
    type Error;

    /// Overwrites the byte at `address` with `value`.
    ///
    /// # Safety
    ///
    /// This function is intended to be used on arbitrary memory addresses, but `address` must be valid for the supplied patcher
    unsafe fn overwrite(&self, address: usize, value: u8) -> Result<(), Self::Error>;

    /// Copies `buf.len()` bytes starting at `address` into `buf`.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads of `buf.len()` bytes for the supplied patcher
    unsafe fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), Self::Error>;
}
