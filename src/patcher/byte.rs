//! This module contains a byte patcher

use std::convert::Infallible;
use std::ptr;

use super::Patcher;

/// Patcher for writing single bytes to already-writable memory.
/// This patcher never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytePatcher;
impl BytePatcher {
    /// Creates a new [`BytePatcher`]
    pub const fn new() -> Self {
        Self
    }
}
unsafe impl Patcher for BytePatcher {
    type Error = Infallible;

    unsafe fn overwrite(&self, address: usize, value: u8) -> Result<(), Self::Error> {
        // Safety: caller must ensure that `address` is valid and writable
        ptr::write_volatile(address as *mut u8, value);
        Ok(())
    }

    unsafe fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        // Safety: caller must pass in an `address` that is readable for the full length of `buf`
        ptr::copy_nonoverlapping(address as *const u8, buf.as_mut_ptr(), buf.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::patcher::byte::BytePatcher;
    use crate::patcher::Patcher;

    #[test]
    /// Test that exactly the addressed byte changes
    fn test_overwrite() {
        let mut data = [0x74u8, 0x12, 0x90, 0x90];
        let ptr = data.as_mut_ptr();

        let patcher = BytePatcher::new();

        // patch the first byte only
        unsafe { patcher.overwrite(ptr as usize, 0xEB).unwrap() };

        // make sure the neighbouring bytes were left alone
        assert_eq!(data, [0xEB, 0x12, 0x90, 0x90]);
    }

    #[test]
    /// Test reading a range back out of memory
    fn test_read() {
        let data = [0x74u8, 0x12, 0x90];

        let mut buf = [0u8; 2];
        unsafe {
            BytePatcher::new()
                .read(data.as_ptr() as usize + 1, &mut buf)
                .unwrap()
        };

        assert_eq!(buf, [0x12, 0x90]);
    }
}
