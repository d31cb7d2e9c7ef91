//! # Version
//!
//! Detection of the running game build

use std::sync::OnceLock;

/// Source of the game's 16-bit build number.
///
/// Implementations must return the same value for the lifetime of the process.
/// Unknown builds are reported as `0` or any other number that is not a known build.
pub trait VersionProbe {
    /// Returns the build number of the running game, e.g. `641` for SimCity 4 Deluxe 1.1.641
    fn game_version(&self) -> u16;
}

/// Reads the build number from the version resource of the process executable
#[derive(Debug, Default)]
pub struct HostVersionProbe {
    /// Build number, detected on first use
    build: OnceLock<u16>,
}
impl HostVersionProbe {
    /// Creates a new [`HostVersionProbe`]
    pub const fn new() -> Self {
        Self {
            build: OnceLock::new(),
        }
    }
}
impl VersionProbe for HostVersionProbe {
    fn game_version(&self) -> u16 {
        *self.build.get_or_init(detect_game_version)
    }
}

/// Detects the build of the process executable, `0` if it can't be determined
#[cfg(windows)]
fn detect_game_version() -> u16 {
    match crate::module::module_file_name(0).and_then(|exe| windows::file_build_number(&exe)) {
        Ok(build) => build,
        Err(e) => {
            log::debug!("Unable to read the game version: {}", e);
            0
        }
    }
}

/// Detects the build of the process executable, `0` if it can't be determined
#[cfg(not(windows))]
fn detect_game_version() -> u16 {
    0
}

#[cfg(windows)]
mod windows {
    //! Version resource access

    use std::ffi::c_void;
    use std::io;
    use std::iter;
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr;

    use windows_sys::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW, VS_FIXEDFILEINFO,
    };

    /// Returns the build component of a file's version, e.g. `641` for `1.1.641.0`
    pub(super) fn file_build_number(path: &Path) -> io::Result<u16> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(iter::once(0))
            .collect();

        let mut handle = 0u32;
        let size = unsafe { GetFileVersionInfoSizeW(wide.as_ptr(), &mut handle) };
        if size == 0 {
            return Err(io::Error::last_os_error());
        }

        let mut data = vec![0u8; size as usize];
        if unsafe { GetFileVersionInfoW(wide.as_ptr(), 0, size, data.as_mut_ptr().cast()) } == 0 {
            return Err(io::Error::last_os_error());
        }

        // `\` selects the VS_FIXEDFILEINFO root block
        let root = [u16::from(b'\\'), 0];
        let mut info: *mut c_void = ptr::null_mut();
        let mut len = 0u32;
        let found = unsafe { VerQueryValueW(data.as_ptr().cast(), root.as_ptr(), &mut info, &mut len) };
        if found == 0 || info.is_null() || (len as usize) < mem::size_of::<VS_FIXEDFILEINFO>() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing fixed file version information",
            ));
        }

        // Safety: `info` points into `data`, which is still alive
        let info = unsafe { ptr::read_unaligned(info as *const VS_FIXEDFILEINFO) };
        Ok((info.dwFileVersionLS >> 16) as u16)
    }
}
