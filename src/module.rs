//! Locating the plugin module and its log file

use std::io;
use std::path::{Path, PathBuf};

use crate::LOG_FILE_NAME;

/// Composes the log file path that sits next to the module at `module_path`
pub fn log_file_path(module_path: &Path) -> PathBuf {
    module_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(LOG_FILE_NAME)
}

/// Returns the path of the module this code was loaded from
#[cfg(windows)]
pub fn current_module_path() -> io::Result<PathBuf> {
    use windows_sys::Win32::Foundation::HMODULE;
    use windows_sys::Win32::System::LibraryLoader::{
        GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    /// Any address inside this module will do
    static ANCHOR: u8 = 0;

    let mut module: HMODULE = 0;
    let found = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            &ANCHOR as *const u8 as *const u16,
            &mut module,
        )
    };
    if found == 0 {
        return Err(io::Error::last_os_error());
    }

    module_file_name(module)
}

/// Returns the path of the module this code was loaded from
///
/// The game only runs on Windows, so other targets report the current executable.
#[cfg(not(windows))]
pub fn current_module_path() -> io::Result<PathBuf> {
    std::env::current_exe()
}

/// Returns the full path of `module`, or of the process executable when `module` is `0`
#[cfg(windows)]
pub(crate) fn module_file_name(module: windows_sys::Win32::Foundation::HMODULE) -> io::Result<PathBuf> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;

    use windows_sys::Win32::Foundation::MAX_PATH;
    use windows_sys::Win32::System::LibraryLoader::GetModuleFileNameW;

    let mut buf = vec![0u16; MAX_PATH as usize];
    loop {
        let len = unsafe { GetModuleFileNameW(module, buf.as_mut_ptr(), buf.len() as u32) } as usize;
        if len == 0 {
            return Err(io::Error::last_os_error());
        }
        // a full buffer means the path was truncated
        if len < buf.len() {
            buf.truncate(len);
            return Ok(PathBuf::from(OsString::from_wide(&buf)));
        }
        buf.resize(buf.len() * 2, 0);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::module::{current_module_path, log_file_path};

    #[test]
    fn test_log_file_path() {
        let dir = Path::new("games").join("SimCity 4").join("Plugins");

        assert_eq!(
            log_file_path(&dir.join("ext.dll")),
            dir.join("SC4DisableNetworkConstructionSounds.log")
        );
    }

    #[test]
    fn test_log_file_path_absolute() {
        assert_eq!(
            log_file_path(Path::new("/Games/SC4/Plugins/ext.dll")),
            Path::new("/Games/SC4/Plugins/SC4DisableNetworkConstructionSounds.log")
        );
    }

    #[test]
    #[cfg(windows)]
    fn test_log_file_path_windows() {
        assert_eq!(
            log_file_path(Path::new(r"C:\Games\SC4\Plugins\ext.dll")),
            Path::new(r"C:\Games\SC4\Plugins\SC4DisableNetworkConstructionSounds.log")
        );
    }

    #[test]
    /// A bare file name keeps the log in the working directory
    fn test_log_file_path_bare() {
        assert_eq!(
            log_file_path(Path::new("ext.dll")),
            Path::new("SC4DisableNetworkConstructionSounds.log")
        );
    }

    #[test]
    fn test_current_module_path() {
        let path = current_module_path().unwrap();

        assert!(path.is_absolute());
        assert!(path.parent().is_some());
    }
}
