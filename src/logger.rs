//! # Logger
//!
//! The plugin log file that sits next to the DLL

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use thiserror::Error;

use crate::{PLUGIN_NAME, PLUGIN_VERSION};

/// Most verbose level written to the log file
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Errors when setting up the log file
#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be located, created or written
    #[error("Unable to write the log file: {0}")]
    Io(#[from] io::Error),
    /// Another logger was installed first
    #[error("{0}")]
    SetLogger(#[from] log::SetLoggerError),
}

/// Creates (or truncates) the log file at `path` and writes the header line
pub fn open_log_file(path: &Path) -> Result<File, LogError> {
    let mut file = File::create(path)?;
    writeln!(file, "{} v{}", PLUGIN_NAME, PLUGIN_VERSION)?;
    Ok(file)
}

/// Opens the log file at `path` and routes the `log` macros to it
pub fn init(path: &Path) -> Result<(), LogError> {
    let file = open_log_file(path)?;

    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_location_level(LevelFilter::Off)
        .build();
    WriteLogger::init(LOG_LEVEL, config, file)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;

    use crate::logger::{init, open_log_file, LogError};

    /// Unique scratch path inside the system temp directory
    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sc4-dncs-{}-{}", process::id(), name))
    }

    #[test]
    fn test_header() {
        let path = scratch("header.log");

        drop(open_log_file(&path).unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            format!("SC4DisableNetworkConstructionSounds v{}\n", env!("CARGO_PKG_VERSION"))
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    /// Reopening the log discards the previous session
    fn test_truncates() {
        let path = scratch("truncate.log");
        fs::write(&path, "old session\nold line\n").unwrap();

        drop(open_log_file(&path).unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("old"));
        assert_eq!(contents.lines().count(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let path = scratch("missing").join("nested").join("plugin.log");

        assert!(matches!(init(&path), Err(LogError::Io(_))));
        assert!(!path.exists());
    }
}
