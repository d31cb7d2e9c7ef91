#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod director;
pub mod entry;
pub mod logger;
pub mod module;
pub mod patcher;
pub mod policy;
pub mod site;
pub mod version;

#[cfg(test)]
mod testing;

/// Name written to the log file header
pub const PLUGIN_NAME: &str = "SC4DisableNetworkConstructionSounds";

/// Version written to the log file header
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the plugin log, created next to the DLL
pub const LOG_FILE_NAME: &str = "SC4DisableNetworkConstructionSounds.log";

/// COM director ID of this plugin
pub const DIRECTOR_ID: u32 = 0xC2D4CE53;
