//! # Director
//!
//! The plugin object handed to the game's COM loader

use std::fmt::Display;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Once;

use crate::logger::LogError;
use crate::module::log_file_path;
use crate::patcher::Patcher;
use crate::policy::apply_disable_construction_sounds;
use crate::version::VersionProbe;
use crate::DIRECTOR_ID;

/// Lifecycle handler of the plugin.
///
/// Patches the game the first time it is started. Later starts do nothing.
#[derive(Debug)]
pub struct Director<V, P> {
    /// Game build source
    probe: V,
    /// Writes the patch
    patcher: P,
    /// Latches the first start
    started: Once,
}
impl<V, P> Director<V, P>
where
    V: VersionProbe,
    P: Patcher,
    P::Error: Display,
{
    /// Creates a director without touching the log
    pub const fn new(probe: V, patcher: P) -> Self {
        Self {
            probe,
            patcher,
            started: Once::new(),
        }
    }

    /// Creates a director after setting up the plugin log next to the module found by `locate`.
    ///
    /// Failing to set up the log, including by panicking, still yields a working director.
    pub fn load<L, I>(probe: V, patcher: P, locate: L, init_log: I) -> Self
    where
        L: FnOnce() -> io::Result<PathBuf>,
        I: FnOnce(&Path) -> Result<(), LogError>,
    {
        // diagnostics are lost, patching still happens
        let _ = panic::catch_unwind(AssertUnwindSafe(|| init_plugin_log(locate, init_log)));

        Self::new(probe, patcher)
    }

    /// Identifier of this plugin's director
    pub fn director_id(&self) -> u32 {
        DIRECTOR_ID
    }

    /// Called by the game once its COM framework is up. Always reports success.
    pub fn on_start(&self) -> bool {
        self.started.call_once(|| {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                apply_disable_construction_sounds(&self.probe, &self.patcher)
            }));
        });

        true
    }
}

/// Sets up the log file next to the module found by `locate`
fn init_plugin_log<L, I>(locate: L, init_log: I) -> Result<(), LogError>
where
    L: FnOnce() -> io::Result<PathBuf>,
    I: FnOnce(&Path) -> Result<(), LogError>,
{
    let module = locate()?;
    init_log(&log_file_path(&module))
}
