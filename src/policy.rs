//! # Policy
//!
//! Decides whether the running game can be patched, patches it and reports the outcome to the log

use std::fmt::Display;

use log::{debug, error, info};
use thiserror::Error;

use crate::patcher::Patcher;
use crate::site::{PatchSite, SiteError, BRANCH_LEN, SUPPORTED_BUILD};
use crate::version::VersionProbe;

/// Reasons the construction sounds could not be disabled
#[derive(Debug, Error)]
pub enum SoundPatchError<E> {
    /// The game build has no known patch site
    #[error("Requires game version {}, found game version {found}.", SUPPORTED_BUILD)]
    UnsupportedBuild {
        /// Build reported by the version probe
        found: u16,
    },
    /// The code at the patch site is not the expected branch
    #[error("{0}")]
    Site(#[from] SiteError),
    /// Reading or writing the patch site failed
    #[error("{0}")]
    Patch(E),
}

/// Disables the network construction animation sounds, logging the outcome.
///
/// Never fails: every error is written to the log instead. Returns whether the patch is in place.
pub fn apply_disable_construction_sounds<V, P>(probe: &V, patcher: &P) -> bool
where
    V: VersionProbe,
    P: Patcher,
    P::Error: Display,
{
    match try_disable_construction_sounds(probe, patcher) {
        Ok(_) => {
            info!("Disabled the network construction animation sounds.");
            true
        }
        Err(e @ SoundPatchError::UnsupportedBuild { .. }) => {
            error!(
                "Unable to disable the network construction animation sounds. {}",
                e
            );
            false
        }
        Err(e) => {
            error!(
                "Failed to disable the network construction animation sounds: {}",
                e
            );
            false
        }
    }
}

/// Patches the sound branch of the running game.
///
/// Nothing is read or written unless the build has an entry in [`crate::site::PATCH_SITES`],
/// and nothing is written unless the site holds the expected short branch.
pub fn try_disable_construction_sounds<V, P>(
    probe: &V,
    patcher: &P,
) -> Result<&'static PatchSite, SoundPatchError<P::Error>>
where
    V: VersionProbe,
    P: Patcher,
{
    let build = probe.game_version();
    let site =
        PatchSite::for_build(build).ok_or(SoundPatchError::UnsupportedBuild { found: build })?;

    let mut code = [0u8; BRANCH_LEN];
    // Safety: the site belongs to the executable image of this build, which is never relocated
    unsafe { patcher.read(site.address, &mut code) }.map_err(SoundPatchError::Patch)?;
    site.check(&code)?;
    debug!("Patching `{}` at {:#010X}", site.decode(&code), site.address);

    // Safety: as above, and the check guarantees a short branch opcode is being replaced
    unsafe { patcher.overwrite(site.address, site.replacement) }.map_err(SoundPatchError::Patch)?;

    Ok(site)
}
