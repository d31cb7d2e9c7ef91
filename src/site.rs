//! # Patch sites
//!
//! Known locations of the construction crew sound branch, keyed by game build.
//!
//! `cSC4NetworkConstructionCrew::Init` only copies the game's global sound service pointer into the crew
//! when that global is not null, and the crew checks its copy before playing the animation sounds.
//! The copy is skipped by a `je rel8` when the global is null, so turning it into a `jmp rel8` of the
//! same length and displacement leaves the crew without a sound service.
//!
//! This also drops `kSC4MsgConstructionRoadCrewStart` (`0x89F10866`) and `kSC4MsgConstructionRoadCrewEnd`
//! (`0xA9F10E45`), which are sent from the same branch.

use iced_x86::{Decoder, DecoderOptions, Instruction};
use thiserror::Error;

/// The only game build the patch is known to be valid for
pub const SUPPORTED_BUILD: u16 = 641;

/// Length of the short branch at a patch site: opcode plus 8-bit displacement
pub const BRANCH_LEN: usize = 2;

/// Every known patch site. Builds missing from this table are never patched.
pub static PATCH_SITES: &[PatchSite] = &[PatchSite {
    build: SUPPORTED_BUILD,
    address: 0x006071FC,
    original: 0x74,
    replacement: 0xEB,
}];

/// Errors raised when the code at a patch site is not what the table describes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiteError {
    /// The site does not hold the expected short branch
    #[error("Unexpected instruction at {address:#010X}: {instruction}")]
    UnexpectedInstruction {
        /// Address of the patch site
        address: usize,
        /// Disassembly of what was found
        instruction: String,
    },
    /// The replacement would not be an unconditional short jump to the same target
    #[error("Replacing the instruction at {address:#010X} would produce `{instruction}`")]
    BranchMismatch {
        /// Address of the patch site
        address: usize,
        /// Disassembly of the patched instruction
        instruction: String,
    },
}

/// A single-byte patch of a short branch opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    /// Game build the address belongs to
    pub build: u16,
    /// Absolute address of the branch opcode in the game executable
    pub address: usize,
    /// Opcode expected before patching
    pub original: u8,
    /// Opcode written by the patch
    pub replacement: u8,
}
impl PatchSite {
    /// Looks up the patch site for `build`
    pub fn for_build(build: u16) -> Option<&'static PatchSite> {
        PATCH_SITES.iter().find(|site| site.build == build)
    }

    /// Decodes `code` as 32-bit code located at the patch site
    pub fn decode(&self, code: &[u8; BRANCH_LEN]) -> Instruction {
        Decoder::with_ip(32, code, self.address as u64, DecoderOptions::NONE).decode()
    }

    /// Checks the instruction currently at the site before it gets overwritten.
    ///
    /// Both the original and the already-patched opcode are accepted, as long as the displacement
    /// keeps the branch target unchanged once the replacement opcode is in place.
    pub fn check(&self, code: &[u8; BRANCH_LEN]) -> Result<(), SiteError> {
        let found = self.decode(code);
        let known_opcode = code[0] == self.original || code[0] == self.replacement;
        if found.is_invalid() || !known_opcode || !(found.is_jcc_short() || found.is_jmp_short()) {
            return Err(SiteError::UnexpectedInstruction {
                address: self.address,
                instruction: found.to_string(),
            });
        }

        let patched = self.decode(&[self.replacement, code[1]]);
        if !patched.is_jmp_short()
            || patched.len() != found.len()
            || patched.near_branch_target() != found.near_branch_target()
        {
            return Err(SiteError::BranchMismatch {
                address: self.address,
                instruction: patched.to_string(),
            });
        }

        Ok(())
    }
}
