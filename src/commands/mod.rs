//! @acp:module "Commands"
//! @acp:summary "Business commands and their place in the tree"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Each command is in its own submodule; [`register`] wires them all below
//! the root and the verbs prepared by the driver.

pub mod origin;
pub mod profiles;

pub use origin::{CmdShowProfile, CmdWhoami};
pub use profiles::{CmdAddProfile, CmdListProfiles, CmdRemoveProfile, CmdSetDefaultProfile};

use crate::command::Register;
use crate::context::CliContext;
use crate::error::Result;
use crate::parser::ParserNode;

/// @acp:summary "Register every business command"
///
/// Expects the `list` verb to exist already.
pub fn register(root: &mut ParserNode, ctx: &CliContext) -> Result<()> {
    CmdListProfiles::register(root, None, ctx)?;
    CmdListProfiles::register(root.lookup_mut("list")?, Some("profiles"), ctx)?;
    CmdAddProfile::register(root, None, ctx)?;
    CmdRemoveProfile::register(root, None, ctx)?;
    CmdSetDefaultProfile::register(root, None, ctx)?;
    CmdWhoami::register(root, None, ctx)?;
    CmdShowProfile::register(root, None, ctx)?;
    Ok(())
}
