//! @acp:module "Completion"
//! @acp:summary "Shell completion over the prepared command tree"
//! @acp:domain cli
//! @acp:layer entry
//!
//! Completion is driven by the shell through the `COMPLETE` environment
//! variable, e.g. `source <(COMPLETE=bash tether)`. It runs before normal
//! parsing and sees the tree without help flags.

use std::ffi::OsString;
use std::io;

use clap_complete::CompleteEnv;

use crate::parser::ParserNode;

/// Environment variable the shell sets when asking for completions
pub const COMPLETE_ENV: &str = "COMPLETE";

/// @acp:summary "Answer a completion request if one is pending"
///
/// Returns `Ok(true)` when completions (or the shell registration script)
/// were written and the invocation should end.
pub fn complete(tree: &ParserNode, argv: &[OsString]) -> io::Result<bool> {
    if std::env::var_os(COMPLETE_ENV).map_or(true, |v| v.is_empty()) {
        return Ok(false);
    }
    let command = tree.build_for_completion();
    tracing::debug!(program = %tree.name(), "answering completion request");
    CompleteEnv::with_factory(move || command.clone())
        .var(COMPLETE_ENV)
        .try_complete(argv.iter().cloned(), None)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}
