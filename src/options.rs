//! @acp:module "Execution Options"
//! @acp:summary "Parsed arguments merged along the selected command path"
//! @acp:domain cli
//! @acp:layer core

use std::any::Any;
use std::io::Write;

use clap::ArgMatches;

use crate::context::CliContext;
use crate::error::Halt;
use crate::parser::ParserNode;
use crate::tabular::RenderTarget;
use crate::term::Console;

/// Argument id of the hidden global debug flag
pub const DEBUG: &str = "debug";
/// Argument id of `--profile-name`
pub const PROFILE_NAME: &str = "profile_name";
/// Argument id of `--output-format`
pub const OUTPUT_FORMAT: &str = "output_format";

/// Everything a command sees when it runs.
///
/// Arguments from every node on the selected path are visible as one flat
/// record. Lookups try the deepest node first and work outwards, so a
/// command's own arguments shadow anything declared further up.
///
/// The driver binds the options to the node whose command runs, so the
/// command can describe itself and report usage errors through that node.
pub struct ExecutionOptions<'a> {
    layers: Vec<ArgMatches>,
    path: Vec<String>,
    context: &'a CliContext,
    console: &'a Console,
    node: Option<&'a ParserNode>,
}

impl<'a> ExecutionOptions<'a> {
    /// Flatten `matches` into per-node layers, root first
    pub fn from_matches(matches: ArgMatches, context: &'a CliContext, console: &'a Console) -> Self {
        let mut layers = Vec::new();
        let mut path = Vec::new();
        let mut current = matches;
        loop {
            let next = current
                .subcommand()
                .map(|(name, sub)| (name.to_string(), sub.clone()));
            layers.push(current);
            match next {
                Some((name, sub)) => {
                    path.push(name);
                    current = sub;
                }
                None => break,
            }
        }
        Self {
            layers,
            path,
            context,
            console,
            node: None,
        }
    }

    /// Bind to the node whose command is about to run
    pub fn bound_to(mut self, node: &'a ParserNode) -> Self {
        self.node = Some(node);
        self
    }

    /// Node the running command is registered under
    pub fn node(&self) -> Option<&'a ParserNode> {
        self.node
    }

    /// @acp:summary "Usage error from the running command; exit status 2"
    pub fn error(&self, message: &str) -> Halt {
        match self.node {
            Some(node) => node.error(self.console, message),
            None => {
                let prefix = self.console.colorized("Error:").red().bold();
                let mut err = self.console.err();
                let _ = writeln!(err, "{} {}", prefix, message);
                Halt::Exit(2)
            }
        }
    }

    /// Subcommand names from the root to the selected node
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn context(&self) -> &'a CliContext {
        self.context
    }

    pub fn console(&self) -> &'a Console {
        self.console
    }

    /// Typed value of `id` from the deepest node declaring it
    pub fn get<T>(&self, id: &str) -> Option<&T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        self.layers
            .iter()
            .rev()
            .find_map(|m| m.try_get_one::<T>(id).ok().flatten())
    }

    pub fn string(&self, id: &str) -> Option<&str> {
        self.get::<String>(id).map(String::as_str)
    }

    /// True if the flag was set at any level
    pub fn flag(&self, id: &str) -> bool {
        self.layers
            .iter()
            .any(|m| matches!(m.try_get_one::<bool>(id), Ok(Some(true))))
    }

    pub fn debug(&self) -> bool {
        self.flag(DEBUG)
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.string(PROFILE_NAME)
    }

    pub fn output_format(&self) -> Option<RenderTarget> {
        self.get::<RenderTarget>(OUTPUT_FORMAT).copied()
    }
}
