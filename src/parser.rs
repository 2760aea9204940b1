//! @acp:module "Parser Tree"
//! @acp:summary "Hierarchical argument parser nodes with lazily created child groups"
//! @acp:domain cli
//! @acp:layer core
//!
//! A [`ParserNode`] wraps one level of the `clap` definition. Child commands
//! hang off a single [`Subparsers`] group which is only ever created through
//! [`ParserNode::subparsers`]; the one-shot [`ParserNode::add_subparsers`] is
//! disabled so a node can never end up with two groups.
//!
//! The tree stays mutable while commands register into it. Parsing works on
//! the `clap::Command` produced by [`ParserNode::build`].

use std::io::Write;

use clap::{Arg, ColorChoice};

use crate::command::Command;
use crate::error::{CliError, Halt, Result};
use crate::term::Console;

/// Heading of the child command listing
pub const SUBPARSERS_TITLE: &str = "drill down";

/// Placeholder for the child command in usage lines
pub const SUBPARSERS_METAVAR: &str = "COMMAND";

/// Group of child parsers below a node
pub struct Subparsers {
    title: String,
    metavar: String,
    prefix: String,
    choices: Vec<ParserNode>,
}

impl Subparsers {
    fn new(prefix: &str) -> Self {
        Self {
            title: SUBPARSERS_TITLE.to_string(),
            metavar: SUBPARSERS_METAVAR.to_string(),
            prefix: prefix.to_string(),
            choices: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn metavar(&self) -> &str {
        &self.metavar
    }

    /// @acp:summary "Create a child parser named `name`"
    pub fn add_parser(&mut self, name: &str) -> Result<&mut ParserNode> {
        if self.choices.iter().any(|c| c.name() == name) {
            return Err(CliError::DuplicateParser(name.to_string()));
        }
        let path = format!("{} {}", self.prefix, name);
        self.choices.push(ParserNode::with_path(name, path));
        let index = self.choices.len() - 1;
        Ok(&mut self.choices[index])
    }

    pub fn get(&self, name: &str) -> Option<&ParserNode> {
        self.choices.iter().find(|c| c.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParserNode> {
        self.choices.iter_mut().find(|c| c.name() == name)
    }

    /// Child names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.choices.iter().map(ParserNode::name)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

/// One level of the command tree
pub struct ParserNode {
    command: clap::Command,
    path: String,
    subparsers: Option<Subparsers>,
    execute: Option<Box<dyn Command>>,
}

impl ParserNode {
    /// Top of the tree; `program` is used in usage lines
    pub fn root(program: &str) -> Self {
        Self::with_path(program, program.to_string())
    }

    fn with_path(name: &str, path: String) -> Self {
        Self {
            command: clap::Command::new(name.to_string()),
            path,
            subparsers: None,
            execute: None,
        }
    }

    pub fn name(&self) -> &str {
        self.command.get_name()
    }

    /// Full command path, e.g. `tether list profiles`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Apply a builder step to the underlying `clap::Command`
    pub fn configure<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(clap::Command) -> clap::Command,
    {
        let command = std::mem::take(&mut self.command);
        self.command = f(command);
        self
    }

    pub fn add_argument(&mut self, arg: Arg) -> &mut Self {
        self.configure(|c| c.arg(arg))
    }

    /// Short help (also used as description) and an optional epilog
    pub fn describe(&mut self, title: &str, body: Option<&str>) -> &mut Self {
        let title = title.to_string();
        let body = body.map(str::to_string);
        self.configure(|c| {
            let c = c.about(title);
            match body {
                Some(body) => c.after_help(body),
                None => c,
            }
        })
    }

    /// @acp:summary "Child group, created on first access"
    pub fn subparsers(&mut self) -> &mut Subparsers {
        let prefix = &self.path;
        self.subparsers.get_or_insert_with(|| Subparsers::new(prefix))
    }

    pub fn has_subparsers(&self) -> bool {
        self.subparsers.is_some()
    }

    /// One-shot creation is disabled; use [`ParserNode::subparsers`].
    pub fn add_subparsers(&mut self) -> Result<&mut Subparsers> {
        Err(CliError::SubparsersDisabled)
    }

    /// Previously registered child by name
    pub fn lookup(&self, name: &str) -> Result<&ParserNode> {
        self.subparsers
            .as_ref()
            .and_then(|s| s.get(name))
            .ok_or_else(|| CliError::UnknownParser(name.to_string()))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut ParserNode> {
        self.subparsers
            .as_mut()
            .and_then(|s| s.get_mut(name))
            .ok_or_else(|| CliError::UnknownParser(name.to_string()))
    }

    pub fn set_execute(&mut self, command: Box<dyn Command>) {
        self.execute = Some(command);
    }

    /// Command bound to this node, if any
    pub fn execute(&self) -> Option<&dyn Command> {
        self.execute.as_deref()
    }

    /// Render this node and everything below it for parsing
    pub fn build(&self) -> clap::Command {
        self.render(false)
    }

    /// Same tree with help flags removed, for shell completion
    pub fn build_for_completion(&self) -> clap::Command {
        self.render(true)
    }

    fn render(&self, completion: bool) -> clap::Command {
        let mut command = self.command.clone();
        if completion {
            command = command.disable_help_flag(true).disable_help_subcommand(true);
        }
        if let Some(subparsers) = &self.subparsers {
            command = command
                .subcommand_help_heading(subparsers.title.clone())
                .subcommand_value_name(subparsers.metavar.clone());
            for child in &subparsers.choices {
                command = command.subcommand(child.render(completion));
            }
        }
        command
    }

    /// Nodes selected by following `path` from here, starting with `self`.
    /// Stops at the first name that is not a child.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Vec<&ParserNode> {
        let mut chain = vec![self];
        let mut current = self;
        for name in path {
            match current.subparsers.as_ref().and_then(|s| s.get(name.as_ref())) {
                Some(child) => {
                    chain.push(child);
                    current = child;
                }
                None => break,
            }
        }
        chain
    }

    /// Deepest node reached by raw command-line words, skipping options
    pub fn resolve_words<S: AsRef<str>>(&self, words: &[S]) -> &ParserNode {
        let mut current = self;
        for word in words {
            let word: &str = word.as_ref();
            if word.starts_with('-') {
                continue;
            }
            if let Some(child) = current.subparsers.as_ref().and_then(|s| s.get(word)) {
                current = child;
            }
        }
        current
    }

    /// @acp:summary "Print help, a red `Error:` and the message; exit status 2"
    pub fn error(&self, console: &Console, message: &str) -> Halt {
        let mut command = self.build().bin_name(self.path.clone()).color(ColorChoice::Never);
        let help = command.render_help().to_string();
        let prefix = console.colorized("Error:").red().bold();

        let mut err = console.err();
        // Nothing sensible is left to do if stderr is gone.
        let _ = write!(err, "{}", help);
        if !help.ends_with('\n') {
            let _ = writeln!(err);
        }
        let _ = writeln!(err, "{} {}", prefix, message);
        let _ = err.flush();

        tracing::debug!(node = %self.path, %message, "usage error");
        Halt::Exit(2)
    }
}
