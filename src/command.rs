//! @acp:module "Commands Core"
//! @acp:summary "Command traits, registration descriptors and the variant adapters"
//! @acp:domain cli
//! @acp:layer core
//!
//! A concrete command implements [`Register`] (its descriptor and how it binds
//! to a parser node) plus exactly one of the execution traits:
//!
//! | trait                  | adds                          | `execute` receives          |
//! |------------------------|-------------------------------|-----------------------------|
//! | [`Command`]            | nothing                       | options                     |
//! | [`TableCommand`]       | `--output-format`             | options, target             |
//! | [`OriginCommand`]      | `--profile-name`              | origin, options             |
//! | [`OriginTableCommand`] | both                          | origin, options, target     |
//!
//! Every variant ends up stored on its node as a `Box<dyn Command>`; the
//! adapters in this module ([`Tabular`], [`WithOrigin`], [`WithOriginTable`])
//! add the variant's arguments at bind time and do the extra work when invoked.

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg};

use crate::context::{CliContext, ExecutionContext};
use crate::error::{CliError, Outcome, Result};
use crate::options::{ExecutionOptions, OUTPUT_FORMAT, PROFILE_NAME};
use crate::parser::ParserNode;
use crate::session::Origin;
use crate::tabular::RenderTarget;

/// A unit of work bound to a parser node
pub trait Command {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome;
}

/// A command rendering tabular output
pub trait TableCommand {
    fn execute(&self, options: &ExecutionOptions<'_>, target: RenderTarget) -> Outcome;
}

/// A command that talks to the remote service
pub trait OriginCommand {
    fn execute(&self, origin: &Origin, options: &ExecutionOptions<'_>) -> Outcome;
}

/// A command that talks to the remote service and renders tabular output
pub trait OriginTableCommand {
    fn execute(&self, origin: &Origin, options: &ExecutionOptions<'_>, target: RenderTarget)
        -> Outcome;
}

/// Name and help a command registers under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub title: String,
    pub body: Option<String>,
}

impl Descriptor {
    /// Descriptor from a type identifier and help text, with an optional
    /// explicit name taking precedence over the derived one
    pub fn new(ident: &str, help: &str, name: Option<&str>) -> Self {
        let (title, body) = split_help(help);
        Self {
            name: name.map(str::to_string).unwrap_or_else(|| command_name(ident)),
            title,
            body,
        }
    }
}

/// Registration protocol shared by every command variant
pub trait Register: Sized + 'static {
    /// Identifier the command name derives from, e.g. `CmdListProfiles`
    const IDENT: &'static str;

    /// First paragraph is the short help, the rest goes below the options
    const HELP: &'static str;

    /// Add the command's arguments to `node` and build the bound instance
    fn bind(node: &mut ParserNode, ctx: &CliContext) -> Box<dyn Command>;

    /// Name this command registers under unless overridden
    fn name() -> String {
        command_name(Self::IDENT)
    }

    /// @acp:summary "Register under `parent`, returning the new node"
    fn register<'p>(
        parent: &'p mut ParserNode,
        name: Option<&str>,
        ctx: &CliContext,
    ) -> Result<&'p mut ParserNode> {
        let descriptor = Descriptor::new(Self::IDENT, Self::HELP, name);
        let node = parent.subparsers().add_parser(&descriptor.name)?;
        node.describe(&descriptor.title, descriptor.body.as_deref());
        let command = Self::bind(node, ctx);
        node.set_execute(command);
        tracing::debug!(command = %node.path(), "registered command");
        Ok(node)
    }
}

/// Derive a command name from a type identifier.
///
/// Words are split on `_`, `-`, spaces and camel-case humps, lowercased and
/// joined with hyphens. A leading `cmd` word is dropped.
pub fn command_name(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }
        if c.is_uppercase() && !word.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "ListFiles" splits before F; "HTTPServer" splits before S.
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut word));
            }
        }
        word.extend(c.to_lowercase());
    }
    if !word.is_empty() {
        words.push(word);
    }

    if words.len() > 1 && words[0] == "cmd" {
        words.remove(0);
    }
    words.join("-")
}

/// Split help text into a one-line title and an optional body
pub fn split_help(help: &str) -> (String, Option<String>) {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in help.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    let mut paragraphs = paragraphs.into_iter();
    let title = paragraphs.next().map(|p| p.join(" ")).unwrap_or_default();
    let body: Vec<String> = paragraphs.map(|p| p.join("\n")).collect();
    let body = (!body.is_empty()).then(|| body.join("\n\n"));
    (title, body)
}

/// Add `--output-format` with a default that depends on the terminal
pub fn add_output_format(node: &mut ParserNode, ctx: &CliContext) {
    let default = RenderTarget::default_for(ctx.stdout_is_tty());
    node.add_argument(
        Arg::new(OUTPUT_FORMAT)
            .long("output-format")
            .value_name("FORMAT")
            .value_parser(value_parser!(RenderTarget))
            .default_value(default.as_str())
            .help(
                "Output tabular data as a formatted table (pretty), a formatted \
                 table using only ASCII for borders (plain), or one of several \
                 dump formats",
            ),
    );
}

/// Add `--profile-name`, required only when no default profile exists
pub fn add_profile_name(node: &mut ParserNode, ctx: &CliContext) {
    let catalog = ctx.profiles();
    let mut arg = Arg::new(PROFILE_NAME)
        .long("profile-name")
        .value_name("NAME")
        .value_parser(PossibleValuesParser::new(catalog.names().to_vec()))
        .required(catalog.default_name().is_none())
        .help(
            "The name of the remote instance to use. Use `list-profiles` to \
             obtain a list of valid profiles",
        );
    if let Some(default) = catalog.default_name() {
        arg = arg.default_value(default.to_string());
    }
    node.add_argument(arg);
}

fn selected_target(options: &ExecutionOptions<'_>) -> RenderTarget {
    options
        .output_format()
        .unwrap_or_else(|| RenderTarget::default_for(options.console().stdout_is_tty()))
}

fn resolve_origin(options: &ExecutionOptions<'_>) -> Outcome<ExecutionContext> {
    let name = options
        .profile_name()
        .ok_or_else(|| CliError::Command("no profile selected; pass --profile-name".into()))?;
    Ok(options.context().bootstrap(name)?)
}

/// Adapter for [`TableCommand`]s
pub struct Tabular<C>(C);

impl<C: TableCommand + 'static> Tabular<C> {
    pub fn bind(node: &mut ParserNode, ctx: &CliContext, command: C) -> Box<dyn Command> {
        add_output_format(node, ctx);
        Box::new(Tabular(command))
    }
}

impl<C: TableCommand> Command for Tabular<C> {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        self.0.execute(options, selected_target(options))
    }
}

/// Adapter for [`OriginCommand`]s
pub struct WithOrigin<C>(C);

impl<C: OriginCommand + 'static> WithOrigin<C> {
    pub fn bind(node: &mut ParserNode, ctx: &CliContext, command: C) -> Box<dyn Command> {
        add_profile_name(node, ctx);
        Box::new(WithOrigin(command))
    }
}

impl<C: OriginCommand> Command for WithOrigin<C> {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        let context = resolve_origin(options)?;
        self.0.execute(context.origin(), options)
    }
}

/// Adapter for [`OriginTableCommand`]s
pub struct WithOriginTable<C>(C);

impl<C: OriginTableCommand + 'static> WithOriginTable<C> {
    pub fn bind(node: &mut ParserNode, ctx: &CliContext, command: C) -> Box<dyn Command> {
        add_profile_name(node, ctx);
        add_output_format(node, ctx);
        Box::new(WithOriginTable(command))
    }
}

impl<C: OriginTableCommand> Command for WithOriginTable<C> {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        let context = resolve_origin(options)?;
        self.0
            .execute(context.origin(), options, selected_target(options))
    }
}
