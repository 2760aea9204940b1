//! @acp:module "Origin Commands"
//! @acp:summary "Commands that resolve a profile into a session before running"
//! @acp:domain cli
//! @acp:layer handler

use std::io::Write;

use crate::command::{Command, OriginCommand, OriginTableCommand, Register, WithOrigin, WithOriginTable};
use crate::context::CliContext;
use crate::error::Outcome;
use crate::options::ExecutionOptions;
use crate::parser::ParserNode;
use crate::session::Origin;
use crate::tabular::{RenderTarget, Table};

/// `whoami`
#[derive(Debug, Default)]
pub struct CmdWhoami;

impl Register for CmdWhoami {
    const IDENT: &'static str = "CmdWhoami";
    const HELP: &'static str = "Show which profile and endpoint commands will use.";

    fn bind(node: &mut ParserNode, ctx: &CliContext) -> Box<dyn Command> {
        WithOrigin::bind(node, ctx, CmdWhoami)
    }
}

impl OriginCommand for CmdWhoami {
    fn execute(&self, origin: &Origin, options: &ExecutionOptions<'_>) -> Outcome {
        let session = origin.session();
        let console = options.console();
        let auth = match session.credentials() {
            Some(credentials) => format!("consumer key {}", credentials.consumer_key),
            None => "anonymous".to_string(),
        };

        let mut out = console.out();
        writeln!(
            out,
            "{} {}",
            console.colorized(&session.profile().name).bold(),
            session.api_url()
        )?;
        writeln!(out, "  {}", console.colorized(auth).dim())?;
        Ok(())
    }
}

/// `show-profile`
#[derive(Debug, Default)]
pub struct CmdShowProfile;

impl Register for CmdShowProfile {
    const IDENT: &'static str = "CmdShowProfile";
    const HELP: &'static str = "
        Show the details of a profile.

        Reads the profile selected with --profile-name, or the default one.
        The token secret is never shown.
    ";

    fn bind(node: &mut ParserNode, ctx: &CliContext) -> Box<dyn Command> {
        WithOriginTable::bind(node, ctx, CmdShowProfile)
    }
}

impl OriginTableCommand for CmdShowProfile {
    fn execute(
        &self,
        origin: &Origin,
        options: &ExecutionOptions<'_>,
        target: RenderTarget,
    ) -> Outcome {
        let session = origin.session();
        let profile = session.profile();
        let mut table = Table::new(&[("key", "Key"), ("value", "Value")]);
        table.push_row(["name", profile.name.as_str()]);
        table.push_row(["url", profile.url.as_str()]);
        table.push_row(["api", session.api_url()]);
        match session.credentials() {
            Some(credentials) => {
                table.push_row(["consumer_key", credentials.consumer_key.as_str()]);
                table.push_row(["token_key", credentials.token_key.as_str()]);
            }
            None => table.push_row(["auth", "anonymous"]),
        }

        let rendered = table.render(target)?;
        let mut out = options.console().out();
        write!(out, "{}", rendered)?;
        Ok(())
    }
}
