//! @acp:module "Profile Commands"
//! @acp:summary "Manage the locally stored profiles"
//! @acp:domain cli
//! @acp:layer handler

use std::io::Write;

use clap::{Arg, ArgAction};

use crate::command::{Command, Register, TableCommand, Tabular};
use crate::context::CliContext;
use crate::error::{CliError, Outcome};
use crate::options::ExecutionOptions;
use crate::parser::ParserNode;
use crate::profiles::Profile;
use crate::session::Session;
use crate::tabular::{RenderTarget, Table};

/// Environment variable `add-profile` reads the API key from
pub const API_KEY_ENV: &str = "TETHER_API_KEY";

fn profile_name_arg(help: &'static str) -> Arg {
    Arg::new("name").value_name("NAME").required(true).help(help)
}

fn required<'o>(options: &'o ExecutionOptions<'_>, id: &str) -> Outcome<&'o str> {
    Ok(options
        .string(id)
        .ok_or_else(|| CliError::Command(format!("missing argument: {}", id)))?)
}

/// `list-profiles`, also reachable as `list profiles`
#[derive(Debug, Default)]
pub struct CmdListProfiles;

impl Register for CmdListProfiles {
    const IDENT: &'static str = "CmdListProfiles";
    const HELP: &'static str = "
        List the configured profiles.

        The default profile is marked. It is used by every command that talks
        to a remote service unless --profile-name says otherwise.
    ";

    fn bind(node: &mut ParserNode, ctx: &CliContext) -> Box<dyn Command> {
        Tabular::bind(node, ctx, CmdListProfiles)
    }
}

impl TableCommand for CmdListProfiles {
    fn execute(&self, options: &ExecutionOptions<'_>, target: RenderTarget) -> Outcome {
        let store = options.context().store().open()?;
        let default = store.default_profile().map(|p| p.name.clone());

        let mut table = Table::new(&[("name", "Profile"), ("url", "URL"), ("default", "Default")]);
        for profile in store.iter() {
            let marker = if default.as_deref() == Some(profile.name.as_str()) {
                "yes"
            } else {
                ""
            };
            table.push_row([profile.name.as_str(), profile.url.as_str(), marker]);
        }

        let rendered = table.render(target)?;
        let mut out = options.console().out();
        write!(out, "{}", rendered)?;
        out.flush()?;
        Ok(())
    }
}

/// `add-profile NAME URL`
#[derive(Debug, Default)]
pub struct CmdAddProfile;

impl Register for CmdAddProfile {
    const IDENT: &'static str = "CmdAddProfile";
    const HELP: &'static str = "
        Save a profile for a remote service.

        The API key has the form consumer_key:token_key:token_secret. Leave it
        out for anonymous access. While no default is set, the profile saved
        becomes the default.
    ";

    fn bind(node: &mut ParserNode, _ctx: &CliContext) -> Box<dyn Command> {
        node.add_argument(profile_name_arg("Name to save the profile under"))
            .add_argument(
                Arg::new("url")
                    .value_name("URL")
                    .required(true)
                    .help("URL of the remote service, e.g. http://example.com:5240/MAAS/"),
            )
            .add_argument(
                Arg::new("api_key")
                    .long("api-key")
                    .value_name("KEY")
                    .env(API_KEY_ENV)
                    .hide_env_values(true)
                    .help("API key for the service; omit for anonymous access"),
            )
            .add_argument(
                Arg::new("make_default")
                    .long("default")
                    .action(ArgAction::SetTrue)
                    .help("Make this the default profile"),
            )
            .add_argument(
                Arg::new("replace")
                    .long("replace")
                    .action(ArgAction::SetTrue)
                    .help("Overwrite an existing profile of the same name"),
            );
        Box::new(CmdAddProfile)
    }
}

impl Command for CmdAddProfile {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        let name = required(options, "name")?;
        let url = required(options, "url")?;
        let api_key = options.string("api_key").unwrap_or_default();

        let profile = Profile::new(name, url, api_key);
        let session = Session::from_profile(&profile)?;

        let mut store = options.context().store().open()?;
        let make_default = options.flag("make_default") || store.default_profile().is_none();
        store.insert(profile, options.flag("replace"))?;
        if make_default {
            store.set_default(Some(name))?;
        }
        store.save()?;

        let console = options.console();
        let mut out = console.out();
        writeln!(
            out,
            "{} Saved profile {} ({})",
            console.colorized("✓").green(),
            console.colorized(name).cyan(),
            session.api_url()
        )?;
        if make_default {
            writeln!(out, "  {}", console.colorized("default profile").dim())?;
        }
        Ok(())
    }
}

/// `remove-profile NAME`
#[derive(Debug, Default)]
pub struct CmdRemoveProfile;

impl Register for CmdRemoveProfile {
    const IDENT: &'static str = "CmdRemoveProfile";
    const HELP: &'static str = "Delete a saved profile.";

    fn bind(node: &mut ParserNode, _ctx: &CliContext) -> Box<dyn Command> {
        node.add_argument(profile_name_arg("Name of the profile to delete"));
        Box::new(CmdRemoveProfile)
    }
}

impl Command for CmdRemoveProfile {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        let name = required(options, "name")?;
        let mut store = options.context().store().open()?;
        if store.get(name).is_none() {
            return Err(options.error(&format!("no such profile: {}", name)));
        }
        store.remove(name)?;
        store.save()?;

        let console = options.console();
        let mut out = console.out();
        writeln!(
            out,
            "{} Removed profile {}",
            console.colorized("✓").green(),
            console.colorized(name).cyan()
        )?;
        if store.default_profile().is_none() && !store.is_empty() {
            writeln!(
                out,
                "{} No default profile; pick one with {}",
                console.colorized("⚠").yellow(),
                console.colorized("set-default-profile").cyan()
            )?;
        }
        Ok(())
    }
}

/// `set-default-profile NAME`
#[derive(Debug, Default)]
pub struct CmdSetDefaultProfile;

impl Register for CmdSetDefaultProfile {
    const IDENT: &'static str = "CmdSetDefaultProfile";
    const HELP: &'static str = "Choose the profile used when --profile-name is not given.";

    fn bind(node: &mut ParserNode, _ctx: &CliContext) -> Box<dyn Command> {
        node.add_argument(profile_name_arg("Name of the profile to make the default"));
        Box::new(CmdSetDefaultProfile)
    }
}

impl Command for CmdSetDefaultProfile {
    fn execute(&self, options: &ExecutionOptions<'_>) -> Outcome {
        let name = required(options, "name")?;
        let mut store = options.context().store().open()?;
        if store.get(name).is_none() {
            return Err(options.error(&format!("no such profile: {}", name)));
        }
        store.set_default(Some(name))?;
        store.save()?;

        let console = options.console();
        writeln!(
            console.out(),
            "{} Default profile is now {}",
            console.colorized("✓").green(),
            console.colorized(name).cyan()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use tempfile::TempDir;

    use super::*;
    use crate::profiles::{FileStore, OpenStore};
    use crate::session::DefaultConnector;
    use crate::term::Console;

    fn run(store: &FileStore, argv: &[&str]) -> (u8, String) {
        let ctx = CliContext::load(Rc::new(store.clone()), Rc::new(DefaultConnector), false).unwrap();
        let mut root = ParserNode::root("tether");
        root.subparsers().add_parser("list").unwrap();
        crate::commands::register(&mut root, &ctx).unwrap();

        let (console, out, err) = Console::captured(false, false);
        let matches = root.build().try_get_matches_from(argv).unwrap();
        let options = ExecutionOptions::from_matches(matches, &ctx, &console);
        let node = *root.resolve(options.path()).last().unwrap();
        let status = match node.execute().unwrap().execute(&options.bound_to(node)) {
            Ok(()) => 0,
            Err(halt) => halt.status(),
        };
        (status, out.contents() + &err.contents())
    }

    #[test]
    fn test_first_profile_becomes_default() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));

        let (status, out) = run(&store, &["tether", "add-profile", "lab", "http://lab.example.com/MAAS/"]);
        assert_eq!(status, 0);
        assert!(out.contains("Saved profile lab"));
        assert!(out.contains("http://lab.example.com/MAAS/api/2.0/"));

        run(&store, &["tether", "add-profile", "prod", "https://prod.example.com/MAAS"]);
        let saved = store.open().unwrap();
        assert_eq!(saved.names(), vec!["lab", "prod"]);
        assert_eq!(saved.default_profile().map(|p| p.name.as_str()), Some("lab"));
    }

    #[test]
    fn test_add_profile_rejects_bad_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));
        let (status, _) = run(
            &store,
            &["tether", "add-profile", "lab", "http://lab/", "--api-key", "only:two"],
        );
        assert_eq!(status, 1);
        assert!(store.open().unwrap().is_empty());
    }

    #[test]
    fn test_set_default_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));
        run(&store, &["tether", "add-profile", "a", "http://a/"]);
        run(&store, &["tether", "add-profile", "b", "http://b/"]);

        let (status, _) = run(&store, &["tether", "set-default-profile", "b"]);
        assert_eq!(status, 0);
        assert_eq!(store.open().unwrap().default_profile().map(|p| p.name.clone()), Some("b".into()));

        let (status, out) = run(&store, &["tether", "remove-profile", "b"]);
        assert_eq!(status, 0);
        assert!(out.contains("No default profile"));
        assert_eq!(store.open().unwrap().names(), vec!["a"]);
    }

    #[test]
    fn test_new_profile_becomes_default_while_none_is_set() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));
        run(&store, &["tether", "add-profile", "a", "http://a/"]);
        run(&store, &["tether", "add-profile", "b", "http://b/"]);
        run(&store, &["tether", "remove-profile", "a"]);
        assert!(store.open().unwrap().default_profile().is_none());

        let (status, out) = run(&store, &["tether", "add-profile", "c", "http://c/"]);
        assert_eq!(status, 0);
        assert!(out.contains("default profile"));
        assert_eq!(store.open().unwrap().default_profile().map(|p| p.name.clone()), Some("c".into()));
    }

    #[test]
    fn test_unknown_profile_is_a_usage_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));
        run(&store, &["tether", "add-profile", "a", "http://a/"]);

        let (status, out) = run(&store, &["tether", "remove-profile", "ghost"]);
        assert_eq!(status, 2);
        assert!(out.contains("Usage: tether remove-profile"));
        assert!(out.contains("Error: no such profile: ghost"));

        let (status, out) = run(&store, &["tether", "set-default-profile", "ghost"]);
        assert_eq!(status, 2);
        assert!(out.contains("Usage: tether set-default-profile"));
        assert_eq!(store.open().unwrap().names(), vec!["a"]);
    }

    #[test]
    fn test_list_profiles_plain() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("profiles.json"));
        run(&store, &["tether", "add-profile", "lab", "http://lab/"]);

        let (status, out) = run(&store, &["tether", "list", "profiles", "--output-format", "json"]);
        assert_eq!(status, 0);
        let rows: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(rows[0]["name"], "lab");
        assert_eq!(rows[0]["default"], "yes");
    }
}
