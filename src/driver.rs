//! @acp:module "Driver"
//! @acp:summary "Builds the command tree, dispatches one invocation and escalates failures"
//! @acp:domain cli
//! @acp:layer entry
//!
//! Every invocation ends in exactly one of:
//!
//! - success, exit 0;
//! - a deliberate exit, whose status is passed through untouched;
//! - an interrupt, exit 1;
//! - a failure. A failure before parsing finished, or with `--debug`, is
//!   shown in full: on an interactive terminal through the post-mortem
//!   debugger (exit 1), otherwise as a trace dump (exit 1). Any other failure
//!   gets a terse colorized message through the parser's error path (exit 2).

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction};

use crate::commands;
use crate::completion;
use crate::context::CliContext;
use crate::error::{Halt, Outcome, Result};
use crate::options::{ExecutionOptions, DEBUG};
use crate::parser::ParserNode;
use crate::postmortem::{self, Crash, Debugger};
use crate::term::Console;

/// Verbs every tree carries; business modules register below them
pub const VERBS: [(&str, &str); 4] = [
    ("acquire", "Acquire machines or other resources."),
    ("launch", "Launch machines or other resources."),
    ("list", "List machines, files, tags, and other resources."),
    ("release", "Release machines or other resources."),
];

/// @acp:summary "Create and populate the command tree"
pub fn prepare_parser(program: &str, ctx: &CliContext) -> Result<ParserNode> {
    let mut root = ParserNode::root(program);
    root.describe("Interact with a remote resource-management service.", None)
        .configure(|c| {
            c.version(crate::VERSION).after_help(format!(
                "Profiles are read from ${} or the user configuration directory.",
                crate::profiles::PROFILES_ENV
            ))
        });

    for (verb, help) in VERBS {
        root.subparsers().add_parser(verb)?.describe(help, None);
    }

    commands::register(&mut root, ctx)?;

    root.add_argument(
        Arg::new(DEBUG)
            .long("debug")
            .action(ArgAction::SetTrue)
            .global(true)
            .hide(true),
    );

    Ok(root)
}

/// How far an invocation got before something went wrong
#[derive(Default)]
struct Invocation {
    context: Option<CliContext>,
    tree: Option<ParserNode>,
    parsed: Option<Parsed>,
}

struct Parsed {
    path: Vec<String>,
    debug: bool,
}

/// Runs one invocation against a console
pub struct Driver<'c> {
    program: String,
    console: &'c Console,
    debuggers: Vec<Box<dyn Debugger>>,
}

impl<'c> Driver<'c> {
    pub fn new(program: impl Into<String>, console: &'c Console) -> Self {
        Self {
            program: program.into(),
            console,
            debuggers: postmortem::default_debuggers(),
        }
    }

    /// Replace the post-mortem strategies, tried in the given order
    pub fn with_debuggers(mut self, debuggers: Vec<Box<dyn Debugger>>) -> Self {
        self.debuggers = debuggers;
        self
    }

    /// @acp:summary "Run one invocation and return the process exit status"
    ///
    /// `args` excludes the program name. `load` is the explicit
    /// initialization step producing the context; a failure there counts as
    /// a failure before parsing.
    pub fn run<I, T, L>(&self, args: I, load: L) -> u8
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
        L: FnOnce() -> Result<CliContext>,
    {
        let mut argv: Vec<OsString> = vec![OsString::from(&self.program)];
        argv.extend(args.into_iter().map(Into::into));

        let mut invocation = Invocation::default();
        let result = catch_panics(|| self.dispatch(&mut invocation, argv, load));

        match result {
            Ok(Ok(())) => 0,
            Ok(Err(Halt::Exit(code))) => code,
            Ok(Err(halt @ Halt::Interrupted)) => {
                tracing::info!("interrupted by user");
                halt.status()
            }
            Ok(Err(Halt::Failure { error, backtrace })) => {
                self.escalate(&invocation, Crash::with_backtrace(error, backtrace))
            }
            Err(crash) => self.escalate(&invocation, crash),
        }
    }

    fn dispatch<L>(&self, invocation: &mut Invocation, argv: Vec<OsString>, load: L) -> Outcome
    where
        L: FnOnce() -> Result<CliContext>,
    {
        let context = invocation.context.insert(load()?);
        let tree = invocation.tree.insert(prepare_parser(&self.program, context)?);

        if completion::complete(tree, &argv)? {
            return Err(Halt::Exit(0));
        }

        let matches = match tree.build().try_get_matches_from(&argv) {
            Ok(matches) => matches,
            Err(error) => return Err(self.parse_error(tree, &argv, error)),
        };

        let options = ExecutionOptions::from_matches(matches, context, self.console);
        invocation.parsed = Some(Parsed {
            path: options.path().to_vec(),
            debug: options.debug(),
        });

        let chain = tree.resolve(options.path());
        let bound = chain
            .iter()
            .rev()
            .find_map(|node| node.execute().map(|command| (*node, command)));
        let Some((node, command)) = bound else {
            let node = chain.last().copied().unwrap_or(&*tree);
            return Err(node.error(self.console, "Argument missing."));
        };

        tracing::debug!(command = %node.path(), "dispatching");
        command.execute(&options.bound_to(node))
    }

    fn parse_error(&self, tree: &ParserNode, argv: &[OsString], error: clap::Error) -> Halt {
        match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let mut out = self.console.out();
                let _ = write!(out, "{}", error.render());
                let _ = out.flush();
                Halt::Exit(0)
            }
            _ => {
                let words: Vec<String> = argv
                    .iter()
                    .skip(1)
                    .map(|w| w.to_string_lossy().into_owned())
                    .collect();
                tree.resolve_words(&words)
                    .error(self.console, &clap_message(&error))
            }
        }
    }

    fn escalate(&self, invocation: &Invocation, crash: Crash) -> u8 {
        let verbose = invocation.parsed.as_ref().map_or(true, |p| p.debug);
        tracing::debug!(verbose, error = %crash.error(), "uncaught failure");

        if verbose {
            if self.console.is_interactive()
                && postmortem::post_mortem(&crash, self.console, &self.debuggers).is_some()
            {
                return 1;
            }
            let mut err = self.console.err();
            let _ = writeln!(err, "{}", crash.trace());
            let _ = err.flush();
            return 1;
        }

        // Parsed, so both are present.
        let node = match (&invocation.tree, &invocation.parsed) {
            (Some(tree), Some(parsed)) => tree.resolve(&parsed.path).last().copied(),
            _ => None,
        };
        let message = format!("{:#}", crash.error());
        match node {
            Some(node) => node.error(self.console, &message).status(),
            None => 2,
        }
    }
}

/// Program name for usage lines, taken from `argv[0]`
pub fn program_name(arg0: Option<OsString>) -> String {
    arg0.as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "tether".to_string())
}

/// Text of a clap error without its `error:` prefix and usage trailer
fn clap_message(error: &clap::Error) -> String {
    let rendered = error.render().to_string();
    let body = rendered.split("\nUsage:").next().unwrap_or(&rendered);
    let body = body.trim();
    body.strip_prefix("error:").unwrap_or(body).trim().to_string()
}

thread_local! {
    static PANIC_CAPTURE: RefCell<Option<Option<Crash>>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Run `f`, turning a panic on this thread into a [`Crash`].
///
/// The hook only swallows panics while a capture is armed on the current
/// thread; everything else still goes to the previously installed hook.
fn catch_panics<F, R>(f: F) -> std::result::Result<R, Crash>
where
    F: FnOnce() -> R,
{
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let armed = PANIC_CAPTURE.with(|slot| {
                let mut slot = slot.borrow_mut();
                match slot.as_mut() {
                    Some(crash) => {
                        let location = info
                            .location()
                            .map(|l| format!(" at {}:{}", l.file(), l.line()))
                            .unwrap_or_default();
                        let message = format!("panicked{}: {}", location, payload_text(info.payload()));
                        *crash = Some(Crash::from_panic(message, Some(Backtrace::force_capture())));
                        true
                    }
                    None => false,
                }
            });
            if !armed {
                previous(info);
            }
        }));
    });

    PANIC_CAPTURE.with(|slot| *slot.borrow_mut() = Some(None));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    let captured = PANIC_CAPTURE.with(|slot| slot.borrow_mut().take()).flatten();

    result.map_err(|payload| {
        captured.unwrap_or_else(|| Crash::from_panic(format!("panicked: {}", payload_text(&*payload)), None))
    })
}

fn payload_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
