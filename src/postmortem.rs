//! @acp:module "Post-mortem"
//! @acp:summary "Interactive inspection of a crash on a fully interactive terminal"
//! @acp:domain cli
//! @acp:layer diagnostics
//!
//! Debuggers are tried in order; the first one reporting itself available
//! gets the crash. The default list puts the menu-driven [`Inspector`] in
//! front of the [`BasicDump`], which works anywhere a human can press Enter.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::io::{self, BufRead, Write};

use console::Term;
use dialoguer::{theme::ColorfulTheme, Select};

use crate::term::Console;

/// Environment variable selecting the debugger; `basic` skips the inspector
pub const DEBUGGER_ENV: &str = "TETHER_DEBUGGER";

const BANNER_MESSAGE: &str = "Entering post-mortem inspector. Choose an entry to look around.";

/// An uncaught failure and whatever trace came with it
#[derive(Debug)]
pub struct Crash {
    error: anyhow::Error,
    backtrace: Option<Backtrace>,
}

impl Crash {
    /// A failure, traced from here unless the error carries its own trace
    pub fn new(error: anyhow::Error) -> Self {
        Self::with_backtrace(error, Backtrace::force_capture())
    }

    /// A failure with the trace recorded where it was raised
    pub fn with_backtrace(error: anyhow::Error, backtrace: Backtrace) -> Self {
        // anyhow prints its own trace with the error; keep only one.
        let backtrace = (error.backtrace().status() != BacktraceStatus::Captured).then_some(backtrace);
        Self { error, backtrace }
    }

    /// A panic, with the backtrace captured where it unwound from
    pub fn from_panic(message: String, backtrace: Option<Backtrace>) -> Self {
        Self {
            error: anyhow::anyhow!(message),
            backtrace,
        }
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// The error followed by each cause, outermost first
    pub fn causes(&self) -> Vec<String> {
        self.error.chain().map(|cause| cause.to_string()).collect()
    }

    /// Best available backtrace, if one was captured
    pub fn backtrace(&self) -> Option<String> {
        let captured = |bt: &Backtrace| {
            (bt.status() == BacktraceStatus::Captured).then(|| bt.to_string())
        };
        self.backtrace
            .as_ref()
            .and_then(captured)
            .or_else(|| captured(self.error.backtrace()))
    }

    /// Everything known about the crash, as printed when it is not inspected
    pub fn trace(&self) -> String {
        let mut out = format!("Error: {:?}", self.error);
        let recorded = self
            .backtrace
            .as_ref()
            .filter(|bt| bt.status() == BacktraceStatus::Captured);
        if let Some(backtrace) = recorded {
            out.push_str("\n\nStack backtrace:\n");
            out.push_str(&backtrace.to_string());
        }
        out
    }
}

/// A post-mortem strategy
pub trait Debugger {
    fn name(&self) -> &'static str;

    /// Whether this debugger can run in the current environment
    fn available(&self, console: &Console) -> bool;

    fn post_mortem(&self, crash: &Crash, console: &Console) -> io::Result<()>;
}

/// Menu-driven inspector on the terminal
#[derive(Debug, Default)]
pub struct Inspector;

impl Debugger for Inspector {
    fn name(&self) -> &'static str {
        "inspector"
    }

    fn available(&self, _console: &Console) -> bool {
        let basic = std::env::var(DEBUGGER_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("basic"));
        !basic && Term::stderr().is_term()
    }

    fn post_mortem(&self, crash: &Crash, console: &Console) -> io::Result<()> {
        let items = ["Error and causes", "Backtrace", "Leave"];
        let theme = ColorfulTheme::default();
        loop {
            let choice = Select::with_theme(&theme)
                .with_prompt("Inspect")
                .items(&items)
                .default(0)
                .interact_on_opt(&Term::stderr())
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

            let mut err = console.err();
            match choice {
                Some(0) => {
                    for (depth, cause) in crash.causes().iter().enumerate() {
                        writeln!(err, "{:>3}: {}", depth, cause)?;
                    }
                }
                Some(1) => match crash.backtrace() {
                    Some(backtrace) => writeln!(err, "{}", backtrace)?,
                    None => writeln!(
                        err,
                        "No backtrace captured. Set RUST_BACKTRACE=1 to record one."
                    )?,
                },
                _ => return Ok(()),
            }
        }
    }
}

/// Dump everything and wait for Enter
#[derive(Debug, Default)]
pub struct BasicDump;

impl Debugger for BasicDump {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn available(&self, _console: &Console) -> bool {
        true
    }

    fn post_mortem(&self, crash: &Crash, console: &Console) -> io::Result<()> {
        {
            let mut err = console.err();
            writeln!(err, "{}", crash.trace())?;
            writeln!(err, "\nPress Enter to exit.")?;
            err.flush()?;
        }
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// Inspector first, basic dump as fallback
pub fn default_debuggers() -> Vec<Box<dyn Debugger>> {
    vec![Box::new(Inspector), Box::new(BasicDump)]
}

/// Red `= CRASH! =` rule, the message, then a plain red rule
pub fn banner(console: &Console) -> String {
    let width = BANNER_MESSAGE.len();
    let top = format!("{:=^width$}", " CRASH! ", width = width);
    let bottom = "=".repeat(width);
    format!(
        "\n{}\n{}\n{}\n",
        console.colorized(top).red(),
        BANNER_MESSAGE,
        console.colorized(bottom).red()
    )
}

/// @acp:summary "Hand the crash to the first available debugger"
///
/// Returns the name of the debugger used, or `None` if none was available.
pub fn post_mortem(
    crash: &Crash,
    console: &Console,
    debuggers: &[Box<dyn Debugger>],
) -> Option<&'static str> {
    let debugger = debuggers.iter().find(|d| d.available(console))?;
    {
        let mut err = console.err();
        let _ = writeln!(err, "{}", banner(console));
    }
    tracing::debug!(debugger = debugger.name(), "entering post-mortem");
    if let Err(e) = debugger.post_mortem(crash, console) {
        tracing::warn!(debugger = debugger.name(), error = %e, "post-mortem session failed");
    }
    Some(debugger.name())
}
