//! @acp:module "Terminal"
//! @acp:summary "Output streams and terminal detection shared by the driver and commands"
//! @acp:domain cli
//! @acp:layer io

use std::cell::{RefCell, RefMut};
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;

use console::{style, StyledObject, Term};

/// Where output goes and what kind of terminal is attached.
///
/// The driver owns exactly one console per invocation. Tests build one with
/// [`Console::captured`] to inspect what was written and to pretend to be
/// (or not be) an interactive terminal.
pub struct Console {
    stdin_tty: bool,
    stdout_tty: bool,
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
}

impl Console {
    /// Console bound to the process streams
    pub fn system() -> Self {
        Self {
            stdin_tty: io::stdin().is_terminal(),
            stdout_tty: Term::stdout().is_term(),
            out: RefCell::new(Box::new(io::stdout())),
            err: RefCell::new(Box::new(io::stderr())),
        }
    }

    /// Console writing into in-memory buffers
    pub fn captured(stdin_tty: bool, stdout_tty: bool) -> (Self, Capture, Capture) {
        let out = Capture::default();
        let err = Capture::default();
        let console = Self {
            stdin_tty,
            stdout_tty,
            out: RefCell::new(Box::new(out.clone())),
            err: RefCell::new(Box::new(err.clone())),
        };
        (console, out, err)
    }

    pub fn stdin_is_tty(&self) -> bool {
        self.stdin_tty
    }

    pub fn stdout_is_tty(&self) -> bool {
        self.stdout_tty
    }

    /// Both ends attached to a terminal, so a human can answer prompts
    pub fn is_interactive(&self) -> bool {
        self.stdin_tty && self.stdout_tty
    }

    pub fn out(&self) -> RefMut<'_, Box<dyn Write>> {
        self.out.borrow_mut()
    }

    pub fn err(&self) -> RefMut<'_, Box<dyn Write>> {
        self.err.borrow_mut()
    }

    /// Style `text`, dropping escape codes when stdout is not a terminal
    pub fn colorized<D>(&self, text: D) -> StyledObject<D> {
        style(text).force_styling(self.stdout_tty)
    }
}

/// Shared in-memory sink handed out by [`Console::captured`]
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
