#![forbid(unsafe_code)]

//! @acp:module "Tether Library"
//! @acp:summary "Command-dispatch core for a remote resource-management CLI"
//! @acp:domain cli
//! @acp:layer api
//! @acp:stability experimental
//!
//! # Tether
//!
//! A hierarchical command tree built at runtime, with commands that resolve
//! a named profile into a session before they run.
//!
//! ## Features
//!
//! - **Runtime tree**: verbs and commands register under any node
//! - **Profiles**: `--profile-name` choices and defaults come from the store
//! - **Output targets**: pretty or plain tables, or JSON/YAML dumps
//! - **Escalation**: terse errors by default, full traces with `--debug`
//!
//! ## Example
//!
//! ```rust,no_run
//! use tether::{CliContext, Console, Driver};
//!
//! let console = Console::system();
//! let code = Driver::new("tether", &console)
//!     .run(["list-profiles"], || CliContext::from_env(console.stdout_is_tty()));
//! std::process::exit(code.into());
//! ```

pub mod command;
pub mod commands;
pub mod completion;
pub mod context;
pub mod driver;
pub mod error;
pub mod interrupt;
pub mod options;
pub mod parser;
pub mod postmortem;
pub mod profiles;
pub mod session;
pub mod tabular;
pub mod term;

// Re-exports
pub use command::{
    command_name, Command, Descriptor, OriginCommand, OriginTableCommand, Register, TableCommand,
};
pub use context::{CliContext, ExecutionContext};
pub use driver::{prepare_parser, program_name, Driver};
pub use error::{CliError, Halt, Outcome, Result};
pub use options::ExecutionOptions;
pub use parser::{ParserNode, Subparsers};
pub use postmortem::{Crash, Debugger};
pub use profiles::{FileStore, MemoryStore, OpenStore, Profile, ProfileStore};
pub use session::{Connector, DefaultConnector, Origin, Session};
pub use tabular::{RenderTarget, Table};
pub use term::Console;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
