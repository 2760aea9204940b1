#![forbid(unsafe_code)]
//! Tether Command Line Interface

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tether::{program_name, CliContext, Console, Driver};

/// Environment variable holding the log filter, e.g. `TETHER_LOG=tether=debug`
const LOG_ENV: &str = "TETHER_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // The dispatch below blocks this thread; the watcher runs on a worker.
    tokio::spawn(tether::interrupt::watch(tokio::signal::ctrl_c(), |code| {
        eprintln!();
        std::process::exit(code.into());
    }));

    let console = Console::system();
    let mut args = std::env::args_os();
    let program = program_name(args.next());
    let code = Driver::new(program, &console)
        .run(args, || CliContext::from_env(console.stdout_is_tty()));

    ExitCode::from(code)
}
