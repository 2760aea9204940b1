//! @acp:module "Interrupt"
//! @acp:summary "Keyboard interrupt watcher run beside the blocking dispatch"
//! @acp:domain cli
//! @acp:layer entry

use std::future::Future;
use std::io;

use crate::error::Halt;

/// Wait for `signal`, then hand the interrupt status to `exit`.
///
/// If the signal cannot be listened for, `exit` is never called and the
/// invocation runs to completion on its own.
pub async fn watch<S, E>(signal: S, exit: E)
where
    S: Future<Output = io::Result<()>>,
    E: FnOnce(u8),
{
    match signal.await {
        Ok(()) => {
            tracing::info!("interrupted by user");
            exit(Halt::Interrupted.status());
        }
        Err(error) => tracing::warn!(%error, "cannot listen for interrupts"),
    }
}
