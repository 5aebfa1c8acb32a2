//! Turns an external interrupt into a broadcast cancellation token.
//!
//! Only the sequencer must observe the token; in-flight requests are left to
//! finish and queued jobs are still drained by the workers.

use std::future::Future;
use tokio_util::sync::CancellationToken;

// Import logger macros from crate root
use crate::{log_error, log_warn};

/// Cancel the returned token once `interrupt` resolves.
///
/// Must be called from inside a tokio runtime.
pub fn trap<F>(interrupt: F) -> CancellationToken
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        interrupt.await;
        if !trigger.is_cancelled() {
            log_warn!("Interrupt received, no further jobs will be dispatched");
        }
        trigger.cancel();
    });
    token
}

/// Trap Ctrl-C (SIGINT).
pub fn trap_ctrl_c() -> CancellationToken {
    trap(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
}
