//! Ctrl+C handling.
//!
//! The handler only raises a shared `AtomicBool`. The walker and the
//! classifier poll it between files and the mover between pairs, so a move
//! that has started always completes or is undone before the process exits.
//!
//! ```rust,no_run
//! use dupequarantine::signal::install_handler;
//!
//! let shutdown = install_handler().expect("Failed to install signal handler");
//! // hand `shutdown` to WalkerConfig, ClassifierConfig and MoveConfig
//! # let _ = shutdown;
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Install a Ctrl+C handler and return the flag it raises.
///
/// The OS handler is registered once per process. Later calls hand back the
/// same flag, lowered again, so `run_app` can be invoked repeatedly from
/// tests.
///
/// # Errors
///
/// Returns [`SignalError`] if the OS refuses the handler on the first call.
pub fn install_handler() -> Result<Arc<AtomicBool>, SignalError> {
    let mut first_call = false;
    let flag = SHUTDOWN.get_or_init(|| {
        first_call = true;
        Arc::new(AtomicBool::new(false))
    });
    flag.store(false, Ordering::SeqCst);

    if first_call {
        let raised = Arc::clone(flag);
        let installed = ctrlc::set_handler(move || {
            raised.store(true, Ordering::SeqCst);
            let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current file...");
            let _ = std::io::stderr().flush();
            log::info!("Shutdown signal received");
        });
        match installed {
            Ok(()) => {}
            Err(ctrlc::Error::MultipleHandlers) => {
                log::debug!("Ctrl+C handler already registered elsewhere");
            }
            Err(e) => return Err(SignalError::InstallFailed(e)),
        }
    }

    Ok(Arc::clone(flag))
}
