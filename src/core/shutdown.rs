//! Termination-signal wiring for embedding applications
//!
//! The consumer engine never registers process-global signal handlers on its
//! own. An application that wants SIGINT/SIGTERM to trigger a graceful
//! shutdown opts in by calling [`spawn_signal_listener`] with its consumer.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::queue::consumer::QueueConsumer;

/// Spawn a task that waits for a termination signal and then runs the
/// consumer's [`shutdown`](QueueConsumer::shutdown) sequence (stop, drain,
/// process exit).
///
/// A second signal while the drain is still in progress forces an immediate
/// exit with status 130, so a stalled handler cannot hold the process hostage
/// for the full drain timeout.
pub fn spawn_signal_listener(consumer: Arc<QueueConsumer>) -> JoinHandle<()> {
    #[cfg(unix)]
    unsafe {
        // Restore default SIGPIPE behaviour; tokio's signal driver leaves it ignored
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    tokio::spawn(async move {
        termination_signal().await;
        log::info!("termination signal received; shutting down");

        tokio::spawn(async {
            termination_signal().await;
            log::warn!("second termination signal received; exiting immediately");
            std::process::exit(130);
        });

        consumer.shutdown().await;
    })
}

/// Resolve when the process receives SIGINT or SIGTERM (Ctrl-C only on
/// non-unix platforms).
async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(err) => {
                log::warn!("could not install SIGTERM handler: {err}");
                None
            }
        };

        let terminate_recv = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate_recv => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
