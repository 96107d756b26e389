//! Session input: typed lines and Ctrl-C

use std::io::BufRead;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lines from stdin plus a shutdown token tripped by Ctrl-C
pub struct SessionInput {
    lines: mpsc::Receiver<String>,
    shutdown: CancellationToken,
}

impl SessionInput {
    /// Start reading stdin and listening for Ctrl-C.
    ///
    /// Stdin is read on a plain thread: a blocking read inside the runtime
    /// would hold up runtime shutdown.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("received Ctrl-C");
                token.cancel();
            }
        });

        Self {
            lines: rx,
            shutdown,
        }
    }

    /// Build from an existing channel, without touching stdin or signals
    pub fn from_channel(lines: mpsc::Receiver<String>, shutdown: CancellationToken) -> Self {
        Self { lines, shutdown }
    }

    /// Next typed line; `None` once stdin is closed
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Token cancelled on Ctrl-C
    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
