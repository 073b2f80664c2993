use std::io::BufRead;
use std::thread;

use anyhow::{bail, Context, Result};
use log::{error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{ScanLoop, ScanReport};

/// Owns the running scanner task and its cancel token.
pub struct ScannerController {
    handle: Option<JoinHandle<ScanReport>>,
    cancel_token: CancellationToken,
}

impl ScannerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn start(&mut self, scan_loop: ScanLoop) -> Result<()> {
        if self.handle.is_some() {
            bail!("scanner already running");
        }

        let token = self.cancel_token.clone();
        self.handle = Some(tokio::spawn(scan_loop.run(token)));
        Ok(())
    }

    /// Stops the scanner on Ctrl+C or when `q` is entered on stdin.
    pub fn stop_on_user_exit(&self) -> Result<()> {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Ctrl+C received, stopping scanner"),
                        Err(err) => error!("failed to listen for Ctrl+C: {err}"),
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });

        // Blocking stdin lives on a plain thread so it never holds up runtime
        // shutdown.
        let token = self.cancel_token.clone();
        thread::Builder::new()
            .name("scanner-quit-key".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                            info!("Quit key received, stopping scanner");
                            token.cancel();
                            break;
                        }
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
            })
            .context("failed to spawn quit key listener")?;

        info!("Press 'q' then Enter, or Ctrl+C, to stop");
        Ok(())
    }

    /// Asks the scanner to stop and waits for its final report.
    pub async fn stop(&mut self) -> Result<ScanReport> {
        self.cancel_token.cancel();
        self.wait().await
    }

    /// Waits for the scanner to stop on its own.
    pub async fn wait(&mut self) -> Result<ScanReport> {
        let Some(handle) = self.handle.take() else {
            bail!("scanner is not running");
        };
        handle.await.context("scanner task failed to join")
    }
}

impl Default for ScannerController {
    fn default() -> Self {
        Self::new()
    }
}
