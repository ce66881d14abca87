use super::protocol::{ServeRequest, parse_response, resolve_binary};
use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderOptions};
use crate::traits::RenderBackend;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

struct ServeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ServeProcess {
    fn spawn(binary: &str) -> Result<Self, DispatchError> {
        let mut child = Command::new(binary)
            .arg("serve")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                DispatchError::BackendUnavailable(format!("failed to spawn '{binary} serve': {e}"))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DispatchError::BackendUnavailable("failed to open backend stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DispatchError::BackendUnavailable("failed to open backend stdout".to_string())
        })?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn round_trip(&mut self, line: &str) -> std::io::Result<String> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout.read_line(&mut response)? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "backend closed its output",
            ));
        }
        Ok(response)
    }

    fn shutdown(mut self) {
        // Already-exited children make kill fail; reaping still matters.
        let _ = self.child.kill();
        if let Err(e) = self.child.wait() {
            warn!("Failed to reap mermkit serve process: {}", e);
        }
    }
}

/// Long-lived `mermkit serve` child speaking JSON lines over stdio.
pub struct ServeBackend {
    binary: String,
    process: Mutex<Option<ServeProcess>>,
}

impl ServeBackend {
    pub fn new(binary: Option<&str>) -> Self {
        Self {
            binary: resolve_binary(binary),
            process: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ServeProcess>> {
        self.process.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderBackend for ServeBackend {
    fn name(&self) -> &str {
        "serve"
    }

    fn start(&self) -> Result<(), DispatchError> {
        let mut process = self.lock();
        if process.is_none() {
            *process = Some(ServeProcess::spawn(&self.binary)?);
            debug!(binary = %self.binary, "Started mermkit serve");
        }
        Ok(())
    }

    fn close(&self) -> Result<(), DispatchError> {
        if let Some(process) = self.lock().take() {
            process.shutdown();
            debug!(binary = %self.binary, "Stopped mermkit serve");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    fn render(
        &self,
        source: &str,
        options: RenderOptions<'_>,
    ) -> Result<BackendOutput, DispatchError> {
        let line = serde_json::to_string(&ServeRequest::render(source, options))
            .map_err(|e| DispatchError::InvalidArgument(e.to_string()))?;

        let mut guard = self.lock();
        let process = guard.as_mut().ok_or_else(|| {
            DispatchError::BackendUnavailable("mermkit serve is not started".to_string())
        })?;

        match process.round_trip(&line) {
            Ok(response) => parse_response(&response),
            Err(e) => {
                // The pipe is unusable after a failed exchange.
                if let Some(process) = guard.take() {
                    process.shutdown();
                }
                Err(DispatchError::BackendUnavailable(format!(
                    "lost connection to mermkit serve: {e}"
                )))
            }
        }
    }
}

impl Drop for ServeBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
