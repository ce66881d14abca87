use super::protocol::{parse_payload, resolve_binary};
use crate::error::DispatchError;
use crate::render::{BackendOutput, RenderOptions};
use crate::traits::RenderBackend;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Runs `mermkit render --stdin --json` once per call.
pub struct OneShotBackend {
    binary: String,
    ready: AtomicBool,
}

impl OneShotBackend {
    pub fn new(binary: Option<&str>) -> Self {
        Self {
            binary: resolve_binary(binary),
            ready: AtomicBool::new(false),
        }
    }

    fn args<'a>(options: &RenderOptions<'a>) -> Vec<&'a str> {
        let mut args = vec!["render", "--stdin", "--format", options.format.as_str(), "--json"];
        if let Some(theme) = options.theme {
            args.push("--theme");
            args.push(theme);
        }
        if let Some(engine) = options.engine {
            args.push("--engine");
            args.push(engine);
        }
        args
    }
}

impl RenderBackend for OneShotBackend {
    fn name(&self) -> &str {
        "oneshot"
    }

    fn start(&self) -> Result<(), DispatchError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), DispatchError> {
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn render(
        &self,
        source: &str,
        options: RenderOptions<'_>,
    ) -> Result<BackendOutput, DispatchError> {
        if !self.is_connected() {
            return Err(DispatchError::BackendUnavailable(
                "oneshot backend is not started".to_string(),
            ));
        }

        let args = Self::args(&options);
        debug!(binary = %self.binary, ?args, "Spawning mermkit render");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DispatchError::BackendUnavailable(format!("failed to spawn '{}': {e}", self.binary))
            })?;

        // A rejected diagram can make mermkit exit before reading all of
        // stdin; its exit status decides what the broken pipe means.
        let write_error = child
            .stdin
            .take()
            .and_then(|mut stdin| stdin.write_all(source.as_bytes()).err());

        let output = child.wait_with_output().map_err(|e| {
            DispatchError::BackendUnavailable(format!("failed to wait for mermkit: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("mermkit exited with {}", output.status),
                msg => msg.to_string(),
            };
            return Err(DispatchError::RenderError(message));
        }

        if let Some(e) = write_error {
            return Err(DispatchError::BackendUnavailable(format!(
                "failed to write diagram source: {e}"
            )));
        }

        parse_payload(&output.stdout)
    }
}
