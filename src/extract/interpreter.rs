//! Probe that installs each version into its own virtual environment

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::catalog::{Signature, SymbolMap, types::symbol_map};
use crate::config::ExtractionConfig;
use crate::extract::error::ProbeError;
use crate::extract::probe::SignatureProbe;
use crate::index::Installable;

/// Script run inside the environment; prints the signatures as JSON
const INTROSPECT_SCRIPT: &str = include_str!("introspect.py");

/// Runs a fresh interpreter in a fresh virtual environment per version
pub struct InterpreterProbe {
    python: String,
    timeout: Duration,
}

impl InterpreterProbe {
    pub fn new(python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.python.clone(),
            Duration::from_millis(config.probe_timeout_ms),
        )
    }

    async fn run_step(&self, step: &'static str, command: &mut Command) -> Result<Output, ProbeError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => Ok(output?),
            Err(_elapsed) => Err(ProbeError::Timeout {
                step,
                millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

/// Interpreter inside a virtual environment
fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Parse the introspection script's JSON output
fn parse_output(stdout: &[u8]) -> Result<SymbolMap, ProbeError> {
    let signatures: Vec<Signature> = serde_json::from_slice(stdout)?;
    Ok(symbol_map(signatures))
}

#[async_trait]
impl SignatureProbe for InterpreterProbe {
    async fn probe(&self, installable: &Installable) -> Result<SymbolMap, ProbeError> {
        let requirement = installable.requirement();
        let workdir = tempfile::Builder::new().prefix("pinpoint-").tempdir()?;
        let venv = workdir.path().join("venv");

        debug!("Creating virtual environment for {} in {:?}", requirement, venv);
        let output = self
            .run_step(
                "virtualenv creation",
                Command::new(&self.python).arg("-m").arg("venv").arg(&venv),
            )
            .await?;
        if !output.status.success() {
            return Err(ProbeError::Environment {
                stderr: stderr_of(&output),
            });
        }

        let python = venv_python(&venv);

        debug!("Installing {}", installable.install_target());
        let output = self
            .run_step(
                "install",
                Command::new(&python)
                    .args(["-m", "pip", "install", "--quiet"])
                    .args(["--disable-pip-version-check", "--no-input"])
                    .arg(installable.install_target()),
            )
            .await?;
        if !output.status.success() {
            return Err(ProbeError::Install {
                requirement,
                stderr: stderr_of(&output),
            });
        }

        debug!("Introspecting {}", requirement);
        let output = self
            .run_step(
                "introspection",
                Command::new(&python)
                    .arg("-I")
                    .arg("-c")
                    .arg(INTROSPECT_SCRIPT)
                    .arg(&installable.library),
            )
            .await?;
        if !output.status.success() {
            return Err(ProbeError::Introspection {
                stderr: stderr_of(&output),
            });
        }

        let symbols = parse_output(&output.stdout)?;
        debug!("Captured {} symbols for {}", symbols.len(), requirement);

        // workdir (and the environment in it) is removed on drop
        Ok(symbols)
    }
}
