//! smartctl Invoker
//!
//! Builds smartctl command lines and runs them through the `CommandRunner`
//! port. A non-zero exit status is data, not failure: smartctl reports
//! independent warning conditions as exit-code bits and still prints a
//! complete report alongside them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::hardware::discovery::Device;

/// Exit code recorded when smartctl timed out or could not be started.
pub const FAILED_EXIT_CODE: i32 = -1;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the smartctl invoker
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Path to the smartctl binary
    pub smartctl_path: String,

    /// Upper bound for a single invocation
    pub timeout: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            smartctl_path: "smartctl".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Invocation Mode
// =============================================================================

/// What smartctl is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Device list (`--scan-open`)
    Scan,
    /// Identity, health verdict and attributes of one device
    Info,
}

impl Mode {
    fn args(&self) -> &'static [&'static str] {
        match self {
            Mode::Scan => &["--scan-open", "--json=c"],
            Mode::Info => &["--info", "--health", "--attributes", "--json=c"],
        }
    }
}

// =============================================================================
// Diagnostic Result
// =============================================================================

/// Output of one info invocation, consumed within the same refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticResult {
    /// Originating device
    pub device: Device,
    /// smartctl exit status (bitmask), or [`FAILED_EXIT_CODE`]
    pub exit_code: i32,
    /// smartctl stdout
    pub raw_output: String,
}

impl DiagnosticResult {
    pub fn new(device: Device, exit_code: i32, raw_output: impl Into<String>) -> Self {
        Self {
            device,
            exit_code,
            raw_output: raw_output.into(),
        }
    }

    /// Whether the tool produced any output at all.
    pub fn has_output(&self) -> bool {
        !self.raw_output.trim().is_empty()
    }
}

// =============================================================================
// Invoker
// =============================================================================

/// Runs smartctl for scans and per-device info queries.
#[derive(Clone)]
pub struct SmartctlInvoker {
    config: InvokerConfig,
    runner: Arc<dyn CommandRunner>,
}

impl SmartctlInvoker {
    /// Create a new invoker
    pub fn new(config: InvokerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Build the full command line: program, mode flags, extra args, then the
    /// device operand.
    pub fn command_line(&self, target: Option<&str>, mode: Mode, extra_args: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(mode.args().len() + extra_args.len() + 2);
        args.push(self.config.smartctl_path.clone());
        args.extend(mode.args().iter().map(|s| s.to_string()));
        args.extend(extra_args.iter().cloned());
        if let Some(target) = target {
            args.push(target.to_string());
        }
        args
    }

    /// Run smartctl. Never fails: timeouts and spawn errors are logged and
    /// reported as [`FAILED_EXIT_CODE`] with empty output.
    #[instrument(skip(self, extra_args))]
    pub async fn run(&self, target: Option<&str>, mode: Mode, extra_args: &[String]) -> CommandOutput {
        let args = self.command_line(target, mode, extra_args);

        match self.runner.run(&args, self.config.timeout).await {
            Ok(output) => {
                if output.exit_code != 0 {
                    warn!(exit_code = output.exit_code, "smartctl returned non-zero status");
                }
                output
            }
            Err(e) => {
                warn!("smartctl failed: {}", e);
                CommandOutput::new(FAILED_EXIT_CODE, Vec::new())
            }
        }
    }

    /// Query identity, health and attributes of one device.
    #[instrument(skip(self, device), fields(drive = %device.path))]
    pub async fn invoke(&self, device: &Device) -> DiagnosticResult {
        let extra_args = if device.needs_type_arg() {
            vec!["-d".to_string(), device.device_type.clone()]
        } else {
            Vec::new()
        };

        let output = self.run(Some(&device.target), Mode::Info, &extra_args).await;
        DiagnosticResult::new(device.clone(), output.exit_code, output.stdout_lossy())
    }
}

impl std::fmt::Debug for SmartctlInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartctlInvoker")
            .field("config", &self.config)
            .finish()
    }
}
