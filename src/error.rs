//! Error types for the SMART Prometheus Exporter

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the SMART Prometheus Exporter
///
/// None of these are fatal to a running exporter: each one is scoped to a
/// single attribute, device or refresh cycle and logged by the scheduler.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// smartctl did not finish in time
    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    /// Enumeration produced no usable device list
    #[error("Device scan failed: {0}")]
    ScanFailed(String),

    /// One device's diagnostic call failed or timed out
    #[error("smartctl invocation failed for {device} (exit code {exit_code})")]
    InvocationFailed { device: String, exit_code: i32 },

    // =========================================================================
    // Exposition Errors
    // =========================================================================
    /// Prometheus registry error
    #[error("Prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
