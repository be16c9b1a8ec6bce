//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the core abstractions (ports) that the refresh
//! pipeline depends on. Infrastructure adapters implement these traits to
//! provide concrete implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │          CommandRunner │ EventPublisher              │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  TokioCommandRunner │ LoggingEventPublisher          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;

use super::events::RefreshEvent;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Captured result of one external command.
///
/// `exit_code` is kept verbatim: smartctl encodes independent warning
/// conditions as bits, so a non-zero code still comes with usable output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit status
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: Vec<u8>,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
        }
    }

    /// Standard output decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

// =============================================================================
// Command Port
// =============================================================================

/// Port for running the diagnostic tool.
///
/// The invoker depends only on this contract, not on how the process is
/// spawned. Implementations must capture stdout and the exit status, treat a
/// non-zero exit as a normal return, and enforce `timeout`, terminating the
/// process when it expires.
///
/// # Example
///
/// ```ignore
/// struct ScriptedRunner { /* ... */ }
///
/// #[async_trait]
/// impl CommandRunner for ScriptedRunner {
///     async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command described by `args` (program first).
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

// =============================================================================
// Event Port
// =============================================================================

/// Port for surfacing per-cycle events to operators.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: RefreshEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<RefreshEvent>) -> Result<()>;
}
