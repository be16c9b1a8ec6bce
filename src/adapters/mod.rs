//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │          CommandRunner │ EventPublisher                     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ TokioCommandRunner │ LoggingEventPublisher                  │ │
//! │  │ InMemoryEventCollector │ PrometheusRegistryAdapter          │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartprom::adapters::{LoggingEventPublisher, TokioCommandRunner};
//! use smartprom::controller::{RefreshConfig, RefreshScheduler};
//! use smartprom::smartctl::{InvokerConfig, SmartctlInvoker};
//!
//! let invoker = SmartctlInvoker::new(InvokerConfig::default(), Arc::new(TokioCommandRunner::new()));
//! let scheduler = RefreshScheduler::new(
//!     RefreshConfig::default(),
//!     invoker,
//!     Arc::new(LoggingEventPublisher::info_level()),
//! );
//! ```

mod event_publisher;
mod process;
pub mod prometheus;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use process::TokioCommandRunner;
pub use prometheus::PrometheusRegistryAdapter;
