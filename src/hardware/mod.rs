//! Hardware Discovery Module
//!
//! Enumeration of the storage devices smartctl can query, including drives
//! behind MegaRAID controllers and USB bridges.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartprom::adapters::{LoggingEventPublisher, TokioCommandRunner};
//! use smartprom::hardware::DeviceEnumerator;
//! use smartprom::smartctl::{InvokerConfig, SmartctlInvoker};
//!
//! # async fn example() -> smartprom::Result<()> {
//! let invoker = SmartctlInvoker::new(InvokerConfig::default(), Arc::new(TokioCommandRunner::new()));
//! let enumerator = DeviceEnumerator::new(invoker, Arc::new(LoggingEventPublisher::new()));
//!
//! for device in enumerator.enumerate().await? {
//!     println!("{} ({}, {})", device.path, device.device_type, device.protocol);
//! }
//! # Ok(())
//! # }
//! ```

pub mod discovery;

pub use discovery::{scanner::DeviceEnumerator, Device, ProtocolType};
