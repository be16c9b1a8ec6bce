//! Domain Layer
//!
//! # Architecture
//!
//! The domain layer is organized into:
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for the diagnostic tool and event sinks
//! - **Events** (`events.rs`) - Per-cycle events for operator visibility
//!
//! # Usage
//!
//! ```ignore
//! use smartprom::domain::ports::{CommandRunner, EventPublisher};
//! use smartprom::domain::events::RefreshEvent;
//!
//! async fn report<E: EventPublisher>(events: &E, drive: &str, exit_code: i32) -> Result<()> {
//!     events.publish(RefreshEvent::invocation_failed(drive, exit_code)).await
//! }
//! ```

pub mod events;
pub mod ports;

pub use events::RefreshEvent;
pub use ports::{CommandOutput, CommandRunner, EventPublisher};
