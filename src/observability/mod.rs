//! Observability
//!
//! Logging, metrics and the structured event stream emitted while a
//! schedule is simulated.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter};
pub use logging::{LogFormat, init_logging};
pub use metrics::{init_metrics, render_metrics};
