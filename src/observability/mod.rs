//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline, monitor and façade produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//! ```

pub mod logging;
pub mod metrics;
