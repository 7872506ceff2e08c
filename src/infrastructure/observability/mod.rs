//! Push-based observability for prometopo
//!
//! Nothing here listens for requests. The discovery pipeline records its own
//! health into a Prometheus registry, and topology outcomes are pushed as
//! structured JSON lines to stdout.

pub mod metrics;
pub mod sink;

pub use metrics::Metrics;
pub use sink::JsonStdoutSink;
