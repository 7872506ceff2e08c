pub mod client;
pub mod exporter;
pub mod queries;

pub use client::PrometheusClient;
pub use exporter::PrometheusExporter;
