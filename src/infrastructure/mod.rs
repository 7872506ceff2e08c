pub mod core;
pub mod factory;
pub mod mock;
pub mod observability;
pub mod prometheus;

pub use factory::ExporterFactory;
