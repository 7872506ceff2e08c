// Sample grouping, aggregation and capacity renormalization
pub mod correlation;

// Entity construction
pub mod builders;

// Discovery orchestrator
pub mod discovery;

// Periodic discovery loop
pub mod service;
