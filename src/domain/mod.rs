// Topology entities and stitching metadata
pub mod entity;

// Raw and typed metric samples
pub mod sample;

// Configuration objects passed into the core
pub mod settings;

// Port interfaces
pub mod ports;

// Orchestrator outcomes
pub mod report;

// Domain-specific error types
pub mod errors;
