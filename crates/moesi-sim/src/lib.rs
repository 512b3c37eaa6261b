//! Trace-driven runner for the MOESI cache-coherence simulator.

/// JSON configuration loading and command-line overrides.
pub mod config;
/// Errors raised before a run starts.
pub mod errors;
/// Trace execution and reporting.
pub mod runner;
/// Access-trace parsing.
pub mod trace;
