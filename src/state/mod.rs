//! State module for tracking run progress
//!
//! `RunPhase` tracks where the orchestrator is in its walk over the listing pages.

mod run_phase;

// Re-export main types
pub use run_phase::RunPhase;
