//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FrontierStore`: discovered/processed URL sets and backlink provenance of one job
//! - `JobPhase`: the wave orchestrator's state machine

mod frontier;
mod job_phase;

// Re-export main types
pub use frontier::{FrontierSnapshot, FrontierStore};
pub use job_phase::JobPhase;
