//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainState`: per-domain request spacing and adaptive delay
//! - `RunStatus`: lifecycle of a crawl run (pending, running, terminal)
//! - `RunCounts`: discovered/stored/duplicate/error totals for a run

mod domain_state;
mod run_state;

// Re-export main types
pub use domain_state::{initial_delay, DomainState};
pub use run_state::{RunCounts, RunStatus};
