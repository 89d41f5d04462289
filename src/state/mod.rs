//! Per-record fetch state
//!
//! A record is pending until the strategy chain returns, and then sits in
//! exactly one terminal state for the rest of the run.

mod fetch_state;

pub use fetch_state::FetchState;
