//! Persisted state and the sample historian for the incubator control core.
//!
//! Two independent concerns share this crate because both are "the durable
//! record of what the incubator was doing": [`state`] is the small,
//! frequently-rewritten document (setpoints, enable flags, the global run
//! flag); [`historian`] is the large, append-only time series of samples.

mod error;
pub mod historian;
pub mod state;

pub use error::StoreError;
pub use historian::{default_query_timeout, Historian, Sample};
pub use state::{GlobalState, StateStore};
