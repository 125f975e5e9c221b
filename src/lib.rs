//! # entry-reducers
//!
//! Streaming reducers for parsed log entries.
//!
//! This library is the last stage of a read, parse, reduce pipeline. Entries
//! arrive on a channel from an upstream parser; a reducer runs as its own
//! task, drains the channel and sends exactly one result.
//!
//! ## Overview
//!
//! - **Entries**: field name to string value, produced upstream
//! - **Reducers**: `ReadAll`, `Count`, `Sum`, `Avg` and `Chain`, all behind
//!   the `Reducer` trait
//! - **Results**: a `Reduction`, matched by variant
//! - **Descriptions**: a small text DSL and TOML configuration that build
//!   reducers
//!
//! ## Example
//!
//! ```
//! use entry_reducers::{Entry, Sum, reduce_entries};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let entries: Vec<Entry> = vec![
//!     [("bytes", "512")].into_iter().collect(),
//!     [("bytes", "-")].into_iter().collect(),
//!     [("bytes", "256")].into_iter().collect(),
//! ];
//!
//! let result = reduce_entries(Box::new(Sum::new(["bytes"])), entries, 16)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.field_sums().unwrap()["bytes"], 768.0);
//! # });
//! ```

pub mod config;
pub mod dsl;
pub mod entry;
pub mod error;
pub mod executor;
pub mod logging;
pub mod reducer;
pub mod reduction;

pub use config::ReduceConfig;
pub use dsl::{ReducerSpec, parse_reducer, parse_stages};
pub use entry::{Entry, Fields, parse_float};
pub use error::{EntryError, ReduceError};
pub use executor::{PendingReduction, drain, entry_channel, reduce_entries, spawn_reducer};
pub use logging::init_logging;
pub use reducer::{
    Avg, Chain, Count, DEFAULT_CHAIN_CAPACITY, EntryReceiver, EntrySender, ReadAll, Reducer,
    ReductionSender, Sum, spec_to_reducer,
};
pub use reduction::{FieldValues, Reduction};
