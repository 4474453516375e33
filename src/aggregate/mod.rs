//! Aggregate module - descriptive tallies over the incident table

mod calculator;
pub mod labels;
mod view;

pub use calculator::{binary_split, AggregateError, Aggregator, Period};
pub use view::{AggregateView, CrossTab};
