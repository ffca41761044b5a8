//! Transformation module.
//!
//! This module turns the two raw tables into dashboard views:
//! - Merge: left join of transactions onto departments
//! - Normalize: typed dates and values
//! - Filter: region / department / property type selectors
//! - Aggregate: grouped statistics and scalars
//! - Pipeline: one render cycle end to end

pub mod aggregate;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod pipeline;

pub use aggregate::{AggregateView, Aggregates, Scalars, Statistic, ViewRow};
pub use filter::{Selector, SelectorOptions, Selectors};
pub use merge::MergeStats;
pub use normalize::Normalized;
pub use pipeline::*;
