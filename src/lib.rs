//! Budget execution matrix: planned vs actual spend per project, budget item
//! and month, with view-mode filtering and totals.

pub mod aggregator;
pub mod cli;
pub mod error;
pub mod fmt;
pub mod logging;
pub mod models;
pub mod payload;
pub mod settings;
