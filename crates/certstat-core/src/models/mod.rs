//! Domain models for certstat.

pub mod listing;
pub mod report;

pub use listing::*;
pub use report::*;
