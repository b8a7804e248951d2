//! Code signing material handling.

pub mod ios;

pub use ios::*;
