//! Certstat Core Library
//!
//! Types and logic for keeping an iOS enterprise certificate index up to date:
//! folder discovery, the remote checker client, response parsing, and the
//! README table rewrite.

pub mod checker;
pub mod compare;
pub mod error;
pub mod folders;
pub mod lint;
pub mod models;
pub mod readme;
pub mod signing;

pub use error::{CertStatError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
