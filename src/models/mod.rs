//! Display models for CLI output
//!
//! Converts backend records and library status types into CLI-friendly
//! rows for table and JSON rendering.

pub mod display;

pub use display::{GuardDisplay, MemberDisplay};
