//! Imprint DB Library
//!
//! Persistent store for templates and upload records.

pub mod db;

pub use db::*;
