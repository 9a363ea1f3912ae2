//! Deskline Shared Types
//!
//! This crate contains the ticket and chat transcript types shared across the Deskline console.

pub mod types;

pub use types::*;
