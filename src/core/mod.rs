//! Core building blocks shared by the pool subsystem:
//! - Common size and alignment constants
//! - The allocation-context type threaded through every draw

pub mod types;

pub use types::*;
