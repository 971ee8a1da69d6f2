//! Command-line handlers.

pub mod index;
