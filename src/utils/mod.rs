//! The `utils` module holds the pieces every other module leans on: the
//! crate-wide error types and the logging bootstrap.

pub mod error;
pub mod logging;
