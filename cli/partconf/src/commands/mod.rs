//! CLI command implementations.

pub mod check;
pub mod classify;
pub mod convert;
pub mod parts;
