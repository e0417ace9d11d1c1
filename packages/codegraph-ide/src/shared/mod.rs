//! Shared utilities

pub(crate) mod macros;
