//! Conditional tracing for the solver's hot loop
//!
//! `hot_trace!` forwards to `tracing::trace!` with the `trace` feature and expands to
//! nothing otherwise, so per-propagation events cost nothing in normal builds.

#[cfg(feature = "trace")]
macro_rules! hot_trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "trace"))]
macro_rules! hot_trace {
    ($($arg:tt)*) => {};
}

pub(crate) use hot_trace;
