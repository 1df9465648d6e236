//! Debugging front ends.

pub(crate) mod dap;
