//! Workspace-level integration tests, benchmarks and demos for `distributed-mutex`.
//!
//! The library API lives in the `distributed-mutex` facade crate and the
//! crates it re-exports.
