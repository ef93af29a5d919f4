//! # TopoBuilder Core Library
//!
//! Builds layered protein scaffold topologies: an architecture such as `2H.4E.2H` is placed on
//! an idealized lattice, every single-chain traversal of its secondary structure elements is
//! enumerated, and each resulting topology is refined with empirical corrections and loop
//! length estimates.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Case`, `SseId`, `Connectivity`),
//!   notation parsers, case document I/O, correction tables and geometry helpers.
//!
//! - **[`engine`]: The Stages.** Lattice placement, the connectivity enumerator with its
//!   equivalence relations, the correction stage and the loop length estimator. Every stage
//!   returns a new `Case` and leaves its input untouched.
//!
//! - **[`workflows`]: The Public API.** Chains the stages into a single `build` call with
//!   progress reporting.

pub mod core;
pub mod engine;
pub mod workflows;
