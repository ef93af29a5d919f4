//! # Engine Module
//!
//! The stages that turn a [`Case`](crate::core::models::case::Case) into fully specified
//! topologies. Each stage takes a case by reference and returns a new one.
//!
//! - **Placement** ([`placement`]) - idealized lattice coordinates for every SSE
//! - **Connectivity** ([`connectivity`]) - enumeration or evaluation of traversal orders
//! - **Correction** ([`correction`]) - empirical per-pair shifts and tilts
//! - **Loops** ([`loops`]) - loop length estimates between consecutive SSEs
//!
//! Shared plumbing lives in [`config`], [`error`] and [`progress`].

pub mod config;
pub mod connectivity;
pub mod correction;
pub mod error;
pub mod loops;
pub mod placement;
pub mod progress;
