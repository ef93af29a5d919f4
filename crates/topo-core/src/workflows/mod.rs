//! # Workflows Module
//!
//! High-level entry points that chain the [`engine`](crate::engine) stages into complete
//! procedures.
//!
//! - **Build Workflow** ([`build`]) - placement, connectivity enumeration or evaluation,
//!   empirical corrections and loop estimation for one case, with progress reporting.

pub mod build;
