//! # Core Module
//!
//! Stateless building blocks shared by every pipeline stage.
//!
//! ## Architecture
//!
//! - **Topology Representation** ([`models`]) - SSE identifiers, connectivity notation and the
//!   validated [`models::case::Case`] record
//! - **File I/O** ([`io`]) - Reading and writing case documents as JSON or TOML
//! - **Empirical Statistics** ([`statistics`]) - Per-pair correction tables loaded from CSV
//! - **Geometry** ([`utils`]) - Idealized SSE axes, termini and distances
//!
//! Nothing in this layer keeps state between calls; the [`crate::engine`] layer builds the
//! pipeline stages on top of it.

pub mod io;
pub mod models;
pub mod statistics;
pub mod utils;
