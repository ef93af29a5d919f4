//! # Core Models Module
//!
//! Data structures describing a topology instance as it moves through the pipeline.
//!
//! ## Key Components
//!
//! - [`sse`] - SSE types and the `<Layer><Position><Type>` slot identifiers
//! - [`connectivity`] - Traversal orders over the slots and their string notation
//! - [`architecture`] - Parsers for the compact architecture and topology notations
//! - [`case`] - The validated [`case::Case`] record with configuration, layers, motifs,
//!   coordinates and metadata
//!
//! ## Usage
//!
//! ```ignore
//! use topobuilder::core::models::case::Case;
//!
//! let case = Case::from_architecture("sandwich", "2H.4E.2H")?;
//! assert_eq!(case.architecture_signature(), "2H.4E.2H");
//! assert_eq!(case.connectivity_count(), 0);
//! ```

pub mod architecture;
pub mod case;
pub mod connectivity;
pub mod sse;
