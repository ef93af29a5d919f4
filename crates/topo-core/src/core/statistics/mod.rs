//! Empirical statistics consumed by the refinement stage.
//!
//! The tables are derived elsewhere from real structures; this module only loads them.

pub mod corrections;
