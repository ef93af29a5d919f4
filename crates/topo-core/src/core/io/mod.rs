//! Reading and writing case documents.
//!
//! A case can be stored as JSON or TOML. [`document::CaseFormat`] picks the syntax
//! from the file extension and [`traits::CaseFile`] provides the common API.

pub mod document;
pub mod traits;
