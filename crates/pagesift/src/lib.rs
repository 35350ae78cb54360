//! Public facade crate for `pagesift`.
//!
//! This crate intentionally contains no logic. It re-exports the contracts
//! from `pagesift-core` and the extraction entry point from
//! `pagesift-extract`.

pub use pagesift_core::*;
pub use pagesift_extract::extract;
