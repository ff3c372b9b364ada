//! # syncd-tx
//!
//! The column validator, mapper, and type coercer (C3 in the design). Turns
//! a decoder's raw string table into a destination-ordered, typed
//! `NormalizedTable`, strictly bound to a `TableSpec` from the schema
//! registry.

mod normalize;

pub use normalize::{normalize, NormalizeOutcome, RESERVED_KEYWORDS};
