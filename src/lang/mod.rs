//! # MicroScript runtime values
//!
//! The value model is closed: a number, a boolean, a string, or undefined.
//! Arithmetic and logic operations pattern-match on it and fault on the
//! wrong shape.

pub mod value;

pub use value::Value;
