//! Numeric helpers for turning geometry into pixel coordinates.

pub mod safe_cast;
