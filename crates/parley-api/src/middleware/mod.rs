//! Tower middleware layers.

pub mod cors;
