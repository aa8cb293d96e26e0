//! Codec implementations.

mod json;

pub use json::JsonCodec;
