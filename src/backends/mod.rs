//! Segmenter implementations
//!
//! - `PassthroughSegmenter`: uses the alpha channel already present in the input

pub mod passthrough;

// Test utilities for segmenter testing
#[cfg(test)]
pub mod test_utils;

pub use self::passthrough::PassthroughSegmenter;
