//! Shared helpers used by the configuration layer and the CLI

pub mod color;

pub use color::ColorParser;
