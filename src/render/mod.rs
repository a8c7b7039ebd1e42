//! Rendering of the preview.

pub mod pipeline;

pub use pipeline::*;
