//! Data model for the catalog pipeline and its HTTP surface.

pub mod media;

pub use media::*;
