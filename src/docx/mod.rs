//! Minimal WordprocessingML model: zip package, lossless XML events, runs,
//! paragraphs and the main document part.

pub mod document;
pub mod package;
pub mod paragraph;
pub mod style;
pub mod xml;
