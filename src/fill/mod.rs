//! Template filling: placeholder scanning, paragraph rebuilding and the
//! per-document driver.

use std::collections::HashMap;

pub mod document;
pub mod rebuild;
pub mod scanner;

pub use document::{fill_document, FillError, FillReport};

/// Placeholder key → replacement value. Every key present resolves, even to
/// an empty string.
pub type DataMap = HashMap<String, String>;

/// Caller preferences applied to substituted text only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleOverride {
    pub force_bold: bool,
    pub force_italic: bool,
    pub font_family: Option<String>,
}

impl StyleOverride {
    /// The preferred family, or `None` when unset or blank.
    pub fn preferred_font_family(&self) -> Option<&str> {
        self.font_family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}
