//! Fills `{placeholder}` tokens in `.docx` templates while keeping each run's
//! formatting, one file or a whole folder tree at a time.

pub mod batch;
pub mod config;
pub mod docx;
pub mod fill;
pub mod keys;
pub mod preview;
pub mod progress;

pub use batch::{
    fill_batch, fill_batch_with_observer, BatchError, BatchRequest, BatchStatus, BatchSummary,
    FileOutcome,
};
pub use fill::{fill_document, DataMap, FillError, FillReport, StyleOverride};
pub use preview::extract_preview_text;
