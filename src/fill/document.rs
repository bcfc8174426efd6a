use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::docx::document::{DocxDocument, ParagraphContainer};
use crate::fill::rebuild::rebuild_paragraph;
use crate::fill::{DataMap, StyleOverride};

#[derive(Debug, Error)]
pub enum FillError {
    /// The template could not be opened or parsed. Nothing was written.
    #[error("cannot read {}: {cause:#}", path.display())]
    Read { path: PathBuf, cause: anyhow::Error },
    #[error("cannot write {}: {cause:#}", path.display())]
    Write { path: PathBuf, cause: anyhow::Error },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub paragraphs: usize,
    pub table_paragraphs: usize,
    pub paragraphs_rebuilt: usize,
    pub placeholders_resolved: usize,
    pub placeholders_unresolved: usize,
}

/// Fills every body paragraph, then every paragraph of every table cell, and
/// writes the result to `output`. The input file is never modified; it may
/// equal `output` since the whole package is read up front.
pub fn fill_document(
    input: &Path,
    output: &Path,
    data: &DataMap,
    overrides: &StyleOverride,
) -> Result<FillReport, FillError> {
    let read_err = |cause| FillError::Read {
        path: input.to_path_buf(),
        cause,
    };
    let mut doc = DocxDocument::open(input).map_err(read_err)?;

    let mut report = FillReport::default();
    doc.edit_paragraphs(|slot, para| {
        report.paragraphs += 1;
        if matches!(slot.container, ParagraphContainer::TableCell { .. }) {
            report.table_paragraphs += 1;
        }
        match rebuild_paragraph(para, data, overrides) {
            Some(stats) => {
                report.paragraphs_rebuilt += 1;
                report.placeholders_resolved += stats.resolved;
                report.placeholders_unresolved += stats.unresolved;
                true
            }
            None => false,
        }
    })
    .map_err(read_err)?;

    doc.save(output).map_err(|cause| FillError::Write {
        path: output.to_path_buf(),
        cause,
    })?;

    log::debug!(
        "filled {} -> {}: {} of {} paragraphs rebuilt, {} resolved, {} unresolved",
        input.display(),
        output.display(),
        report.paragraphs_rebuilt,
        report.paragraphs,
        report.placeholders_resolved,
        report.placeholders_unresolved
    );
    Ok(report)
}
