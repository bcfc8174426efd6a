//! Recursive template batch: mirrors a source folder tree into an output tree,
//! filling every `.docx` template on the way.
//!
//! The walk is sequential and depth-first. Entries of each folder are visited
//! in name order. A failing file is recorded and the walk moves on; only the
//! pre-flight checks on the two root folders can stop a batch.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::fill::{fill_document, DataMap, FillReport, StyleOverride};
use crate::preview::extract_preview_text;

pub const TEMPLATE_EXTENSION: &str = "docx";
/// Office suites create `~$name.docx` owner files next to open documents.
pub const LOCK_FILE_PREFIX: &str = "~$";

pub const NO_TEMPLATES_MESSAGE: &str = "No .docx templates were found in the source folder.";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("source folder does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("source path is not a folder: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    #[error("output path exists and is not a folder: {}", .0.display())]
    OutputNotDirectory(PathBuf),
    #[error("output name must be a plain file name: {0:?}")]
    InvalidOutputName(String),
    #[error("cannot create output folder {}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, Default)]
pub struct BatchRequest {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Output file name for the first template found directly in
    /// `source_dir`. Blank means "keep every original name".
    pub output_name: Option<String>,
    pub data: DataMap,
    pub style: StyleOverride,
}

/// Result for one template (or one folder that could not be mirrored).
#[derive(Clone, Debug, Serialize)]
pub struct FileOutcome {
    /// Relative to the source root.
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub report: Option<FillReport>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn failed(source: PathBuf, output: Option<PathBuf>, error: String) -> Self {
        Self {
            source,
            output,
            error: Some(error),
            report: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// `"<relative path>: <reason>"`, in walk order.
    pub failures: Vec<String>,
    /// Output path of the first template filled successfully.
    pub first_success: Option<PathBuf>,
    pub files: Vec<FileOutcome>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Filled {
        message: String,
        preview_path: Option<PathBuf>,
    },
    NoTemplates,
    AllFailed {
        message: String,
    },
}

impl BatchStatus {
    pub fn message(&self) -> &str {
        match self {
            BatchStatus::Filled { message, .. } | BatchStatus::AllFailed { message } => message,
            BatchStatus::NoTemplates => NO_TEMPLATES_MESSAGE,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BatchStatus::AllFailed { .. })
    }
}

impl BatchSummary {
    pub fn status(&self) -> BatchStatus {
        if self.succeeded > 0 {
            let mut message = format!("{} document(s) filled.", self.succeeded);
            if !self.failures.is_empty() {
                message.push_str("\nFailed files:\n - ");
                message.push_str(&self.failures.join("\n - "));
            }
            return BatchStatus::Filled {
                message,
                preview_path: self.first_success.clone(),
            };
        }
        if self.failures.is_empty() {
            return BatchStatus::NoTemplates;
        }
        BatchStatus::AllFailed {
            message: format!(
                "No document could be filled:\n - {}",
                self.failures.join("\n - ")
            ),
        }
    }

    /// Text of the first filled document, or the status message when there
    /// is nothing to show.
    pub fn preview_text(&self) -> String {
        match self.status() {
            BatchStatus::Filled {
                preview_path: Some(path),
                ..
            } => extract_preview_text(&path),
            BatchStatus::Filled { .. } => {
                "Documents were filled, but none is available for preview.".to_string()
            }
            other => other.message().to_string(),
        }
    }
}

pub fn fill_batch(request: &BatchRequest) -> Result<BatchSummary, BatchError> {
    fill_batch_with_observer(request, |_| {})
}

/// Like [`fill_batch`], calling `observer` after every attempted template.
pub fn fill_batch_with_observer<F>(
    request: &BatchRequest,
    mut observer: F,
) -> Result<BatchSummary, BatchError>
where
    F: FnMut(&FileOutcome),
{
    let output_name = checked_output_name(request.output_name.as_deref())?;
    let output_root = preflight(request)?;
    log::info!(
        "batch: {} -> {}",
        request.source_dir.display(),
        request.output_dir.display()
    );

    let mut walker = Walker {
        request,
        output_name,
        output_root,
        claimed: false,
        summary: BatchSummary::default(),
        observer: &mut observer,
    };
    walker.walk(Path::new(""));

    let summary = walker.summary;
    log::info!(
        "batch done: {} filled, {} failed",
        summary.succeeded,
        summary.failures.len()
    );
    Ok(summary)
}

/// Checks both roots and creates the output root when missing. Returns the
/// canonical output root, used to keep a nested output tree out of the walk.
fn preflight(request: &BatchRequest) -> Result<Option<PathBuf>, BatchError> {
    let src = &request.source_dir;
    if !src.exists() {
        return Err(BatchError::SourceMissing(src.clone()));
    }
    if !src.is_dir() {
        return Err(BatchError::SourceNotDirectory(src.clone()));
    }

    let out = &request.output_dir;
    if out.exists() {
        if !out.is_dir() {
            return Err(BatchError::OutputNotDirectory(out.clone()));
        }
    } else {
        std::fs::create_dir_all(out).map_err(|source| BatchError::CreateOutput {
            path: out.clone(),
            source,
        })?;
    }
    Ok(out.canonicalize().ok())
}

/// Normalized override name. Anything other than a bare file name would
/// place the output outside the output folder.
fn checked_output_name(name: Option<&str>) -> Result<Option<String>, BatchError> {
    let Some(name) = name.and_then(normalize_output_name) else {
        return Ok(None);
    };
    if Path::new(&name).file_name() != Some(OsStr::new(&name)) {
        return Err(BatchError::InvalidOutputName(name));
    }
    Ok(Some(name))
}

/// Trimmed override name with the template extension appended when missing.
/// Blank names disable the override.
pub fn normalize_output_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let suffix = format!(".{TEMPLATE_EXTENSION}");
    if name.to_ascii_lowercase().ends_with(&suffix) {
        Some(name.to_string())
    } else {
        Some(format!("{name}{suffix}"))
    }
}

pub fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
}

fn is_lock_file(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(LOCK_FILE_PREFIX)
}

/// Templates a batch over `root` would attempt, leaving out `output_root`
/// when it lies inside. Unreadable folders count as empty.
pub fn count_templates(root: &Path, output_root: Option<&Path>) -> usize {
    let Ok(entries) = list_dir(root) else {
        return 0;
    };
    let output_root = output_root.and_then(|p| p.canonicalize().ok());
    count_in(&entries, output_root.as_deref())
}

fn count_in(entries: &[PathBuf], output_root: Option<&Path>) -> usize {
    entries
        .iter()
        .map(|p| {
            if p.is_dir() {
                if is_output_root(p, output_root) {
                    return 0;
                }
                list_dir(p).map_or(0, |sub| count_in(&sub, output_root))
            } else {
                let lock = p.file_name().is_some_and(is_lock_file);
                usize::from(p.is_file() && is_template(p) && !lock)
            }
        })
        .sum()
}

struct Walker<'a> {
    request: &'a BatchRequest,
    output_name: Option<String>,
    output_root: Option<PathBuf>,
    claimed: bool,
    summary: BatchSummary,
    observer: &'a mut dyn FnMut(&FileOutcome),
}

impl Walker<'_> {
    fn walk(&mut self, rel_dir: &Path) {
        let src_dir = under(&self.request.source_dir, rel_dir);
        let out_dir = under(&self.request.output_dir, rel_dir);

        let entries = match list_dir(&src_dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::error!("{err:#}");
                self.record(FileOutcome::failed(
                    rel_dir.to_path_buf(),
                    None,
                    format!("{err:#}"),
                ));
                return;
            }
        };

        for path in entries {
            let Some(name) = path.file_name() else {
                continue;
            };
            let rel = rel_dir.join(name);

            if path.is_dir() {
                if is_output_root(&path, self.output_root.as_deref()) {
                    log::info!("skipping output folder inside source: {}", path.display());
                    continue;
                }
                let out_sub = out_dir.join(name);
                log::debug!("folder {} -> {}", rel.display(), out_sub.display());
                if let Err(err) = std::fs::create_dir_all(&out_sub) {
                    log::error!("cannot create output folder {}: {err}", out_sub.display());
                    self.record(FileOutcome::failed(
                        rel,
                        Some(out_sub),
                        format!("cannot create output folder: {err}"),
                    ));
                    continue;
                }
                self.walk(&rel);
            } else if path.is_file() && is_lock_file(name) {
                log::info!("skipping lock file: {}", path.display());
            } else if path.is_file() && is_template(&path) {
                let in_root = rel_dir.as_os_str().is_empty();
                let out_name = self.output_file_name(name, in_root);
                let out_path = out_dir.join(out_name);
                self.fill_one(&path, rel, out_path);
            } else {
                log::debug!("ignoring {}", rel.display());
            }
        }
    }

    /// The override name goes to the first template directly in the source
    /// root; every other template keeps its own name.
    fn output_file_name(&mut self, name: &OsStr, in_root: bool) -> OsString {
        match self.output_name.as_deref() {
            Some(custom) if in_root && !self.claimed => {
                self.claimed = true;
                log::debug!("{} takes output name {custom}", name.to_string_lossy());
                OsString::from(custom)
            }
            _ => name.to_os_string(),
        }
    }

    fn fill_one(&mut self, path: &Path, rel: PathBuf, out_path: PathBuf) {
        let request = self.request;
        let outcome = match fill_document(path, &out_path, &request.data, &request.style) {
            Ok(report) => {
                log::info!("filled {} -> {}", rel.display(), out_path.display());
                FileOutcome {
                    source: rel,
                    output: Some(out_path),
                    error: None,
                    report: Some(report),
                }
            }
            Err(err) => {
                log::error!("{} failed: {err}", rel.display());
                FileOutcome::failed(rel, Some(out_path), err.to_string())
            }
        };
        self.record(outcome);
    }

    fn record(&mut self, outcome: FileOutcome) {
        match &outcome.error {
            None => {
                self.summary.succeeded += 1;
                if self.summary.first_success.is_none() {
                    self.summary.first_success = outcome.output.clone();
                }
            }
            Some(reason) => {
                let shown = if outcome.source.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    outcome.source.as_path()
                };
                self.summary
                    .failures
                    .push(format!("{}: {reason}", shown.display()));
            }
        }
        (self.observer)(&outcome);
        self.summary.files.push(outcome);
    }
}

fn is_output_root(dir: &Path, output_root: Option<&Path>) -> bool {
    output_root.is_some_and(|root| dir.canonicalize().is_ok_and(|d| d == root))
}

fn under(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

fn list_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("list folder: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("list folder: {}", dir.display()))?;
    paths.sort();
    Ok(paths)
}
