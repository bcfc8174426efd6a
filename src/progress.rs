//! Console feedback for a running batch: one stderr line per template,
//! stamped with the time since the batch started.

use std::io::{self, Write};
use std::time::Instant;

use crate::batch::FileOutcome;

pub struct ConsoleProgress {
    enabled: bool,
    started: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.started.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {}", msg.as_ref());
    }

    /// Reports one attempted template as number `current` of `total`.
    pub fn file_done(&self, outcome: &FileOutcome, current: usize, total: usize) {
        self.info(outcome_line(outcome, current, total));
    }
}

/// `total` is a pre-count and may lag behind the walk; it never shows below
/// `current`.
fn outcome_line(outcome: &FileOutcome, current: usize, total: usize) -> String {
    let counter = format!("{current}/{}", total.max(current));
    let source = outcome.source.display();
    match (&outcome.error, &outcome.report) {
        (Some(err), _) => format!("{counter} FAIL {source}: {err}"),
        (None, Some(report)) if report.placeholders_unresolved > 0 => format!(
            "{counter} ok   {source} ({} filled, {} left as-is)",
            report.placeholders_resolved, report.placeholders_unresolved
        ),
        (None, Some(report)) => format!(
            "{counter} ok   {source} ({} filled)",
            report.placeholders_resolved
        ),
        (None, None) => format!("{counter} ok   {source}"),
    }
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
