//! Placeholder substitution inside one paragraph.
//!
//! Planning is a pure function of the paragraph's runs, its flattened text
//! and the data map. The paragraph is only touched after the whole segment
//! list exists, and then in a single swap of its run collection.

use crate::docx::paragraph::{Paragraph, Run};
use crate::docx::style::StyleDescriptor;
use crate::fill::scanner::{contains_placeholder, scan, PlaceholderMatch};
use crate::fill::{DataMap, StyleOverride};

/// What the planner needs from an existing run.
#[derive(Clone, Debug)]
pub struct RunSnapshot {
    /// `None` for a run whose text could not be read; such runs are dropped.
    pub text: Option<String>,
    pub style: StyleDescriptor,
}

impl RunSnapshot {
    pub fn of(run: &Run) -> Self {
        Self {
            text: run.text().map(str::to_string),
            style: run.style(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub text: String,
    /// `None` means "no original style": defaults, plus overrides when substituted.
    pub style: Option<StyleDescriptor>,
    /// Text came from the data map.
    pub substituted: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentPlan {
    pub segments: Vec<Segment>,
    pub resolved: usize,
    pub unresolved: usize,
}

impl SegmentPlan {
    fn literal(&mut self, text: &str, style: Option<&StyleDescriptor>) {
        self.segments.push(Segment {
            text: text.to_string(),
            style: style.cloned(),
            substituted: false,
        });
    }

    fn placeholder(&mut self, m: &PlaceholderMatch<'_>, style: Option<&StyleDescriptor>, data: &DataMap) {
        match data.get(m.key) {
            Some(value) => {
                self.resolved += 1;
                self.segments.push(Segment {
                    text: value.clone(),
                    style: style.cloned(),
                    substituted: true,
                });
            }
            None => {
                self.unresolved += 1;
                self.literal(m.literal, style);
            }
        }
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Segments replacing the paragraph's runs, or `None` when the paragraph has
/// nothing to substitute and must be left alone.
pub fn plan_segments(runs: &[RunSnapshot], flattened: &str, data: &DataMap) -> Option<SegmentPlan> {
    if runs.is_empty() {
        if !contains_placeholder(flattened) {
            return None;
        }
        return Some(plan_from_text(flattened, data));
    }

    let any_run = runs
        .iter()
        .filter_map(|r| r.text.as_deref())
        .any(contains_placeholder);
    let joined: String = runs.iter().filter_map(|r| r.text.as_deref()).collect();
    if !any_run && !contains_placeholder(&joined) {
        return None;
    }
    let plan = plan_from_runs(runs, &joined, data);
    (!plan.segments.is_empty()).then_some(plan)
}

/// Paragraph text with no run objects: everything gets the default style.
fn plan_from_text(text: &str, data: &DataMap) -> SegmentPlan {
    let mut plan = SegmentPlan::default();
    let mut pos = 0usize;
    for m in scan(text) {
        if m.start > pos {
            plan.literal(&text[pos..m.start], None);
        }
        plan.placeholder(&m, None, data);
        pos = m.end;
    }
    if pos < text.len() {
        plan.literal(&text[pos..], None);
    }
    plan
}

/// Placeholders are found in the concatenated run text so that a token
/// fragmented over several runs still resolves. The substituted text takes
/// the style of the run holding the opening brace; fragments of later runs
/// that belong to the token are consumed.
fn plan_from_runs(runs: &[RunSnapshot], joined: &str, data: &DataMap) -> SegmentPlan {
    let matches: Vec<PlaceholderMatch<'_>> = scan(joined).collect();
    let mut plan = SegmentPlan::default();
    let mut next = 0usize;
    let mut run_start = 0usize;

    for run in runs {
        let Some(text) = run.text.as_deref() else {
            continue;
        };
        let style = Some(&run.style);
        let (rs, re) = (run_start, run_start + text.len());
        run_start = re;

        if rs == re {
            plan.literal("", style);
            continue;
        }

        let mut pos = rs;
        while pos < re {
            while next < matches.len() && matches[next].end <= pos {
                next += 1;
            }
            match matches.get(next) {
                Some(m) if m.start < re => {
                    if m.start > pos {
                        plan.literal(&joined[pos..m.start], style);
                        pos = m.start;
                        continue;
                    }
                    if m.start == pos {
                        plan.placeholder(m, style, data);
                    }
                    pos = m.end.min(re);
                }
                _ => {
                    plan.literal(&joined[pos..re], style);
                    pos = re;
                }
            }
        }
    }
    plan
}

/// Final style of a fresh run. Untouched text keeps its own style verbatim.
/// Substituted text takes bold/italic from the override, the override's font
/// family when set (else the original's), and everything else from the
/// original run.
pub fn resolve_style(segment: &Segment, overrides: &StyleOverride) -> StyleDescriptor {
    let base = segment.style.clone().unwrap_or_default();
    if !segment.substituted {
        return base;
    }
    let font_family = overrides
        .preferred_font_family()
        .map(str::to_string)
        .or_else(|| base.font_family.clone());
    StyleDescriptor {
        bold: overrides.force_bold,
        italic: overrides.force_italic,
        font_family,
        ..base
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub runs_before: usize,
    pub runs_after: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Substitutes placeholders in `para`. Returns `None`, with the paragraph
/// untouched, when there is nothing to do.
pub fn rebuild_paragraph(
    para: &mut Paragraph,
    data: &DataMap,
    overrides: &StyleOverride,
) -> Option<RebuildStats> {
    let runs: Vec<RunSnapshot> = para.runs().map(RunSnapshot::of).collect();
    let flattened = para.text();
    let plan = plan_segments(&runs, &flattened, data)?;

    log::debug!(
        "rebuild paragraph: {:?} -> {:?} ({} runs -> {} runs)",
        flattened,
        plan.text(),
        runs.len(),
        plan.segments.len()
    );

    let fresh: Vec<Run> = plan
        .segments
        .iter()
        .map(|s| Run::new(&s.text, &resolve_style(s, overrides)))
        .collect();
    let runs_after = fresh.len();
    if runs.is_empty() {
        para.replace_text(fresh);
    } else {
        para.replace_runs(fresh);
    }

    Some(RebuildStats {
        runs_before: runs.len(),
        runs_after,
        resolved: plan.resolved,
        unresolved: plan.unresolved,
    })
}
