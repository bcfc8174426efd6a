//! Plain-text rendering of a document for preview.
//!
//! Layout follows the usual word-processor extractor: header parts, then the
//! body (paragraphs one per line, table cells separated by tabs and rows by
//! newlines), then footer parts.

use std::path::Path;

use anyhow::Context;

use crate::docx::package::{DocxPackage, MAIN_DOCUMENT_PART};
use crate::docx::paragraph::Paragraph;
use crate::docx::xml::{matching_end, parse_xml_part, XmlEvent};

/// Prefix of the message returned instead of text when extraction fails.
pub const PREVIEW_UNAVAILABLE: &str = "Preview unavailable";

/// Flattened text of the document at `path`. Never fails: any error becomes a
/// message starting with [`PREVIEW_UNAVAILABLE`].
pub fn extract_preview_text(path: &Path) -> String {
    match try_extract_text(path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("preview of {} failed: {err:#}", path.display());
            format!("{PREVIEW_UNAVAILABLE}: {err:#}")
        }
    }
}

pub fn try_extract_text(path: &Path) -> anyhow::Result<String> {
    let package = DocxPackage::read(path)?;
    let main = package
        .entry(MAIN_DOCUMENT_PART)
        .with_context(|| format!("missing part: {MAIN_DOCUMENT_PART}"))?;

    let mut out = String::new();
    let (headers, footers) = package.header_footer_entries();
    for entry in &headers {
        part_text(&entry.name, &entry.data, &mut out)?;
    }
    part_text(&main.name, &main.data, &mut out)?;
    for entry in &footers {
        part_text(&entry.name, &entry.data, &mut out)?;
    }
    Ok(out)
}

fn part_text(name: &str, data: &[u8], out: &mut String) -> anyhow::Result<()> {
    let part = parse_xml_part(name, data).with_context(|| format!("parse xml: {name}"))?;
    let Some(root_start) = part
        .events
        .iter()
        .position(|ev| matches!(ev, XmlEvent::Start { .. }))
    else {
        return Ok(());
    };
    let root_end =
        matching_end(&part.events, root_start).with_context(|| format!("unbalanced xml: {name}"))?;
    let root = &part.events[root_start..=root_end];

    // w:document wraps its content in w:body; w:hdr / w:ftr hold it directly.
    let container = if root[0].is_start_of("w:document") {
        child_elements(root)
            .into_iter()
            .find(|c| c[0].is_start_of("w:body"))
    } else {
        Some(root)
    };
    if let Some(container) = container {
        block_text(container, out)?;
    }
    Ok(())
}

/// Text of the block-level children (paragraphs, tables, content controls)
/// of one container element.
fn block_text(container: &[XmlEvent], out: &mut String) -> anyhow::Result<()> {
    for child in child_elements(container) {
        match child[0].element_name() {
            Some("w:p") if child.len() == 1 => out.push('\n'),
            Some("w:p") => {
                let para = Paragraph::from_events(child)?;
                out.push_str(&para.text());
                out.push('\n');
            }
            Some("w:tbl") => table_text(child, out)?,
            Some("w:sdt") => {
                for inner in child_elements(child) {
                    if inner[0].is_start_of("w:sdtContent") {
                        block_text(inner, out)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn table_text(table: &[XmlEvent], out: &mut String) -> anyhow::Result<()> {
    for row in child_elements(table) {
        if !row[0].is_start_of("w:tr") {
            continue;
        }
        let mut cells: Vec<String> = Vec::new();
        for cell in child_elements(row) {
            if !cell[0].is_start_of("w:tc") {
                continue;
            }
            let mut text = String::new();
            block_text(cell, &mut text)?;
            if text.ends_with('\n') {
                text.pop();
            }
            cells.push(text);
        }
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    Ok(())
}

/// Direct child elements of the element spanning `events`, each as its full
/// subtree slice.
fn child_elements(events: &[XmlEvent]) -> Vec<&[XmlEvent]> {
    let mut out = Vec::new();
    let last = events.len().saturating_sub(1);
    let mut i = 1usize;
    while i < last {
        match &events[i] {
            XmlEvent::Start { .. } => match matching_end(events, i) {
                Some(end) => {
                    out.push(&events[i..=end]);
                    i = end + 1;
                }
                None => break,
            },
            XmlEvent::Empty { .. } => {
                out.push(&events[i..=i]);
                i += 1;
            }
            _ => i += 1,
        }
    }
    out
}
