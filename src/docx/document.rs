use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::docx::package::{DocxPackage, MAIN_DOCUMENT_PART};
use crate::docx::paragraph::Paragraph;
use crate::docx::xml::{matching_end, parse_xml_part, write_xml_part, XmlEvent, XmlPart};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParagraphContainer {
    Body,
    TableCell {
        table_index: usize,
        row_index: usize,
        cell_index: usize,
    },
}

/// Location of one editable paragraph inside the main document part.
#[derive(Clone, Copy, Debug)]
pub struct ParagraphSlot {
    pub container: ParagraphContainer,
    start: usize,
    end: usize,
}

/// An opened document: the package plus its parsed main part.
pub struct DocxDocument {
    package: DocxPackage,
    main: XmlPart,
}

impl DocxDocument {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let package = DocxPackage::read(path)?;
        Self::from_package(package).with_context(|| format!("load docx: {}", path.display()))
    }

    pub fn from_package(package: DocxPackage) -> anyhow::Result<Self> {
        let entry = package
            .entry(MAIN_DOCUMENT_PART)
            .with_context(|| format!("missing part: {MAIN_DOCUMENT_PART}"))?;
        let main = parse_xml_part(&entry.name, &entry.data)
            .with_context(|| format!("parse xml: {}", entry.name))?;
        Ok(Self { package, main })
    }

    /// Top-level body paragraphs in document order, followed by every
    /// paragraph directly inside a cell of a top-level table
    /// (table → row → cell → paragraph).
    pub fn paragraph_slots(&self) -> Vec<ParagraphSlot> {
        let events = &self.main.events;
        let mut body: Vec<ParagraphSlot> = Vec::new();
        let mut cells: Vec<ParagraphSlot> = Vec::new();

        let mut stack: Vec<&str> = Vec::new();
        let mut tbl_depth = 0usize;
        let mut in_top_table = false;
        let mut table_index = 0usize;
        let mut row_index = 0usize;
        let mut cell_index = 0usize;

        let mut idx = 0usize;
        while idx < events.len() {
            match &events[idx] {
                XmlEvent::Start { name, .. } => {
                    let parent = stack.last().copied().unwrap_or("");
                    match name.as_str() {
                        "w:tbl" => {
                            if parent == "w:body" && tbl_depth == 0 {
                                in_top_table = true;
                                table_index += 1;
                                row_index = 0;
                            }
                            tbl_depth += 1;
                        }
                        "w:tr" if in_top_table && tbl_depth == 1 && parent == "w:tbl" => {
                            row_index += 1;
                            cell_index = 0;
                        }
                        "w:tc" if in_top_table && tbl_depth == 1 && parent == "w:tr" => {
                            cell_index += 1;
                        }
                        "w:p" => {
                            let container = if parent == "w:body" && tbl_depth == 0 {
                                Some(ParagraphContainer::Body)
                            } else if in_top_table && parent == "w:tc" && tbl_depth == 1 {
                                Some(ParagraphContainer::TableCell {
                                    table_index: table_index.saturating_sub(1),
                                    row_index: row_index.saturating_sub(1),
                                    cell_index: cell_index.saturating_sub(1),
                                })
                            } else {
                                None
                            };
                            if let Some(container) = container {
                                if let Some(end) = matching_end(events, idx) {
                                    let slot = ParagraphSlot {
                                        container,
                                        start: idx,
                                        end,
                                    };
                                    match container {
                                        ParagraphContainer::Body => body.push(slot),
                                        ParagraphContainer::TableCell { .. } => cells.push(slot),
                                    }
                                    idx = end + 1;
                                    continue;
                                }
                            }
                        }
                        _ => {}
                    }
                    stack.push(name.as_str());
                }
                XmlEvent::End { name } => {
                    if name == "w:tbl" {
                        tbl_depth = tbl_depth.saturating_sub(1);
                        if tbl_depth == 0 {
                            in_top_table = false;
                        }
                    }
                    stack.pop();
                }
                _ => {}
            }
            idx += 1;
        }

        body.extend(cells);
        body
    }

    /// Hands every paragraph from [`Self::paragraph_slots`] to `edit`, in
    /// order. All paragraphs are read before any is written back; only those
    /// for which `edit` returns `true` are re-serialized.
    pub fn edit_paragraphs<F>(&mut self, mut edit: F) -> anyhow::Result<usize>
    where
        F: FnMut(&ParagraphSlot, &mut Paragraph) -> bool,
    {
        let mut rewritten: Vec<(ParagraphSlot, Vec<XmlEvent>)> = Vec::new();
        for slot in self.paragraph_slots() {
            let mut para = Paragraph::from_events(&self.main.events[slot.start..=slot.end])
                .with_context(|| format!("read paragraph at event {}", slot.start))?;
            if edit(&slot, &mut para) {
                rewritten.push((slot, para.to_events()));
            }
        }

        let changed = rewritten.len();
        rewritten.sort_by_key(|(slot, _)| std::cmp::Reverse(slot.start));
        for (slot, events) in rewritten {
            self.main.events.splice(slot.start..=slot.end, events);
        }
        Ok(changed)
    }

    fn replacements(&self) -> anyhow::Result<HashMap<String, Vec<u8>>> {
        let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
        let bytes = write_xml_part(&self.main)
            .with_context(|| format!("serialize xml: {}", self.main.name))?;
        replacements.insert(self.main.name.clone(), bytes);
        Ok(replacements)
    }

    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        self.package.to_bytes_with_replacements(&self.replacements()?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.package.write_with_replacements(path, &self.replacements()?)
    }
}
