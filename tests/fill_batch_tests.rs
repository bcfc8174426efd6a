use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use docx_filler::batch::{count_templates, BatchStatus, NO_TEMPLATES_MESSAGE};
use docx_filler::docx::document::DocxDocument;
use docx_filler::docx::style::StyleDescriptor;
use docx_filler::preview::try_extract_text;
use docx_filler::{
    fill_batch, fill_batch_with_observer, fill_document, BatchError, BatchRequest, DataMap,
    FillError, StyleOverride,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults/></w:styles>"#;

fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn write_docx(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut z = ZipWriter::new(fs::File::create(path).unwrap());
    let opts = SimpleFileOptions::default();
    z.start_file("[Content_Types].xml", opts).unwrap();
    z.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    z.start_file("word/document.xml", opts).unwrap();
    z.write_all(document_xml(body).as_bytes()).unwrap();
    z.start_file("word/styles.xml", opts).unwrap();
    z.write_all(STYLES_XML.as_bytes()).unwrap();
    z.finish().unwrap();
}

fn read_entry(path: &Path, name: &str) -> String {
    let mut zip = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

fn run(text: &str, rpr: &str) -> String {
    format!(r#"<w:r><w:rPr>{rpr}</w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

fn para(runs: &[String]) -> String {
    format!("<w:p>{}</w:p>", runs.concat())
}

fn data(pairs: &[(&str, &str)]) -> DataMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// (text, style) of every run, per paragraph, in fill order.
fn runs_of(path: &Path) -> Vec<Vec<(String, StyleDescriptor)>> {
    let mut doc = DocxDocument::open(path).unwrap();
    let mut out = Vec::new();
    doc.edit_paragraphs(|_, p| {
        out.push(
            p.runs()
                .map(|r| (r.text().unwrap_or_default().to_string(), r.style()))
                .collect(),
        );
        false
    })
    .unwrap();
    out
}

fn request(src: &Path, out: &Path, name: Option<&str>) -> BatchRequest {
    BatchRequest {
        source_dir: src.to_path_buf(),
        output_dir: out.to_path_buf(),
        output_name: name.map(str::to_string),
        data: data(&[("object_desc", "Bridge 7")]),
        style: StyleOverride::default(),
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn scenario_fills_known_key_and_keeps_unknown() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    write_docx(&input, &para(&[run("Project: {object_desc}, Code: {code}", "<w:b/>")]));
    let before = fs::read(&input)?;

    let report = fill_document(
        &input,
        &output,
        &data(&[("object_desc", "Bridge 7")]),
        &StyleOverride::default(),
    )?;
    assert_eq!(report.paragraphs_rebuilt, 1);
    assert_eq!(report.placeholders_resolved, 1);
    assert_eq!(report.placeholders_unresolved, 1);

    assert_eq!(try_extract_text(&output)?, "Project: Bridge 7, Code: {code}\n");
    assert_eq!(fs::read(&input)?, before);
    assert_eq!(read_entry(&output, "word/styles.xml"), STYLES_XML);
    Ok(())
}

#[test]
fn paragraphs_without_placeholders_are_byte_identical() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    let untouched = format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>{}{}</w:p>"#,
        run("Plain ", r#"<w:b/><w:sz w:val="32"/>"#),
        run("heading &amp; more", r#"<w:i/><w:color w:val="1F4E79"/>"#)
    );
    let body = format!("{untouched}{}", para(&[run("{object_desc}", "")]));
    write_docx(&input, &body);

    fill_document(
        &input,
        &output,
        &data(&[("object_desc", "x")]),
        &StyleOverride::default(),
    )?;
    assert!(read_entry(&output, "word/document.xml").contains(&untouched));
    Ok(())
}

#[test]
fn split_placeholders_in_table_cells_resolve() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    let cell_a = para(&[run("{object_", "<w:b/>"), run("name_1}", "<w:i/>")]);
    let cell_b = para(&[run("SR: { sr_num_1 } / {missing}", "")]);
    let body = format!(
        "{}<w:tbl><w:tblPr/><w:tr><w:tc>{cell_a}</w:tc><w:tc>{cell_b}</w:tc></w:tr></w:tbl>",
        para(&[run("Heading", "")])
    );
    write_docx(&input, &body);

    let report = fill_document(
        &input,
        &output,
        &data(&[("object_name_1", "Span A"), ("sr_num_1", "001")]),
        &StyleOverride::default(),
    )?;
    assert_eq!(report.paragraphs, 3);
    assert_eq!(report.table_paragraphs, 2);
    assert_eq!(report.paragraphs_rebuilt, 2);

    let text = try_extract_text(&output)?;
    assert_eq!(text, "Heading\nSpan A\tSR: 001 / {missing}\n");
    assert!(!text.contains("{object_name_1}"));
    assert!(!text.contains("sr_num_1"));
    Ok(())
}

#[test]
fn content_control_placeholder_is_filled_once() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    write_docx(
        &input,
        r#"<w:p><w:sdt><w:sdtPr><w:alias w:val="Object"/></w:sdtPr><w:sdtContent><w:r><w:t>Object: {object_desc}</w:t></w:r></w:sdtContent></w:sdt></w:p>"#,
    );

    let report = fill_document(
        &input,
        &output,
        &data(&[("object_desc", "Bridge 7")]),
        &StyleOverride::default(),
    )?;
    assert_eq!(report.paragraphs_rebuilt, 1);
    assert_eq!(try_extract_text(&output)?, "Object: Bridge 7\n");
    assert!(!read_entry(&output, "word/document.xml").contains("{object_desc}"));
    Ok(())
}

#[test]
fn overrides_touch_only_substituted_text() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    let rpr = r#"<w:rFonts w:ascii="Arial" w:hAnsi="Arial"/><w:b/><w:color w:val="FF0000"/><w:sz w:val="28"/><w:u w:val="single"/>"#;
    write_docx(&input, &para(&[run("Name: {object_desc}.", rpr)]));

    let overrides = StyleOverride {
        force_bold: false,
        force_italic: true,
        font_family: Some("Times New Roman".into()),
    };
    fill_document(&input, &output, &data(&[("object_desc", "Bridge 7")]), &overrides)?;

    let paragraphs = runs_of(&output);
    let runs = &paragraphs[0];
    let texts: Vec<&str> = runs.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["Name: ", "Bridge 7", "."]);

    for literal in [&runs[0].1, &runs[2].1] {
        assert!(literal.bold);
        assert!(!literal.italic);
        assert_eq!(literal.font_family.as_deref(), Some("Arial"));
    }
    let sub = &runs[1].1;
    assert!(!sub.bold);
    assert!(sub.italic);
    assert_eq!(sub.font_family.as_deref(), Some("Times New Roman"));
    assert_eq!(sub.font_size, Some(14.0));
    assert_eq!(sub.color.as_deref(), Some("FF0000"));
    assert_eq!(sub.underline.as_str(), "single");
    Ok(())
}

#[test]
fn unreadable_input_writes_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("broken.docx");
    let output = dir.path().join("out.docx");
    fs::write(&input, b"definitely not a zip")?;

    let err = fill_document(&input, &output, &DataMap::new(), &StyleOverride::default())
        .unwrap_err();
    assert!(matches!(err, FillError::Read { .. }), "{err}");
    assert!(!output.exists());
    Ok(())
}

#[test]
fn unwritable_output_is_a_write_error() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.docx");
    write_docx(&input, &para(&[run("{object_desc}", "")]));
    let output = dir.path().join("no-such-folder").join("out.docx");

    let err = fill_document(&input, &output, &DataMap::new(), &StyleOverride::default())
        .unwrap_err();
    assert!(matches!(err, FillError::Write { .. }), "{err}");
    Ok(())
}

#[test]
fn one_corrupt_template_does_not_stop_the_batch() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("a.docx"), &para(&[run("{object_desc}", "")]));
    fs::create_dir_all(&src)?;
    fs::write(src.join("b.docx"), b"corrupt")?;
    write_docx(&src.join("c.docx"), &para(&[run("{object_desc}", "")]));

    let mut seen = Vec::new();
    let summary = fill_batch_with_observer(&request(&src, &out, None), |o| {
        seen.push((o.source.clone(), o.is_success()))
    })?;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].starts_with("b.docx: "), "{}", summary.failures[0]);
    assert_eq!(
        seen,
        vec![
            (PathBuf::from("a.docx"), true),
            (PathBuf::from("b.docx"), false),
            (PathBuf::from("c.docx"), true),
        ]
    );
    assert_eq!(try_extract_text(&out.join("c.docx"))?, "Bridge 7\n");
    match summary.status() {
        BatchStatus::Filled { message, .. } => {
            assert!(message.starts_with("2 document(s) filled.\nFailed files:\n - b.docx: "))
        }
        other => panic!("unexpected status: {other:?}"),
    }
    Ok(())
}

#[test]
fn override_name_is_claimed_once() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    for name in ["a.docx", "b.docx", "c.docx"] {
        write_docx(&src.join(name), &para(&[run("{object_desc}", "")]));
    }

    let summary = fill_batch(&request(&src, &out, Some(" Report ")))?;
    assert_eq!(summary.succeeded, 3);
    let names = file_names(&out);
    assert_eq!(names.iter().filter(|n| *n == "Report.docx").count(), 1);
    assert_eq!(names.len(), 3);
    assert_eq!(summary.first_success, Some(out.join("Report.docx")));
    Ok(())
}

#[test]
fn subfolders_are_mirrored_and_never_claim_the_override() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("A").join("b.docx"), &para(&[run("{object_desc}", "")]));
    write_docx(&src.join("A").join("deep").join("C.DOCX"), &para(&[run("x", "")]));
    fs::create_dir_all(src.join("empty"))?;
    fs::write(src.join("A").join("notes.txt"), "skip me")?;

    let summary = fill_batch(&request(&src, &out, Some("Report.docx")))?;
    assert_eq!(summary.succeeded, 2);
    assert!(out.join("A").join("b.docx").is_file());
    assert!(out.join("A").join("deep").join("C.DOCX").is_file());
    assert!(out.join("empty").is_dir());
    assert!(!out.join("A").join("notes.txt").exists());
    assert!(!out.join("Report.docx").exists());
    assert!(!out.join("A").join("Report.docx").exists());
    assert_eq!(try_extract_text(&out.join("A").join("b.docx"))?, "Bridge 7\n");
    Ok(())
}

#[test]
fn lock_files_are_neither_filled_nor_failed() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("a.docx"), &para(&[run("{object_desc}", "")]));
    fs::write(src.join("~$a.docx"), b"owner file")?;

    assert_eq!(count_templates(&src, None), 1);
    let summary = fill_batch(&request(&src, &out, None))?;
    assert_eq!(summary.succeeded, 1);
    assert!(summary.failures.is_empty());
    assert_eq!(file_names(&out), vec!["a.docx".to_string()]);
    Ok(())
}

#[test]
fn folders_with_lock_prefix_are_still_walked() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("~$drafts").join("d.docx"), &para(&[run("{object_desc}", "")]));

    assert_eq!(count_templates(&src, None), 1);
    let summary = fill_batch(&request(&src, &out, None))?;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(try_extract_text(&out.join("~$drafts").join("d.docx"))?, "Bridge 7\n");
    Ok(())
}

#[test]
fn output_folder_inside_source_is_not_walked() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = src.join("out");
    write_docx(&src.join("a.docx"), &para(&[run("{object_desc}", "")]));
    write_docx(&src.join("B").join("c.docx"), &para(&[run("{object_desc}", "")]));

    for _ in 0..2 {
        let summary = fill_batch(&request(&src, &out, None))?;
        assert_eq!(summary.succeeded, 2);
        assert!(summary.failures.is_empty());
    }
    assert_eq!(file_names(&out), vec!["B".to_string(), "a.docx".to_string()]);
    assert_eq!(file_names(&out.join("B")), vec!["c.docx".to_string()]);
    assert_eq!(count_templates(&src, Some(&out)), 2);
    Ok(())
}

#[test]
fn override_name_cannot_leave_the_output_folder() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("a.docx"), &para(&[run("{object_desc}", "")]));

    for name in ["../escaped", "nested/Report"] {
        let err = fill_batch(&request(&src, &out, Some(name))).unwrap_err();
        assert!(matches!(err, BatchError::InvalidOutputName(_)), "{name}: {err}");
    }
    assert!(!dir.path().join("escaped.docx").exists());
    assert!(!out.exists());
    Ok(())
}

#[test]
fn unmirrorable_subfolder_is_a_failure_not_a_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("A").join("b.docx"), &para(&[run("x", "")]));
    write_docx(&src.join("z.docx"), &para(&[run("x", "")]));
    fs::create_dir_all(&out)?;
    fs::write(out.join("A"), b"a file where a folder should go")?;

    let summary = fill_batch(&request(&src, &out, None))?;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].starts_with("A: "));
    assert!(out.join("z.docx").is_file());
    Ok(())
}

#[test]
fn empty_source_reports_no_templates() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    fs::create_dir_all(&src)?;
    fs::write(src.join("readme.md"), "no templates here")?;

    let summary = fill_batch(&request(&src, &dir.path().join("filled"), None))?;
    assert_eq!(summary.status(), BatchStatus::NoTemplates);
    assert_eq!(summary.preview_text(), NO_TEMPLATES_MESSAGE);
    Ok(())
}

#[test]
fn all_failed_is_distinguished_from_empty() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    fs::create_dir_all(&src)?;
    fs::write(src.join("bad.docx"), b"corrupt")?;

    let summary = fill_batch(&request(&src, &dir.path().join("filled"), None))?;
    let status = summary.status();
    assert!(status.is_failure());
    assert!(summary.preview_text().contains(" - bad.docx: "));
    Ok(())
}

#[test]
fn preflight_rejects_bad_roots() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");

    let err = fill_batch(&request(&src, &out, None)).unwrap_err();
    assert!(matches!(err, BatchError::SourceMissing(_)));

    fs::write(&src, b"file")?;
    let err = fill_batch(&request(&src, &out, None)).unwrap_err();
    assert!(matches!(err, BatchError::SourceNotDirectory(_)));

    fs::remove_file(&src)?;
    fs::create_dir_all(&src)?;
    fs::write(&out, b"file")?;
    let err = fill_batch(&request(&src, &out, None)).unwrap_err();
    assert!(matches!(err, BatchError::OutputNotDirectory(_)));

    let fresh = dir.path().join("new").join("nested");
    fill_batch(&request(&src, &fresh, None))?;
    assert!(fresh.is_dir());
    Ok(())
}

#[test]
fn summary_serializes_to_json() -> Result<()> {
    let dir = TempDir::new()?;
    let src = dir.path().join("templates");
    let out = dir.path().join("filled");
    write_docx(&src.join("a.docx"), &para(&[run("{object_desc} {code}", "")]));

    let summary = fill_batch(&request(&src, &out, None))?;
    let json: HashMap<String, serde_json::Value> =
        serde_json::from_str(&serde_json::to_string(&summary)?)?;
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["files"][0]["report"]["placeholders_unresolved"], 1);
    Ok(())
}
