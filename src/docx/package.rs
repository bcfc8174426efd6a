use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Every entry of a zipped-XML document, kept in archive order so that
/// untouched parts are written back byte-for-byte.
pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        Self::from_reader(f).with_context(|| format!("read docx: {}", path.display()))
    }

    pub fn from_reader<R: Read + std::io::Seek>(reader: R) -> anyhow::Result<Self> {
        let mut zip = ZipArchive::new(reader).context("read zip")?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Header and footer parts, in archive order.
    pub fn header_footer_entries(&self) -> (Vec<&DocxEntry>, Vec<&DocxEntry>) {
        let is_part = |e: &&DocxEntry, prefix: &str| {
            let lower = e.name.to_lowercase();
            lower.starts_with(prefix) && lower.ends_with(".xml")
        };
        let headers = self
            .entries
            .iter()
            .filter(|e| is_part(e, "word/header"))
            .collect();
        let footers = self
            .entries
            .iter()
            .filter(|e| is_part(e, "word/footer"))
            .collect();
        (headers, footers)
    }

    /// Serializes the whole archive in memory, substituting the data of any
    /// entry named in `replacements`.
    pub fn to_bytes_with_replacements(
        &self,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<Vec<u8>> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for ent in &self.entries {
            let data = replacements.get(&ent.name).unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(&ent.name, opts)
                    .with_context(|| format!("add zip dir: {}", ent.name))?;
            } else {
                zout.start_file(&ent.name, opts)
                    .with_context(|| format!("start zip file: {}", ent.name))?;
                zout.write_all(data)
                    .with_context(|| format!("write zip file: {}", ent.name))?;
            }
        }
        let cursor = zout.finish().context("finish zip")?;
        Ok(cursor.into_inner())
    }

    pub fn write_with_replacements(
        &self,
        output_path: &Path,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<()> {
        let bytes = self.to_bytes_with_replacements(replacements)?;
        let mut f = File::create(output_path)
            .with_context(|| format!("create output docx: {}", output_path.display()))?;
        f.write_all(&bytes)
            .with_context(|| format!("write output docx: {}", output_path.display()))?;
        f.flush()
            .with_context(|| format!("flush output docx: {}", output_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::DocxPackage;

    fn sample_zip() -> Vec<u8> {
        let mut z = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        z.start_file("[Content_Types].xml", opts).expect("start");
        z.write_all(b"<Types/>").expect("write");
        z.start_file("word/document.xml", opts).expect("start");
        z.write_all(b"<w:document/>").expect("write");
        z.start_file("word/header1.xml", opts).expect("start");
        z.write_all(b"<w:hdr/>").expect("write");
        z.finish().expect("finish").into_inner()
    }

    #[test]
    fn replacement_only_touches_named_entry() {
        let pkg = DocxPackage::from_reader(Cursor::new(sample_zip())).expect("read");
        let mut repl = HashMap::new();
        repl.insert("word/document.xml".to_string(), b"<w:new/>".to_vec());
        let bytes = pkg.to_bytes_with_replacements(&repl).expect("write");

        let back = DocxPackage::from_reader(Cursor::new(bytes)).expect("reread");
        let names: Vec<&str> = back.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "word/document.xml", "word/header1.xml"]
        );
        assert_eq!(back.entry("word/document.xml").expect("doc").data, b"<w:new/>");
        assert_eq!(back.entry("[Content_Types].xml").expect("ct").data, b"<Types/>");
    }

    #[test]
    fn headers_are_found_by_name() {
        let pkg = DocxPackage::from_reader(Cursor::new(sample_zip())).expect("read");
        let (headers, footers) = pkg.header_footer_entries();
        assert_eq!(headers.len(), 1);
        assert!(footers.is_empty());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(DocxPackage::from_reader(Cursor::new(b"not a zip".to_vec())).is_err());
    }
}
