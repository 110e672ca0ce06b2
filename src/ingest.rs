//! Plain-text extraction from uploaded documents.
//!
//! Only the text is kept: no tables, styles or layout.

use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("DOCX error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("DOCX error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Supported document kinds, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "" => Err(IngestError::Unsupported("(no extension)".into())),
            _ => Err(IngestError::Unsupported(format!(".{ext}"))),
        }
    }
}

/// File suffixes offered by the upload dialog. GTK matches these
/// case-insensitively, like `from_path` does.
pub const SUFFIXES: [&str; 3] = ["txt", "docx", "pdf"];

/// Extract the plain text of a `.txt`, `.pdf` or `.docx` file.
pub fn extract_text(path: &Path) -> Result<String, IngestError> {
    let kind = DocumentKind::from_path(path)?;
    log::info!("Extracting {kind:?} text from {}", path.display());
    match kind {
        DocumentKind::Text => Ok(fs::read_to_string(path)?),
        DocumentKind::Pdf => extract_pdf(path),
        DocumentKind::Docx => extract_docx(path),
    }
}

/// Text of every page followed by a newline. Pages that fail are skipped.
fn extract_pdf(path: &Path) -> Result<String, IngestError> {
    let doc = lopdf::Document::load(path)?;
    let mut text = String::new();
    for page in doc.get_pages().keys() {
        match doc.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => log::warn!("Skipping PDF page {page}: {e}"),
        }
    }
    Ok(text)
}

fn extract_docx(path: &Path) -> Result<String, IngestError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
    docx_paragraphs(&xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Collect the text runs of each `w:p` element in `word/document.xml`.
///
/// Paragraphs nested in text boxes come out before the paragraph that holds
/// them. `w:tab`/`w:br` only count inside a run; the ones in `w:pPr` are
/// tab-stop definitions.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut props_depth = 0usize;
    let mut in_text = false;

    loop {
        let in_run = run_depth > 0 && props_depth == 0;
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:r" => run_depth += 1,
                b"w:pPr" | b"w:rPr" | b"w:sectPr" => props_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                let ch = match e.name().as_ref() {
                    b"w:p" => {
                        paragraphs.push(String::new());
                        None
                    }
                    b"w:tab" if in_run => Some('\t'),
                    b"w:br" | b"w:cr" if in_run => Some('\n'),
                    _ => None,
                };
                if let (Some(ch), Some(current)) = (ch, open.last_mut()) {
                    current.push(ch);
                }
            }
            Event::Text(t) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.push_str(&t.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:pPr" | b"w:rPr" | b"w:sectPr" => {
                    props_depth = props_depth.saturating_sub(1)
                }
                b"w:p" => paragraphs.extend(open.pop()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t xml:space="preserve">Revenue </w:t></w:r><w:r><w:t>&amp; costs</w:t><w:tab/><w:t>up</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn write_docx(dir: &Path, xml: &str) -> std::path::PathBuf {
        let path = dir.join("report.docx");
        let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    #[test]
    fn txt_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        let content = "line one\nline two — ünïcode\n\n";
        fs::write(&path, content).unwrap();

        assert_eq!(extract_text(&path).unwrap(), content);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        fs::write(&path, b"whatever").unwrap();

        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, IngestError::Unsupported(ref ext) if ext == ".xlsx"));
        assert_eq!(err.to_string(), "Unsupported: .xlsx");

        let err = extract_text(Path::new("Makefile")).unwrap_err();
        assert!(matches!(err, IngestError::Unsupported(ref ext) if ext == "(no extension)"));
    }

    #[test]
    fn missing_txt_is_an_io_error() {
        let err = extract_text(Path::new("/nonexistent/dir/file.txt")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn docx_paragraphs_are_joined_by_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), DOCUMENT_XML);

        assert_eq!(
            extract_text(&path).unwrap(),
            "Quarterly report\n\nRevenue & costs\tup"
        );
    }

    #[test]
    fn docx_tab_stops_are_not_text() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Heading</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Name</w:t><w:tab/><w:t>Page</w:t><w:br/><w:t>next</w:t></w:r></w:p>
</w:body></w:document>"#;
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), xml);

        assert_eq!(extract_text(&path).unwrap(), "Heading\nName\tPage\nnext");
    }

    #[test]
    fn docx_text_box_keeps_outer_paragraph() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:v="urn:schemas-microsoft-com:vml"><w:body>
<w:p><w:r><w:t xml:space="preserve">Before </w:t></w:r><w:r><w:pict><v:textbox><w:txbxContent><w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></v:textbox></w:pict></w:r><w:r><w:t>after</w:t></w:r></w:p>
</w:body></w:document>"#;

        assert_eq!(docx_paragraphs(xml).unwrap(), ["Boxed", "Before after"]);
    }

    #[test]
    fn upper_case_suffixes_are_recognised() {
        for suffix in SUFFIXES {
            let name = format!("REPORT.{}", suffix.to_uppercase());
            assert!(DocumentKind::from_path(Path::new(&name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn docx_without_document_part_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
        zip.finish().unwrap();

        assert!(matches!(extract_text(&path), Err(IngestError::Zip(_))));
    }

    #[test]
    fn corrupt_pdf_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        assert!(matches!(extract_text(&path), Err(IngestError::Pdf(_))));
    }
}
