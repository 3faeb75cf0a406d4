//! Document loading for URLs and uploaded files.
//!
//! Maps heterogeneous inputs (a URL, or a filename plus raw bytes) to
//! [`LoadedDocument`]s with a `source` identifier. Format handling is
//! delegated: HTML goes through `html2text`, PDFs through `pdf-extract`,
//! Word documents through ZIP + `word/document.xml` parsing, and `.txt`
//! through strict UTF-8 decoding. Unknown extensions get a best-effort pass
//! over those same extractors.
//!
//! File bytes are staged to a private temporary file for the duration of
//! extraction; the file is removed when the guard drops, success or not.

use std::io::Read;
use std::io::Write;
use std::time::Duration;

use crate::models::{LoadedDocument, RawFile};

/// Loading error for one URL or file. A single item failing never aborts the
/// batch; the pipeline records the error and moves on.
#[derive(Debug)]
pub enum LoadError {
    Fetch(String),
    ContentType(String),
    Pdf(String),
    Docx(String),
    Utf8(String),
    Unsupported(String),
    Io(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch(e) => write!(f, "fetch failed: {}", e),
            LoadError::ContentType(ct) => write!(f, "unsupported content-type: {}", ct),
            LoadError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            LoadError::Docx(e) => write!(f, "Word extraction failed: {}", e),
            LoadError::Utf8(e) => write!(f, "text decoding failed: {}", e),
            LoadError::Unsupported(name) => {
                write!(f, "no extractor could read '{}'", name)
            }
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// Build the HTTP client used for URL loading.
pub fn http_client() -> Result<reqwest::Client, LoadError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| LoadError::Fetch(e.to_string()))
}

/// Fetch one URL and extract readable text from it.
///
/// Requires a 2xx response and an HTML or plain-text content type. HTML is
/// rendered to text; plain text is taken as is. The URL itself becomes the
/// document's `source`.
pub async fn load_url(
    client: &reqwest::Client,
    url: &str,
) -> Result<LoadedDocument, LoadError> {
    let response = client
        .get(url)
        .header("User-Agent", concat!("inquest/", env!("CARGO_PKG_VERSION")))
        .send()
        .await
        .map_err(|e| LoadError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Fetch(format!("HTTP {} for {}", status, url)));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .text()
        .await
        .map_err(|e| LoadError::Fetch(e.to_string()))?;

    let text = if content_type.contains("text/html") || content_type.contains("application/xhtml")
    {
        html2text::from_read(body.as_bytes(), 80)
    } else if content_type.contains("text/") || content_type.is_empty() {
        body
    } else {
        return Err(LoadError::ContentType(content_type));
    };

    Ok(LoadedDocument {
        source: url.to_string(),
        text,
    })
}

/// Extract text from one uploaded file, dispatching on its extension.
///
/// `.pdf` and `.docx`/`.doc` go to their dedicated extractors; `.txt` is
/// strict UTF-8. Any other extension gets a best-effort pass: UTF-8 text
/// first, then PDF, then Word. The original filename becomes `source`.
pub fn load_file(file: &RawFile) -> Result<Vec<LoadedDocument>, LoadError> {
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let staged = stage_bytes(&file.bytes)?;

    let text = match extension.as_str() {
        "pdf" => extract_pdf(staged.path())?,
        "docx" | "doc" => extract_docx(&file.bytes)?,
        "txt" => String::from_utf8(file.bytes.clone())
            .map_err(|e| LoadError::Utf8(e.to_string()))?,
        _ => extract_best_effort(file, staged.path())?,
    };

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![LoadedDocument {
        source: file.name.clone(),
        text,
    }])
}

/// Write bytes to a private temporary file for extractors that read paths.
/// The file is deleted when the returned guard drops.
fn stage_bytes(bytes: &[u8]) -> Result<tempfile::NamedTempFile, LoadError> {
    let mut tmp = tempfile::NamedTempFile::new().map_err(|e| LoadError::Io(e.to_string()))?;
    tmp.write_all(bytes)
        .map_err(|e| LoadError::Io(e.to_string()))?;
    tmp.flush().map_err(|e| LoadError::Io(e.to_string()))?;
    Ok(tmp)
}

fn extract_pdf(path: &std::path::Path) -> Result<String, LoadError> {
    pdf_extract::extract_text(path).map_err(|e| LoadError::Pdf(e.to_string()))
}

/// Pull the text runs (`<w:t>` elements) out of a DOCX archive.
fn extract_docx(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| LoadError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| LoadError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| LoadError::Docx(e.to_string()))?;
    }
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(LoadError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    extract_w_t_elements(&doc_xml)
}

/// Maximum decompressed bytes read from a ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

fn extract_w_t_elements(xml: &[u8]) -> Result<String, LoadError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                } else if name.as_ref() == b"p" && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(LoadError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Best-effort extraction for unknown extensions: valid UTF-8 is taken as
/// plain text, otherwise the PDF and Word extractors are tried in turn.
fn extract_best_effort(file: &RawFile, path: &std::path::Path) -> Result<String, LoadError> {
    if let Ok(text) = std::str::from_utf8(&file.bytes) {
        return Ok(text.to_string());
    }
    if let Ok(text) = extract_pdf(path) {
        return Ok(text);
    }
    if let Ok(text) = extract_docx(&file.bytes) {
        return Ok(text);
    }
    Err(LoadError::Unsupported(file.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, bytes: &[u8]) -> RawFile {
        RawFile {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_txt_file_loads_as_utf8() {
        let docs = load_file(&raw("notes.txt", "Some plain notes.".as_bytes())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "notes.txt");
        assert_eq!(docs[0].text, "Some plain notes.");
    }

    #[test]
    fn test_txt_rejects_invalid_utf8() {
        let err = load_file(&raw("junk.txt", &[0xff, 0xfe, 0x00, 0x80])).unwrap_err();
        assert!(matches!(err, LoadError::Utf8(_)));
    }

    #[test]
    fn test_empty_txt_yields_no_documents() {
        let docs = load_file(&raw("blank.txt", b"   \n  ")).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_invalid_pdf_errors() {
        let err = load_file(&raw("broken.pdf", b"not a pdf")).unwrap_err();
        assert!(matches!(err, LoadError::Pdf(_)));
    }

    #[test]
    fn test_invalid_docx_errors() {
        let err = load_file(&raw("broken.docx", b"not a zip")).unwrap_err();
        assert!(matches!(err, LoadError::Docx(_)));
    }

    #[test]
    fn test_unknown_extension_falls_back_to_text() {
        let docs = load_file(&raw("readme.unknown", b"Readable content here")).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Readable content here");
    }

    #[test]
    fn test_unknown_binary_is_unsupported() {
        let err = load_file(&raw("image.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let docs = load_file(&raw("NOTES.TXT", b"Upper case extension")).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_docx_extraction_from_minimal_archive() {
        // Build a minimal DOCX-shaped archive in memory.
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options: zip::write::SimpleFileOptions = Default::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body><w:p><w:r><w:t>Hello from Word.</w:t></w:r></w:p></w:body>
</w:document>"#,
                )
                .unwrap();
            writer.finish().unwrap();
        }
        let bytes = cursor.into_inner();

        let docs = load_file(&raw("memo.docx", &bytes)).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.contains("Hello from Word."));
    }
}
