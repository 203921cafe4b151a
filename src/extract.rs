//! Multi-format content extraction.
//!
//! Turns raw upload bytes into best-effort plain text. Dispatch is a single
//! decision over the resolved format: structured text is decoded with
//! charset detection, PDFs are read page by page, DOCX paragraphs are pulled
//! out of the OOXML archive, and anything else gets a best-effort decode
//! gated on a printable-character check.
//!
//! Extraction never fails: parser errors are converted into in-band
//! placeholder strings so ingestion proceeds with degraded content.

use std::io::Read;
use std::path::Path;

use crate::models::{ExtractedText, SourceFormat};
use crate::sniff;

/// Extensions always treated as structured text.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "json", "xml", "csv", "yml", "yaml", "md", "log", "ini", "cfg", "conf",
];

/// Structured MIME types that are text despite their `application/` prefix.
const TEXT_LIKE_MIMES: &[&str] = &["application/json", "application/xml", "text/xml"];

/// The minimal set of extensions accepted even when content is not
/// recognizably text.
const SUPPORTED_BINARY_EXTENSIONS: &[&str] = &["txt", "pdf", "docx"];

/// How many decoded characters the unknown-binary path inspects.
const BINARY_SAMPLE_CHARS: usize = 1000;

/// Minimum printable ratio for the unknown-binary path to accept a decode.
const BINARY_PRINTABLE_THRESHOLD: f64 = 0.8;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Internal extraction error; converted to a placeholder string at this
/// module's boundary, never surfaced to callers.
#[derive(Debug)]
enum ExtractError {
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

/// Lowercased extension of a filename, without the dot.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Whether a file may enter the pipeline at all.
///
/// Combines three independent signals — declared `text/*` MIME, known
/// text-like structured MIME, statistical sniff — with the minimal
/// supported binary extension set. Pure; safe to call before any I/O.
pub fn is_ingestible(bytes: &[u8], filename: &str, mime: &str) -> bool {
    if is_text_like(bytes, mime) {
        return true;
    }
    matches!(file_extension(filename).as_deref(), Some(ext) if SUPPORTED_BINARY_EXTENSIONS.contains(&ext))
}

/// Whether content is text by declaration or by sniffing.
pub fn is_text_like(bytes: &[u8], mime: &str) -> bool {
    mime.starts_with("text/") || TEXT_LIKE_MIMES.contains(&mime) || sniff::is_text(bytes)
}

/// Extract best-effort plain text from upload bytes.
pub fn extract(bytes: &[u8], filename: &str, mime: &str) -> ExtractedText {
    let extension = file_extension(filename);

    let declared_text = matches!(extension.as_deref(), Some(ext) if TEXT_EXTENSIONS.contains(&ext))
        || mime.starts_with("text/")
        || TEXT_LIKE_MIMES.contains(&mime);

    if declared_text {
        return ExtractedText {
            text: sniff::decode_lossy(bytes),
            format: SourceFormat::Text,
        };
    }

    match extension.as_deref() {
        Some("pdf") => match extract_pdf(bytes) {
            Ok(text) => ExtractedText {
                text,
                format: SourceFormat::Pdf,
            },
            Err(e) => ExtractedText {
                text: error_placeholder(filename, &e),
                format: SourceFormat::Pdf,
            },
        },
        Some("docx") => match extract_docx(bytes) {
            Ok(text) => ExtractedText {
                text,
                format: SourceFormat::Docx,
            },
            Err(e) => ExtractedText {
                text: error_placeholder(filename, &e),
                format: SourceFormat::Docx,
            },
        },
        _ => extract_unknown(bytes, filename),
    }
}

/// Best-effort decode for unknown binary-leaning types. Accepted only when
/// the head of the decoded text is mostly printable.
fn extract_unknown(bytes: &[u8], filename: &str) -> ExtractedText {
    let text = sniff::decode_lossy(bytes);
    let sample: String = text.chars().take(BINARY_SAMPLE_CHARS).collect();

    if sniff::printable_ratio(&sample) > BINARY_PRINTABLE_THRESHOLD {
        ExtractedText {
            text,
            format: SourceFormat::Text,
        }
    } else {
        ExtractedText {
            text: binary_placeholder(filename),
            format: SourceFormat::Binary,
        }
    }
}

fn binary_placeholder(filename: &str) -> String {
    format!(
        "[Binary file: {}] - Content cannot be extracted as text, but file is stored and available for download.",
        filename
    )
}

fn error_placeholder(filename: &str, error: &ExtractError) -> String {
    format!(
        "[Error extracting content from {}] - File is stored but content extraction failed: {}",
        filename, error
    )
}

/// Page-by-page PDF text, pages joined with a blank line. A page with no
/// text contributes an empty string, not an error.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n\n"))
}

/// Paragraph-by-paragraph DOCX text, paragraphs joined with newlines.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Ooxml(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    extract_docx_paragraphs(&doc_xml)
}

/// Walk `word/document.xml`, collecting `w:t` runs grouped by their `w:p`
/// paragraph.
fn extract_docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal DOCX (ZIP with word/document.xml) containing the given
    /// paragraphs.
    fn minimal_docx(paragraph_texts: &[&str]) -> Vec<u8> {
        let body: String = paragraph_texts
            .iter()
            .map(|t| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", t))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        );

        let cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Minimal multi-page PDF with one line of text per page. Body is built
    /// first, then the xref with correct byte offsets so pdf-extract can
    /// parse it.
    fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
        let first_page_obj = 4;
        let kids: Vec<String> = (0..pages.len())
            .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
            .collect();

        let mut out = Vec::new();
        let mut offsets = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");

        offsets.push(out.len());
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
                kids.join(" "),
                pages.len()
            )
            .as_bytes(),
        );
        offsets.push(out.len());
        out.extend_from_slice(
            b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );

        for (i, text) in pages.iter().enumerate() {
            let page_obj = first_page_obj + 2 * i;
            let content_obj = page_obj + 1;
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                     /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                    page_obj, content_obj
                )
                .as_bytes(),
            );
            let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", text);
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Length {} >> stream\n{}endstream endobj\n",
                    content_obj,
                    stream.len(),
                    stream
                )
                .as_bytes(),
            );
        }

        let xref_start = out.len();
        let total_objects = offsets.len() + 1;
        out.extend_from_slice(format!("xref\n0 {}\n", total_objects).as_bytes());
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                total_objects, xref_start
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn pdf_pages_extracted_in_order() {
        let bytes = minimal_pdf(&["Page one text", "Page two text", "Page three text"]);
        let extracted = extract(&bytes, "report.pdf", "application/pdf");
        assert_eq!(extracted.format, SourceFormat::Pdf);

        let one = extracted.text.find("Page one text").expect("page one");
        let two = extracted.text.find("Page two text").expect("page two");
        let three = extracted.text.find("Page three text").expect("page three");
        assert!(one < two && two < three);
    }

    #[test]
    fn utf8_text_round_trips() {
        let content = "Plain text content.\nSecond line with ünïcödé.";
        let extracted = extract(content.as_bytes(), "notes.txt", "text/plain");
        assert_eq!(extracted.text, content);
        assert_eq!(extracted.format, SourceFormat::Text);
    }

    #[test]
    fn json_extension_treated_as_text() {
        let content = "{\"key\": \"value\"}";
        let extracted = extract(content.as_bytes(), "data.json", "application/octet-stream");
        assert_eq!(extracted.text, content);
        assert_eq!(extracted.format, SourceFormat::Text);
    }

    #[test]
    fn invalid_pdf_becomes_error_placeholder() {
        let extracted = extract(b"not a pdf at all", "report.pdf", "application/pdf");
        assert_eq!(extracted.format, SourceFormat::Pdf);
        assert!(extracted
            .text
            .starts_with("[Error extracting content from report.pdf]"));
    }

    #[test]
    fn invalid_zip_becomes_error_placeholder_for_docx() {
        let extracted = extract(
            b"not a zip",
            "letter.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        );
        assert_eq!(extracted.format, SourceFormat::Docx);
        assert!(extracted
            .text
            .starts_with("[Error extracting content from letter.docx]"));
    }

    #[test]
    fn docx_paragraphs_joined_with_newlines() {
        let bytes = minimal_docx(&["First paragraph", "Second paragraph"]);
        let extracted = extract(
            &bytes,
            "letter.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        );
        assert_eq!(extracted.text, "First paragraph\nSecond paragraph");
        assert_eq!(extracted.format, SourceFormat::Docx);
    }

    #[test]
    fn unknown_binary_becomes_placeholder() {
        let bytes: Vec<u8> = (0..512u32).map(|i| (i * 7 % 32) as u8).collect();
        let extracted = extract(&bytes, "tool.exe", "application/octet-stream");
        assert_eq!(extracted.format, SourceFormat::Binary);
        assert!(extracted.text.starts_with("[Binary file: tool.exe]"));
        assert!(extracted.text.contains("stored and available for download"));
    }

    #[test]
    fn unknown_extension_with_text_content_is_accepted() {
        let content = "A perfectly readable configuration dump with plain words in it.\n".repeat(5);
        let extracted = extract(content.as_bytes(), "dump.custom", "application/octet-stream");
        assert_eq!(extracted.format, SourceFormat::Text);
        assert_eq!(extracted.text, content);
    }

    #[test]
    fn ingestible_predicate() {
        let text = b"hello world, this is clearly text content";
        let binary: Vec<u8> = (0..512u32).map(|i| (i * 7 % 32) as u8).collect();

        assert!(is_ingestible(text, "anything.weird", "text/plain"));
        assert!(is_ingestible(&binary, "doc.pdf", "application/pdf"));
        assert!(is_ingestible(&binary, "doc.docx", "application/octet-stream"));
        assert!(!is_ingestible(&binary, "tool.exe", "application/octet-stream"));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("REPORT.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("noext"), None);
    }
}
