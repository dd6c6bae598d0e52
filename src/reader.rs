use anyhow::{Context, Result};
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

/// Stable source identifier for an ingested file: its file name.
pub fn source_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Read a document into raw text, dispatched by file extension.
/// Unsupported extensions fail with an explicit error; the caller decides
/// whether that aborts anything (the indexer does not).
pub fn read_document(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => read_text(path),
        "pdf" => read_pdf(path),
        "docx" => read_docx(path),
        "html" | "htm" => read_html(path),
        _ => anyhow::bail!("Unsupported file type: .{}", ext),
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .with_context(|| format!("Failed to extract PDF text from {}", path.display()))
}

fn read_html(path: &Path) -> Result<String> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = html2text::from_read(html.as_bytes(), 120)?;
    Ok(text)
}

/// DOCX is a zip archive; the document body lives in word/document.xml.
/// Text runs (<w:t>) are concatenated, with a newline per paragraph (</w:p>).
fn read_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).context("Failed to read DOCX archive")?;
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX archive has no word/document.xml")?
        .read_to_string(&mut document_xml)?;

    let mut reader = quick_xml::Reader::from_str(&document_xml);
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(&e.decode()?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                text.push('\n');
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("Malformed DOCX XML: {}", e),
            _ => {}
        }
    }

    Ok(text)
}
