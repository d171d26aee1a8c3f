//! Text extraction for the supported engineering-document formats.
//!
//! Dispatches on file extension and flattens each document into a single
//! plain-text string: PDF via `pdf_extract`, the OOXML family (DOCX, PPTX,
//! XLSX) by pulling text runs out of the relevant ZIP entries. Legacy
//! binary `.xls` workbooks are discovered but not parseable here; they
//! produce an explicit error so the pipeline can log and skip them.

use std::io::Read;
use std::path::Path;

/// Extensions the pipeline will pick up during discovery.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".pdf", ".docx", ".pptx", ".xlsx", ".xls"];

/// Maximum sheets to process in an xlsx workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction error. Parse failures never panic; the pipeline logs and
/// skips the affected file.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Io(String),
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(ext) => {
                write!(f, "unsupported file extension: {}", ext)
            }
            ExtractError::Io(e) => write!(f, "failed to read file: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the flattened plain text of a document on disk.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    extract_bytes(&bytes, &ext)
}

/// Extract plain text from in-memory document bytes, dispatching on the
/// lowercased extension (including the dot).
pub fn extract_bytes(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    match extension {
        ".pdf" => extract_pdf(bytes),
        ".docx" => extract_docx(bytes),
        ".pptx" => extract_pptx(bytes),
        ".xlsx" => extract_xlsx(bytes),
        // Legacy BIFF workbooks have no reader in this stack.
        ".xls" => Err(ExtractError::UnsupportedExtension(
            ".xls (legacy binary workbook)".to_string(),
        )),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Collect the text content of every `<{tag}>` element, space-separated.
fn collect_text_elements(xml: &[u8], tag: &[u8]) -> Result<String, ExtractError> {
    let mut parts: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_tag = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == tag {
                    in_tag = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_tag => {
                let text = te.unescape().unwrap_or_default();
                if !text.is_empty() {
                    parts.push(text.into_owned());
                }
                in_tag = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == tag {
                    in_tag = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(parts.join(" "))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
    collect_text_elements(&doc_xml, b"t")
}

/// List archive entries matching `prefix`/`suffix`, sorted by the numeric
/// component of the name (slide2 before slide10).
fn numbered_entries(
    archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>,
    prefix: &str,
    suffix: &str,
) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(suffix))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(suffix)
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut sections: Vec<String> = Vec::new();

    for name in numbered_entries(&archive, "ppt/slides/slide", ".xml") {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let text = collect_text_elements(&xml, b"t")?;
        if !text.is_empty() {
            sections.push(text);
        }
    }

    // Speaker notes often carry the project narrative the slides only allude to.
    let notes: Vec<String> = numbered_entries(&archive, "ppt/notesSlides/notesSlide", ".xml")
        .into_iter()
        .map(|name| {
            let xml = read_zip_entry_bounded(&mut archive, &name)?;
            collect_text_elements(&xml, b"t")
        })
        .collect::<Result<Vec<_>, _>>()?;
    let notes_text = notes.into_iter().filter(|t| !t.is_empty()).collect::<Vec<_>>();
    if !notes_text.is_empty() {
        sections.push(notes_text.join(" "));
    }

    Ok(sections.join("\n\n"))
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_names = numbered_entries(&archive, "xl/worksheets/sheet", ".xml");
    let mut sheets: Vec<String> = Vec::new();
    for name in sheet_names.into_iter().take(XLSX_MAX_SHEETS) {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name)?;
        let cell_text = extract_sheet_cells(&sheet_xml, &shared_strings)?;
        if !cell_text.is_empty() {
            sheets.push(cell_text);
        }
    }
    Ok(sheets.join("\n\n"))
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ExtractError> {
    // A workbook with no text cells has no sharedStrings part at all.
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                } else if in_si && e.local_name().as_ref() == b"t" {
                    in_t = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                strings.push(te.unescape().unwrap_or_default().into_owned());
                in_t = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = false;
                } else if e.local_name().as_ref() == b"t" {
                    in_t = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    loop {
        if cells.len() >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if !s.is_empty() && cell_is_shared_str {
                    if let Ok(i) = s.parse::<usize>() {
                        if i < shared_strings.len() {
                            cells.push(shared_strings[i].clone());
                        }
                    }
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}
