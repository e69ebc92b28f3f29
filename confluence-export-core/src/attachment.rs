//! Attachment download and per-format text extraction.
//!
//! The binary is always written to disk first and extraction reads it back from there,
//! so a file that cannot be parsed is still part of the export. Extraction failures are
//! never propagated: they become an inline diagnostic in the document text.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::contract::ContentSource;
use crate::model::AttachmentRecord;

type ExtractResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Extractor selected from the attachment's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    /// doc, docx
    Word,
    /// xls, xlsx
    Spreadsheet,
    /// ppt, pptx
    Presentation,
    /// png, jpg, jpeg
    Image,
    Unsupported,
}

impl AttachmentKind {
    /// Case-insensitive dispatch on the text after the last `.` of the title.
    pub fn from_title(title: &str) -> Self {
        let extension = title.rsplit('.').next().unwrap_or_default().to_lowercase();
        match extension.as_str() {
            "pdf" => AttachmentKind::Pdf,
            "doc" | "docx" => AttachmentKind::Word,
            "xls" | "xlsx" => AttachmentKind::Spreadsheet,
            "ppt" | "pptx" => AttachmentKind::Presentation,
            "png" | "jpg" | "jpeg" => AttachmentKind::Image,
            _ => AttachmentKind::Unsupported,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttachmentKind::Pdf => "PDF",
            AttachmentKind::Word => "DOC/DOCX",
            AttachmentKind::Spreadsheet => "XLS/XLSX",
            AttachmentKind::Presentation => "PPT/PPTX",
            AttachmentKind::Image => "image",
            AttachmentKind::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

/// Outcome of processing one attachment that was downloaded successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentText {
    pub title: String,
    pub download_url: String,
    /// Extracted text, placeholder, or extraction diagnostic.
    pub text: String,
}

/// File name used under the attachments directory. Path separators are neutralised.
pub fn attachment_file_name(title: &str) -> String {
    let name = title.replace(['/', '\\'], "_");
    if name.is_empty() {
        "attachment".to_string()
    } else {
        name
    }
}

/// Download one attachment into `attachments_dir` and extract its text.
///
/// Returns `None` only when the download itself failed; the failure is logged.
pub async fn process_attachment<S>(
    source: &S,
    attachment: &AttachmentRecord,
    attachments_dir: &Path,
) -> Option<AttachmentText>
where
    S: ContentSource + ?Sized,
{
    let title = attachment.title.as_str();
    let dest = attachments_dir.join(attachment_file_name(title));

    let download_url = match source
        .download_attachment(attachment.download_link(), &dest)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, title, "Failed to download attachment");
            return None;
        }
    };
    info!(title, path = %dest.display(), "Attachment saved");

    let kind = AttachmentKind::from_title(title);
    let text = extract_text(kind, title, &dest);
    Some(AttachmentText {
        title: title.to_string(),
        download_url,
        text,
    })
}

/// Text for the file at `path`, or a placeholder / diagnostic string. Never fails.
pub fn extract_text(kind: AttachmentKind, title: &str, path: &Path) -> String {
    debug!(%kind, title, path = %path.display(), "Extracting attachment text");
    let result = match kind {
        AttachmentKind::Pdf => pdf_text(path),
        AttachmentKind::Word => word_text(path),
        AttachmentKind::Spreadsheet => spreadsheet_text(path),
        AttachmentKind::Presentation => presentation_text(path),
        AttachmentKind::Image => {
            return match probe_image(path) {
                Ok((width, height)) => {
                    debug!(title, width, height, "Attachment is an image");
                    format!("Image: {title} (text cannot be extracted directly)")
                }
                Err(e) => {
                    warn!(error = %e, title, "Failed to open image attachment");
                    format!("Error processing image {title}: {e}")
                }
            };
        }
        AttachmentKind::Unsupported => return format!("Unsupported file type: {title}"),
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, %kind, title, "Failed to extract attachment text");
        format!("Error extracting text from {kind} {title}: {e}")
    })
}

fn pdf_text(path: &Path) -> ExtractResult<String> {
    let document = lopdf::Document::load(path).map_err(|e| e.to_string())?;
    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        let page_text = document
            .extract_text(&[*page_number])
            .map_err(|e| e.to_string())?;
        text.push_str(&page_text);
    }
    Ok(text)
}

fn word_text(path: &Path) -> ExtractResult<String> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let xml = read_zip_entry(&mut archive, "word/document.xml")?;
    Ok(body_paragraphs(&xml)?.join("\n"))
}

fn spreadsheet_text(path: &Path) -> ExtractResult<String> {
    use calamine::{open_workbook_auto, Data, Reader as _};

    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let mut text = String::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| e.to_string())?;
        for row in range.rows() {
            let values: Vec<String> = row
                .iter()
                .filter(|cell| !matches!(cell, Data::Empty))
                .map(|cell| cell.to_string())
                .collect();
            text.push_str(&values.join(", "));
            text.push('\n');
        }
    }
    Ok(text)
}

fn presentation_text(path: &Path) -> ExtractResult<String> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut text = String::new();
    for (_, name) in slides {
        let xml = read_zip_entry(&mut archive, &name)?;
        text.push_str(&slide_shape_text(&xml)?);
    }
    Ok(text)
}

fn probe_image(path: &Path) -> ExtractResult<(u32, u32)> {
    let dimensions = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dimensions)
}

fn read_zip_entry(archive: &mut ZipArchive<File>, name: &str) -> ExtractResult<String> {
    let mut entry = archive.by_name(name)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().is_some_and(|parent| parent.as_slice() == name)
}

/// Text of every paragraph directly under `w:body`.
fn body_paragraphs(xml: &str) -> ExtractResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"w:p" if parent_is(&stack, b"w:body") => current = Some(String::new()),
                    b"w:t" => in_text = true,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if parent_is(&stack, b"w:body") => paragraphs.push(String::new()),
                b"w:tab" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" if parent_is(&stack, b"w:body") => {
                        if let Some(p) = current.take() {
                            paragraphs.push(p);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

/// Text of every top-level shape on a slide, one shape per line.
///
/// A shape's text is its paragraphs joined with `\n`, matching how slide text frames read.
fn slide_shape_text(xml: &str) -> ExtractResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();
    let mut shape: Option<Vec<String>> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"p:sp" if parent_is(&stack, b"p:spTree") => shape = Some(Vec::new()),
                    b"a:p" => {
                        if let Some(paragraphs) = shape.as_mut() {
                            paragraphs.push(String::new());
                        }
                    }
                    b"a:t" => in_text = true,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"p:sp" if parent_is(&stack, b"p:spTree") => text.push('\n'),
                b"a:p" => {
                    if let Some(paragraphs) = shape.as_mut() {
                        paragraphs.push(String::new());
                    }
                }
                b"a:br" => {
                    if let Some(p) = shape.as_mut().and_then(|s| s.last_mut()) {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = shape.as_mut().and_then(|s| s.last_mut()) {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"a:t" => in_text = false,
                    b"p:sp" if parent_is(&stack, b"p:spTree") => {
                        if let Some(paragraphs) = shape.take() {
                            text.push_str(&paragraphs.join("\n"));
                            text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}
