//! Writes [`Document`]s to disk as txt, md, pdf or json.

use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};
use rslug::slugify;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::document::Document;
use crate::error::ExportError;

/// Target file format of the export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Md,
    Pdf,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Md => "md",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Returned when a format name is not one of txt, md, pdf, json.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported output format '{0}' (expected txt, md, pdf or json)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(OutputFormat::Txt),
            "md" => Ok(OutputFormat::Md),
            "pdf" => Ok(OutputFormat::Pdf),
            "json" => Ok(OutputFormat::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// `<slug(title)>_<index>.<ext>`
pub fn output_file_name(title: &str, index: usize, format: OutputFormat) -> String {
    format!("{}_{}.{}", slugify!(title), index, format.extension())
}

/// Write one document and return the path written.
///
/// `index` is the document's position in the export and keeps names unique
/// when titles repeat.
pub fn save_to_file(
    doc: &Document,
    output_dir: &Path,
    format: OutputFormat,
    index: usize,
) -> Result<PathBuf, ExportError> {
    let title = doc
        .metadata
        .title
        .clone()
        .unwrap_or_else(|| format!("Page {index}"));
    let url = if doc.metadata.url.is_empty() {
        "N/A"
    } else {
        doc.metadata.url.as_str()
    };
    let path = output_dir.join(output_file_name(&title, index, format));

    match format {
        OutputFormat::Txt => {
            let body = format!("Title: {title}\nURL: {url}\n\n{}", doc.page_content);
            std::fs::write(&path, body)?;
        }
        OutputFormat::Md => {
            let body = format!("# {title}\n[URL]({url})\n\n{}", doc.page_content);
            std::fs::write(&path, body)?;
        }
        OutputFormat::Pdf => {
            std::fs::write(&path, render_pdf(&title, url, &doc.page_content))?;
        }
        OutputFormat::Json => {
            std::fs::write(&path, to_pretty_json(doc)?)?;
        }
    }

    debug!(path = %path.display(), %format, "Wrote document");
    Ok(path)
}

/// Write every document into `output_dir`, in order, and return the paths.
pub fn save_documents(
    documents: &[Document],
    output_dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let paths = documents
        .iter()
        .enumerate()
        .map(|(index, doc)| save_to_file(doc, output_dir, format, index))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        count = paths.len(),
        %format,
        dir = %output_dir.display(),
        "Saved documents"
    );
    Ok(paths)
}

/// `{metadata, pageContent}` with 4-space indentation; non-ASCII is written as-is.
fn to_pretty_json(doc: &Document) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut serializer)?;
    Ok(buf)
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const LINE_HEIGHT_MM: f32 = 5.0;
const TITLE_SIZE_PT: f32 = 12.0;
const BODY_SIZE_PT: f32 = 10.0;
/// Conservative Helvetica 10pt line width for the printable area.
const WRAP_COLUMNS: usize = 95;
const FONT: BuiltinFont = BuiltinFont::Helvetica;

/// Single-font, single-column A4 layout: title, URL, then wrapped content.
fn render_pdf(title: &str, url: &str, content: &str) -> Vec<u8> {
    let title = pdf_safe_text(title);
    let url_line = pdf_safe_text(&format!("URL: {url}"));
    let body = pdf_safe_text(content);

    let lines_per_page =
        ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM).floor() as usize;
    let mut lines: Vec<String> = body
        .lines()
        .flat_map(|line| wrap_line(line, WRAP_COLUMNS))
        .collect();

    // The header takes three lines on the first page: title, URL, blank.
    let mut pages = Vec::new();
    let first_page_capacity = lines_per_page.saturating_sub(3);
    let rest = lines.split_off(first_page_capacity.min(lines.len()));

    let mut ops = page_prelude();
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(TITLE_SIZE_PT),
        font: FONT,
    });
    ops.push(write_line(centered(&title)));
    ops.push(Op::AddLineBreak);
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(BODY_SIZE_PT),
        font: FONT,
    });
    ops.push(write_line(url_line));
    ops.push(Op::AddLineBreak);
    ops.push(Op::AddLineBreak);
    push_lines(&mut ops, lines);
    pages.push(finish_page(ops));

    for chunk in rest.chunks(lines_per_page.max(1)) {
        let mut ops = page_prelude();
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(BODY_SIZE_PT),
            font: FONT,
        });
        push_lines(&mut ops, chunk.to_vec());
        pages.push(finish_page(ops));
    }

    let mut doc = PdfDocument::new(&title);
    doc.with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut Vec::new())
}

fn page_prelude() -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point::new(Mm(MARGIN_MM), Mm(PAGE_HEIGHT_MM - MARGIN_MM)),
        },
        Op::SetLineHeight {
            lh: Pt::from(Mm(LINE_HEIGHT_MM)),
        },
    ]
}

fn push_lines(ops: &mut Vec<Op>, lines: Vec<String>) {
    for line in lines {
        ops.push(write_line(line));
        ops.push(Op::AddLineBreak);
    }
}

fn write_line(text: String) -> Op {
    Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text)],
        font: FONT,
    }
}

fn finish_page(mut ops: Vec<Op>) -> PdfPage {
    ops.push(Op::EndTextSection);
    PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops)
}

/// Pad with spaces so a short title sits roughly in the middle of the line.
fn centered(title: &str) -> String {
    let width = title.chars().count();
    if width >= WRAP_COLUMNS {
        return title.to_string();
    }
    let pad = (WRAP_COLUMNS - width) / 2;
    format!("{}{title}", " ".repeat(pad))
}

/// Reduce text to what the builtin font path draws one byte per glyph: printable ASCII.
///
/// Builtin-font text is written as UTF-8 under WinAnsi encoding, where any byte above
/// 0x7F is a separate glyph. Accented Latin-1 letters fold to their base letter and
/// every other character is dropped.
fn pdf_safe_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                if let Some(folded) = fold_latin1(c) {
                    out.push_str(folded);
                }
            }
        }
    }
    out
}

fn fold_latin1(c: char) -> Option<&'static str> {
    let folded = match c {
        'À'..='Å' => "A",
        'Æ' => "AE",
        'Ç' => "C",
        'È'..='Ë' => "E",
        'Ì'..='Ï' => "I",
        'Ð' => "D",
        'Ñ' => "N",
        'Ò'..='Ö' | 'Ø' => "O",
        'Ù'..='Ü' => "U",
        'Ý' => "Y",
        'Þ' => "Th",
        'ß' => "ss",
        'à'..='å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è'..='ë' => "e",
        'ì'..='ï' => "i",
        'ð' => "d",
        'ñ' => "n",
        'ò'..='ö' | 'ø' => "o",
        'ù'..='ü' => "u",
        'ý' | 'ÿ' => "y",
        'þ' => "th",
        '\u{a0}' => " ",
        _ => return None,
    };
    Some(folded)
}

/// Greedy word wrap at `width` characters; words longer than a line are split.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut wrapped = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                wrapped.push(std::mem::take(&mut current));
            }
            let tail = word.split_off(width);
            wrapped.push(word.into_iter().collect());
            word = tail;
        }
        let current_len = current.chars().count();
        if !current.is_empty() && current_len + 1 + word.len() > width {
            wrapped.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    wrapped.push(current);
    wrapped
}
