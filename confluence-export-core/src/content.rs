//! Plain text and fenced code blocks from Confluence storage format.
//!
//! Storage format is HTML with vendor elements such as
//! `<ac:structured-macro ac:name="code">`. Macro bodies usually sit in CDATA sections,
//! which an HTML parser would treat as bogus comments, so they are turned into escaped
//! text before parsing.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::borrow::Cow;
use std::sync::LazyLock;

static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid CDATA regex"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

const MACRO_TAG: &str = "ac:structured-macro";
const PARAMETER_TAG: &str = "ac:parameter";
const PLAIN_TEXT_BODY_TAG: &str = "ac:plain-text-body";
const NAME_ATTR: &str = "ac:name";

/// Text extracted from one page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// All text nodes with markup removed.
    pub plain_text: String,
    /// Concatenated fenced code blocks, in document order.
    pub code_blocks: String,
}

impl PageText {
    /// Plain text followed by the code blocks, with blank-line runs collapsed.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.plain_text.len() + self.code_blocks.len());
        text.push_str(&self.plain_text);
        text.push_str(&self.code_blocks);
        collapse_blank_lines(&text).into_owned()
    }
}

/// Extract plain text and code blocks from a storage-format body.
pub fn extract_page_text(storage_body: &str) -> PageText {
    let prepared = inline_cdata(storage_body);
    let fragment = Html::parse_fragment(&prepared);
    let root = fragment.root_element();

    PageText {
        plain_text: root.text().collect(),
        code_blocks: extract_code_blocks(root),
    }
}

/// Every `code` macro rendered as ```` \n```<language>\n<body>\n```\n ````.
fn extract_code_blocks(root: ElementRef<'_>) -> String {
    let mut blocks = String::new();
    for code_macro in elements(root).filter(|el| is_code_macro(*el)) {
        let language = elements(code_macro)
            .find(|el| {
                el.value().name() == PARAMETER_TAG
                    && el.value().attr(NAME_ATTR) == Some("language")
            })
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();

        let Some(body) = elements(code_macro).find(|el| el.value().name() == PLAIN_TEXT_BODY_TAG)
        else {
            // Code macro without a body: nothing to fence.
            continue;
        };
        let code: String = body.text().collect();

        blocks.push_str(&format!("\n```{language}\n{}\n```\n", code.trim()));
    }
    blocks
}

fn is_code_macro(el: ElementRef<'_>) -> bool {
    el.value().name() == MACRO_TAG && el.value().attr(NAME_ATTR) == Some("code")
}

fn elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Replace `<![CDATA[...]]>` sections with their HTML-escaped content.
fn inline_cdata(body: &str) -> Cow<'_, str> {
    CDATA.replace_all(body, |caps: &regex::Captures<'_>| escape_text(&caps[1]))
}

fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reduce every run of three or more newlines to exactly two.
pub fn collapse_blank_lines(text: &str) -> Cow<'_, str> {
    BLANK_RUN.replace_all(text, "\n\n")
}
