//! Conversion of raw email bodies into a flat, tag-free text view

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

static SCRIPT_STYLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
});

static BLOCK_BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:br|/p|/div|/tr|/li|/table|/h[1-6])\b[^>]*>").unwrap()
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^<>]*>").unwrap());

static NUMERIC_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9A-Fa-f]{1,6})|([0-9]{1,7}));").unwrap());

/// Elements whose content never reaches the text view
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "head", "title", "noscript", "template",
];

/// Elements that start and end their own line
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "div", "dl", "dt",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tbody", "tfoot", "thead", "tr", "ul",
];

/// Which input produced the text view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationPath {
    /// Walked the parsed HTML tree
    Html,
    /// Used the plain-text body
    PlainText,
    /// Regex tag stripping over the raw HTML
    StrippedMarkup,
    /// Every input was blank
    Empty,
}

/// Flattened, analyzable view of an email body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedContent {
    /// One block per line, whitespace collapsed, no markup
    pub text: String,

    /// Table rows with at least two cells, cell text only
    pub table_rows: Vec<Vec<String>>,

    pub path: NormalizationPath,

    /// Markup errors the HTML parser recovered from
    pub html_errors: usize,
}

impl NormalizedContent {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty() && self.table_rows.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Normalize an email body pair. Never fails.
///
/// The HTML tree is preferred. When it yields no text the plain-text body is
/// used, and as a last resort the raw HTML is stripped with regexes.
#[must_use]
pub fn normalize(body_text: &str, body_html: &str) -> NormalizedContent {
    let mut html_errors = 0;

    if !body_html.trim().is_empty() {
        let document = Html::parse_document(body_html);
        html_errors = document.errors.len();

        let text = tidy(&render_tree(document.root_element()));
        if !text.is_empty() {
            debug!(
                "Normalized HTML body ({} recovered markup errors)",
                html_errors
            );
            return NormalizedContent {
                text,
                table_rows: table_rows(&document),
                path: NormalizationPath::Html,
                html_errors,
            };
        }
    }

    let text = tidy(&strip_tags(body_text));
    if !text.is_empty() {
        if !body_html.trim().is_empty() {
            warn!("HTML body yielded no text; using plain-text body");
        }
        return NormalizedContent {
            text,
            table_rows: Vec::new(),
            path: NormalizationPath::PlainText,
            html_errors,
        };
    }

    let text = tidy(&strip_markup(body_html));
    if !text.is_empty() {
        warn!("Falling back to regex tag stripping for HTML body");
        return NormalizedContent {
            text,
            table_rows: Vec::new(),
            path: NormalizationPath::StrippedMarkup,
            html_errors,
        };
    }

    NormalizedContent {
        text: String::new(),
        table_rows: Vec::new(),
        path: NormalizationPath::Empty,
        html_errors,
    }
}

fn render_tree(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    render_element(root, &mut out);
    out
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block || name == "br" {
        out.push('\n');
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            render_element(child, out);
        }
    }

    match name {
        _ if block => out.push('\n'),
        "td" | "th" => out.push(' '),
        _ => {}
    }
}

fn table_rows(document: &Html) -> Vec<Vec<String>> {
    document
        .select(&ROW_SELECTOR)
        .filter_map(|row| {
            let cells: Vec<String> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| collapse(&render_tree(cell)))
                .collect();

            (cells.len() >= 2 && cells.iter().any(|c| !c.is_empty())).then_some(cells)
        })
        .collect()
}

/// Collapse whitespace on each line and drop blank lines
fn tidy(raw: &str) -> String {
    raw.lines()
        .map(collapse)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove stray tags from text that is supposed to be plain
fn strip_tags(text: &str) -> String {
    if text.contains('<') {
        TAG_REGEX.replace_all(text, "").into_owned()
    } else {
        text.to_string()
    }
}

/// Crude markup removal for HTML that yields nothing through the tree
fn strip_markup(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_REGEX.replace_all(html, "");
    let with_breaks = BLOCK_BREAK_REGEX.replace_all(&without_scripts, "\n");
    let without_tags = TAG_REGEX.replace_all(&with_breaks, "");
    decode_entities(&without_tags)
}

/// Decode the common named entities and numeric character references
fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&euro;", "€")
        .replace("&pound;", "£");

    let numeric = NUMERIC_ENTITY_REGEX.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = caps.get(1).map_or_else(
            || caps.get(2).and_then(|d| d.as_str().parse::<u32>().ok()),
            |hex| u32::from_str_radix(hex.as_str(), 16).ok(),
        );
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    // last, so "&amp;lt;" stays "&lt;"
    numeric.replace("&amp;", "&")
}
