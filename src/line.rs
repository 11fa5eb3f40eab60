//! Line classification for INI documents.
//!
//! A document is handled as a sequence of raw lines, each keeping its own terminator.
//! Every line body is classified as a section header, a `key = value` entry, or
//! anything else (comments, blank lines, malformed text). Classification never fails:
//! a line that matches neither shape is simply [`LineKind::Other`].

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "ini.pest"]
struct IniLineParser;

/// The pieces of a `key = value` line.
///
/// Concatenating `indent + key + separator + value + trailing` reproduces the line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryParts {
    /// Whitespace before the key
    pub indent: String,
    /// The key, without surrounding whitespace
    pub key: String,
    /// The `=` together with the whitespace around it
    pub separator: String,
    /// The value, without trailing whitespace
    pub value: String,
    /// Whitespace after the value
    pub trailing: String,
}

impl EntryParts {
    /// Render the line body with a different value, keeping everything else.
    pub fn render(&self, value: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.indent, self.key, self.separator, value, self.trailing
        )
    }
}

/// Classification of a single line body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `[name]`; the name is trimmed
    Section { name: String },

    /// `key = value`
    Entry(EntryParts),

    /// Comments, blank lines and anything unrecognised
    Other,
}

/// Classify a line body (terminator already removed).
pub fn classify(body: &str) -> LineKind {
    if let Ok(mut pairs) = IniLineParser::parse(Rule::section_header, body) {
        if let Some(header) = pairs.next() {
            let name = header
                .into_inner()
                .find(|p| p.as_rule() == Rule::section_name)
                .map(|p| p.as_str().trim().to_string())
                .unwrap_or_default();
            return LineKind::Section { name };
        }
    }

    if let Ok(mut pairs) = IniLineParser::parse(Rule::entry, body) {
        if let Some(entry) = pairs.next() {
            return LineKind::Entry(entry_parts(entry));
        }
    }

    LineKind::Other
}

fn entry_parts(pair: Pair<'_, Rule>) -> EntryParts {
    let mut parts = EntryParts {
        indent: String::new(),
        key: String::new(),
        separator: String::new(),
        value: String::new(),
        trailing: String::new(),
    };

    for inner in pair.into_inner() {
        let text = inner.as_str().to_string();
        match inner.as_rule() {
            Rule::indent => parts.indent = text,
            Rule::key => parts.key = text,
            Rule::separator => parts.separator = text,
            Rule::value => parts.value = text,
            Rule::trailing => parts.trailing = text,
            _ => {}
        }
    }

    parts
}

/// Split text into lines, each keeping its terminator (`\n`, `\r\n` or a lone `\r`).
///
/// Concatenating the returned lines reproduces `text` exactly.
pub fn split_lines(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(text[start..=i].to_string());
                start = i + 1;
            }
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                lines.push(text[start..=i].to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < text.len() {
        lines.push(text[start..].to_string());
    }

    lines
}

/// Split a raw line into its body and terminator.
pub fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else if let Some(body) = line.strip_suffix('\r') {
        (body, "\r")
    } else {
        (line, "")
    }
}

/// Byte Order Mark for UTF-16 little-endian text.
const BOM_UTF16_LE: &[u8] = &[0xFF, 0xFE];

/// Byte Order Mark for UTF-8 text.
const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];

/// On-disk text encoding, detected on read and reused on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
}

impl TextEncoding {
    /// Decode raw file bytes permissively; undecodable sequences become U+FFFD.
    pub fn decode(data: &[u8]) -> (String, TextEncoding) {
        if let Some(rest) = data.strip_prefix(BOM_UTF16_LE) {
            let units = rest
                .chunks_exact(2)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                .collect::<Vec<u16>>();
            let text = char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect::<String>();
            (text, TextEncoding::Utf16Le)
        } else if let Some(rest) = data.strip_prefix(BOM_UTF8) {
            (
                String::from_utf8_lossy(rest).into_owned(),
                TextEncoding::Utf8Bom,
            )
        } else {
            (String::from_utf8_lossy(data).into_owned(), TextEncoding::Utf8)
        }
    }

    /// Encode text back to bytes, restoring the byte order mark if there was one.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf8Bom => {
                let mut out = BOM_UTF8.to_vec();
                out.extend_from_slice(text.as_bytes());
                out
            }
            TextEncoding::Utf16Le => {
                let mut out = BOM_UTF16_LE.to_vec();
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
        }
    }
}
