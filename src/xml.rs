//! Targeted XML node text lookup and substitution.
//!
//! Profiles are edited in place: only the text of the one element being changed is
//! rewritten, every other byte of the file (declaration, indentation, attribute quoting,
//! comments) stays as it was.

use crate::error::{Error, Result};
use crate::line::TextEncoding;
use regex::Regex;
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Byte range of the text content of the first `<name>` element.
///
/// Matching is exact first, then case-insensitive. Namespace prefixes are ignored.
/// Only the text before any child element counts as the node's text.
fn text_range(xml: &str, name: &str) -> Option<Range<usize>> {
    find_text(xml, name, false).or_else(|| find_text(xml, name, true))
}

fn find_text(xml: &str, name: &str, ignore_case: bool) -> Option<Range<usize>> {
    let flags = if ignore_case { "(?i)" } else { "" };
    let name = regex::escape(name);
    let open = Regex::new(&format!(
        r"{flags}<(?:[A-Za-z_][\w.-]*:)?{name}(\s[^>]*)?>"
    ))
    .ok()?;
    let close = Regex::new(&format!(r"{flags}</(?:[A-Za-z_][\w.-]*:)?{name}\s*>")).ok()?;

    for caps in open.captures_iter(xml) {
        // <name/> and <name attr="x"/> have no text
        if caps.get(1).is_some_and(|attrs| attrs.as_str().ends_with('/')) {
            continue;
        }
        let start = caps.get(0)?.end();
        let end = close.find_at(xml, start)?.start();
        let end = xml[start..end].find('<').map_or(end, |child| start + child);
        return Some(start..end);
    }

    None
}

/// Text of the first `<name>` element, trimmed and entity-decoded.
///
/// Returns `None` when the element is missing or its text is empty.
pub fn node_text(xml: &str, name: &str) -> Option<String> {
    let range = text_range(xml, name)?;
    let text = unescape(xml[range].trim());
    if text.is_empty() { None } else { Some(text) }
}

/// Replace the text of the first `<name>` element, leaving the rest of `xml` untouched.
///
/// Returns `None` when no such element exists.
pub fn replace_node_text(xml: &str, name: &str, text: &str) -> Option<String> {
    let range = text_range(xml, name)?;
    let mut out = String::with_capacity(xml.len() + text.len());
    out.push_str(&xml[..range.start]);
    out.push_str(&escape(text));
    out.push_str(&xml[range.end..]);
    Some(out)
}

/// Read an XML file permissively, returning its text and encoding
pub fn read_xml_file(path: impl AsRef<Path>) -> Result<(String, TextEncoding)> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| Error::from_io(path.display().to_string(), e))?;
    Ok(TextEncoding::decode(&data))
}

/// Escape text content (`&`, `<`, `>`)
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the predefined entities and numeric character references
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<GameProfile xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <GameNameInternal>House of the Dead 4</GameNameInternal>
  <GamePath>E:\Arcade\2-ROMS\LIGHTGUN GAMES\hotd4\disk0.exe</GamePath>
  <EmptyNode/>
</GameProfile>
"#;

    #[test]
    fn test_node_text() {
        assert_eq!(
            node_text(PROFILE, "GameNameInternal").as_deref(),
            Some("House of the Dead 4")
        );
        assert_eq!(
            node_text(PROFILE, "GamePath").as_deref(),
            Some(r"E:\Arcade\2-ROMS\LIGHTGUN GAMES\hotd4\disk0.exe")
        );
    }

    #[test]
    fn test_node_text_missing_or_empty() {
        assert_eq!(node_text(PROFILE, "Missing"), None);
        assert_eq!(node_text(PROFILE, "EmptyNode"), None);
        assert_eq!(node_text("<a><b>  </b></a>", "b"), None);
    }

    #[test]
    fn test_node_text_case_insensitive_fallback() {
        assert_eq!(node_text(PROFILE, "gamepath").as_deref().map(|s| &s[..2]), Some("E:"));
    }

    #[test]
    fn test_node_text_namespaced() {
        let xml = "<x:Root xmlns:x=\"u\"><x:GamePath>C:\\a.exe</x:GamePath></x:Root>";
        assert_eq!(node_text(xml, "GamePath").as_deref(), Some("C:\\a.exe"));
    }

    #[test]
    fn test_node_text_entities() {
        let xml = "<n>Tom &amp; Jerry &#x41;&#66; &bogus;</n>";
        assert_eq!(node_text(xml, "n").as_deref(), Some("Tom & Jerry AB &bogus;"));
    }

    #[test]
    fn test_replace_preserves_everything_else() {
        let replaced = replace_node_text(PROFILE, "GamePath", r"F:\Games\hotd4.exe").unwrap();
        let expected = PROFILE.replace(
            r"E:\Arcade\2-ROMS\LIGHTGUN GAMES\hotd4\disk0.exe",
            r"F:\Games\hotd4.exe",
        );
        assert_eq!(replaced, expected);
    }

    #[test]
    fn test_replace_escapes_text() {
        let replaced = replace_node_text("<a><b>x</b></a>", "b", "R&D <1>").unwrap();
        assert_eq!(replaced, "<a><b>R&amp;D &lt;1&gt;</b></a>");
        assert_eq!(node_text(&replaced, "b").as_deref(), Some("R&D <1>"));
    }

    #[test]
    fn test_replace_missing_node() {
        assert_eq!(replace_node_text(PROFILE, "Nope", "x"), None);
    }
}
