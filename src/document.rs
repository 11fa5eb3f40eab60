//! Format-preserving INI document model.
//!
//! This module provides [`IniDocument`], an editor for INI-style files that keeps every
//! byte of the source intact except the values it is asked to change.
//!
//! The main types are:
//! - [`IniDocument`] - The raw lines of one file plus a `(section, key)` index over them
//! - [`Entry`] - One live `key = value` binding and the line that backs it
//!
//! # Examples
//!
//! ```
//! use cabinet::IniDocument;
//!
//! let mut doc = IniDocument::parse("[A]\nfoo=1\n[B]\nbar=2\n");
//! assert_eq!(doc.get("A", "foo"), Some("1"));
//!
//! doc.set("A", "foo", "9").unwrap();
//! doc.set("B", "baz", "x").unwrap();
//! assert_eq!(doc.to_text(), "[A]\nfoo=9\n[B]\nbar=2\nbaz=x\n");
//! ```

use crate::error::{Error, Result};
use crate::line::{LineKind, TextEncoding, classify, split_lines, split_terminator};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A resolved `(section, key) -> value` binding backed by one line of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Owning section (`""` before the first header)
    pub section: String,
    /// Key text
    pub key: String,
    /// Current value
    pub value: String,
    /// Index of the line that defines this entry
    pub line_index: usize,
    /// Whitespace before the key
    pub indent: String,
    /// `=` plus the whitespace around it
    pub separator: String,
    /// Whitespace between the value and the line terminator
    pub trailing: String,
}

impl Entry {
    /// Render the line body for this entry with a new value.
    fn render(&self, value: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.indent, self.key, self.separator, value, self.trailing
        )
    }
}

/// An INI file held as raw lines with an index of its entries.
///
/// Concatenating the lines reproduces the source byte-for-byte until a mutation happens.
/// When the source defines the same key twice in a section, the last definition is the
/// live one; earlier lines are left untouched.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    /// Raw lines, each with its own terminator
    lines: Vec<String>,

    /// Live entries keyed by (section, key)
    entries: HashMap<(String, String), Entry>,

    /// Section names in order of first appearance
    section_order: Vec<String>,

    /// Encoding detected on load
    encoding: TextEncoding,

    /// Backing file (if loaded from or saved to disk)
    path: Option<PathBuf>,
}

impl IniDocument {
    /// Create an empty document with no backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from text
    pub fn parse(text: &str) -> Self {
        let mut doc = Self {
            lines: split_lines(text),
            ..Self::default()
        };
        doc.rebuild_index();
        doc
    }

    /// Load a document from disk.
    ///
    /// Undecodable bytes are replaced rather than rejected. A missing file yields
    /// [`Error::NotFound`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| Error::from_io(path.display().to_string(), e))?;
        let (text, encoding) = TextEncoding::decode(&data);

        let mut doc = Self::parse(&text);
        doc.encoding = encoding;
        doc.path = Some(path.to_path_buf());

        debug!(
            path = %path.display(),
            lines = doc.lines.len(),
            entries = doc.entries.len(),
            "loaded INI document"
        );
        Ok(doc)
    }

    /// Re-read the backing file, discarding in-memory changes
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::custom("Document has no backing file"))?;
        *self = Self::load(path)?;
        Ok(())
    }

    /// Backing file path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Encoding used when saving
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Raw lines (with terminators)
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Rebuild the entry index and section order from the current lines
    fn rebuild_index(&mut self) {
        self.entries.clear();
        self.section_order.clear();

        let mut seen = HashSet::new();
        let mut current = String::new();

        for (idx, raw) in self.lines.iter().enumerate() {
            let (body, _) = split_terminator(raw);
            match classify(body) {
                LineKind::Section { name } => {
                    if seen.insert(name.clone()) {
                        self.section_order.push(name.clone());
                    }
                    current = name;
                }
                LineKind::Entry(parts) => {
                    let entry = Entry {
                        section: current.clone(),
                        key: parts.key.clone(),
                        value: parts.value,
                        line_index: idx,
                        indent: parts.indent,
                        separator: parts.separator,
                        trailing: parts.trailing,
                    };
                    // Later duplicates replace earlier ones
                    self.entries.insert((current.clone(), parts.key), entry);
                }
                LineKind::Other => {}
            }
        }
    }

    /// Get the value of a key
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.entry(section, key).map(|e| e.value.as_str())
    }

    /// Get the full entry of a key
    pub fn entry(&self, section: &str, key: &str) -> Option<&Entry> {
        self.entries
            .get(&(section.trim().to_string(), key.trim().to_string()))
    }

    /// Check whether a key exists
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.entry(section, key).is_some()
    }

    /// Set a value.
    ///
    /// An existing key has only the value portion of its line replaced; indentation,
    /// spacing around `=`, trailing whitespace and the line terminator are kept. A new
    /// key is inserted as `key=value` at the end of its section, and a section that does
    /// not exist yet is appended to the document with its header.
    ///
    /// Line breaks inside `value` are replaced with spaces.
    ///
    /// A new key or section that would not read back as the same entry is rejected with
    /// [`Error::InvalidEntry`] and the document is left unchanged.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let section = section.trim();
        let key = key.trim();
        let value = value.replace(['\r', '\n'], " ");

        if let Some(entry) = self
            .entries
            .get_mut(&(section.to_string(), key.to_string()))
        {
            let idx = entry.line_index;
            let (_, terminator) = split_terminator(&self.lines[idx]);
            let rewritten = format!("{}{}", entry.render(&value), terminator);

            if self.lines[idx] != rewritten {
                debug!(section, key, line = idx + 1, "rewriting entry in place");
                self.lines[idx] = rewritten;
            }
            entry.value = value;
            return Ok(());
        }

        check_new_entry(section, key)?;
        let newline = self.default_terminator().to_string();
        let line = format!("{}={}{}", key, value, newline);

        match self.section_end(section) {
            Some(insert_at) => {
                debug!(section, key, line = insert_at + 1, "inserting entry");
                self.terminate_line_before(insert_at, &newline);
                self.lines.insert(insert_at, line);
            }
            None => {
                debug!(section, key, "appending new section");
                let end = self.lines.len();
                self.terminate_line_before(end, &newline);
                self.lines.push(format!("[{}]{}", section, newline));
                self.lines.push(line);
            }
        }

        self.rebuild_index();
        Ok(())
    }

    /// Remove a key, deleting its live line. Returns whether anything was removed.
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        let Some(entry) = self.entry(section, key) else {
            return false;
        };

        let idx = entry.line_index;
        debug!(section, key, line = idx + 1, "removing entry");
        self.lines.remove(idx);
        self.rebuild_index();
        true
    }

    /// Index just past the last line of `section`, or `None` if the section is absent.
    ///
    /// Entries before the first header belong to the `""` section, which always exists.
    fn section_end(&self, section: &str) -> Option<usize> {
        let headers: Vec<(usize, String)> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| match classify(split_terminator(raw).0) {
                LineKind::Section { name } => Some((idx, name)),
                _ => None,
            })
            .collect();

        if section.is_empty() {
            return Some(headers.first().map_or(self.lines.len(), |(idx, _)| *idx));
        }

        let pos = headers.iter().position(|(_, name)| name == section)?;
        Some(
            headers
                .get(pos + 1)
                .map_or(self.lines.len(), |(idx, _)| *idx),
        )
    }

    /// Make sure the line right before `idx` ends with a terminator.
    fn terminate_line_before(&mut self, idx: usize, newline: &str) {
        if idx == 0 {
            return;
        }
        if let Some(prev) = self.lines.get_mut(idx - 1) {
            if split_terminator(prev).1.is_empty() {
                prev.push_str(newline);
            }
        }
    }

    /// Terminator used for inserted lines: the first one found, else `\n`
    fn default_terminator(&self) -> &'static str {
        self.lines
            .iter()
            .map(|l| split_terminator(l).1)
            .find(|t| !t.is_empty())
            .map_or("\n", |t| match t {
                "\r\n" => "\r\n",
                "\r" => "\r",
                _ => "\n",
            })
    }

    /// Section names in order of first appearance
    pub fn sections(&self) -> &[String] {
        &self.section_order
    }

    /// `(key, value)` pairs of one section, sorted case-insensitively by key
    pub fn items(&self, section: &str) -> Vec<(&str, &str)> {
        let section = section.trim();
        let mut items: Vec<(&str, &str)> = self
            .entries
            .values()
            .filter(|e| e.section == section)
            .map(|e| (e.key.as_str(), e.value.as_str()))
            .collect();
        items.sort_by_key(|(k, _)| k.to_lowercase());
        items
    }

    /// All live entries, sorted case-insensitively by (section, key)
    pub fn entries(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.section.to_lowercase(), e.key.to_lowercase()));
        entries
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no live entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full document text
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }

    /// Write the document back to its backing file.
    ///
    /// On failure the in-memory document is unchanged and the save can be retried.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::custom("Document has no backing file"))?;
        self.write_to(path)
    }

    /// Write the document to `path` and make it the backing file
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_to(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encoding.encode(&self.to_text()))
            .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;
        info!(path = %path.display(), entries = self.entries.len(), "saved INI document");
        Ok(())
    }
}

/// Reject a section or key whose written line would parse as something else
fn check_new_entry(section: &str, key: &str) -> Result<()> {
    if section.contains(['\r', '\n']) {
        return Err(Error::invalid_entry(section, key, "section contains a line break"));
    }
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains(['=', ';', '\r', '\n']) {
        "key contains '=', ';' or a line break"
    } else if key.starts_with('[') {
        "key starts with '['"
    } else {
        return Ok(());
    };
    Err(Error::invalid_entry(section, key, reason))
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            f.write_str(line)?;
        }
        Ok(())
    }
}
