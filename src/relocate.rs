//! Moving game libraries between drives and folders.
//!
//! Profiles keep their `GamePath` as an absolute Windows path; when a library moves to a
//! different drive only the drive letter changes. PC games listed in a HyperSpin INI are
//! rebased under a new root folder instead.

use crate::document::IniDocument;
use crate::error::{Error, Result};
use crate::teknoparrot::files_with_extension;
use crate::xml::{node_text, read_xml_file, replace_node_text};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Replace the drive letter of an `X:...` path. Other paths give `None`.
pub fn swap_drive_letter(path: &str, letter: char) -> Option<String> {
    let mut chars = path.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    if !first.is_ascii_alphabetic() || !rest.starts_with(':') || rest.len() < 2 {
        return None;
    }
    Some(format!("{letter}{rest}"))
}

/// Outcome of a profile relocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocateReport {
    /// Profiles examined
    pub scanned: usize,
    /// Profiles whose `GamePath` changed
    pub modified: usize,
    /// Profiles that could not be read or written, with the reason
    pub errors: Vec<(PathBuf, String)>,
}

/// Point every profile in `dir` at drive `letter`, rewriting files in place.
///
/// Only the `GamePath` text changes; the rest of each file is kept byte-for-byte.
/// Per-file failures are collected in the report and the remaining files still run.
pub fn relocate_profiles(
    dir: impl AsRef<Path>,
    letter: char,
    sink: &mut dyn FnMut(&str),
) -> Result<RelocateReport> {
    let dir = dir.as_ref();
    let letter = letter.to_ascii_uppercase();
    if !letter.is_ascii_alphabetic() {
        return Err(Error::custom(format!("Invalid drive letter '{letter}'")));
    }

    let mut report = RelocateReport::default();
    for path in files_with_extension(dir, "xml")? {
        report.scanned += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match relocate_profile(&path, letter) {
            Ok(Some(new_path)) => {
                report.modified += 1;
                sink(&format!("[OK] {name} -> {new_path}"));
            }
            Ok(None) => debug!(path = %path.display(), "profile unchanged"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "profile not relocated");
                sink(&format!("[ERROR] {name}: {e}"));
                report.errors.push((path, e.to_string()));
            }
        }
    }

    info!(
        scanned = report.scanned,
        modified = report.modified,
        errors = report.errors.len(),
        "relocated profiles"
    );
    Ok(report)
}

/// Rewrite one profile; returns the new `GamePath` when the file changed
fn relocate_profile(path: &Path, letter: char) -> Result<Option<String>> {
    let (xml, encoding) = read_xml_file(path)?;
    let Some(old) = node_text(&xml, "GamePath") else {
        return Ok(None);
    };
    let Some(new) = swap_drive_letter(&old, letter).filter(|new| *new != old) else {
        return Ok(None);
    };
    let Some(updated) = replace_node_text(&xml, "GamePath", &new) else {
        return Ok(None);
    };

    fs::write(path, encoding.encode(&updated))
        .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;
    Ok(Some(new))
}

/// Rebase an absolute `X:\Top\rest` path onto `root` as `root\rest`.
///
/// Surrounding quotes are kept. Relative paths are returned unchanged.
pub fn rebase_application_path(value: &str, root: &str) -> String {
    let trimmed = value.trim();
    let (quote, inner) = match trimmed.chars().next() {
        Some(q @ ('"' | '\'')) if trimmed.len() >= 2 && trimmed.ends_with(q) => {
            (Some(q), &trimmed[1..trimmed.len() - 1])
        }
        _ => (None, trimmed),
    };

    let bytes = inner.as_bytes();
    if bytes.len() < 2 || bytes[1] != b':' || !bytes[0].is_ascii_alphabetic() {
        return value.to_string();
    }

    let parts = inner.split('\\').collect::<Vec<_>>();
    let relative = match parts.len() {
        0 | 1 => &[][..],
        2 => &parts[1..],
        _ => &parts[2..],
    };

    let mut rebased = root.trim_end_matches(['\\', '/']).replace('/', "\\");
    for part in relative {
        rebased.push('\\');
        rebased.push_str(part);
    }

    match quote {
        Some(q) => format!("{q}{rebased}{q}"),
        None => rebased,
    }
}

/// Rebase every live `application` entry (any case) in `doc` under `root`.
///
/// Returns the number of entries whose value changed.
pub fn relocate_pc_games(doc: &mut IniDocument, root: &str, sink: &mut dyn FnMut(&str)) -> usize {
    let targets = doc
        .entries()
        .into_iter()
        .filter(|e| e.key.eq_ignore_ascii_case("application"))
        .map(|e| (e.section.clone(), e.key.clone(), e.value.clone()))
        .collect::<Vec<_>>();

    let mut modified = 0;
    for (section, key, value) in targets {
        let rebased = rebase_application_path(&value, root);
        if rebased != value {
            match doc.set(&section, &key, &rebased) {
                Ok(()) => {
                    sink(&format!("[OK] [{section}] {key} -> {rebased}"));
                    modified += 1;
                }
                Err(e) => {
                    warn!(section, key, error = %e, "path not rebased");
                    sink(&format!("[ERROR] [{section}] {key}: {e}"));
                }
            }
        }
    }

    info!(modified, "relocated PC game paths");
    modified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_drive_letter() {
        assert_eq!(
            swap_drive_letter(r"E:\Arcade\game.exe", 'F').as_deref(),
            Some(r"F:\Arcade\game.exe")
        );
        assert_eq!(swap_drive_letter(r"\\server\share", 'F'), None);
        assert_eq!(swap_drive_letter("relative\\x.exe", 'F'), None);
        assert_eq!(swap_drive_letter("E:", 'F'), None);
    }

    #[test]
    fn test_rebase_application_path() {
        assert_eq!(
            rebase_application_path(r"G:\PC\Brawlout\Brawlout.exe", r"D:\Games\"),
            r"D:\Games\Brawlout\Brawlout.exe"
        );
        assert_eq!(
            rebase_application_path(r#""G:\PC\Some Game\game.exe""#, r"D:\Games"),
            r#""D:\Games\Some Game\game.exe""#
        );
        assert_eq!(rebase_application_path(r"G:\game.exe", r"D:\Games"), r"D:\Games\game.exe");
        assert_eq!(rebase_application_path(r"games\x.exe", r"D:\Games"), r"games\x.exe");
    }

    #[test]
    fn test_relocate_pc_games() {
        let mut doc = IniDocument::parse(
            "[Brawlout]\r\nApplication = G:\\PC\\Brawlout\\Brawlout.exe\r\nparams=-x\r\n\
             [Local]\r\napplication=bin\\run.exe\r\n",
        );
        let mut log = Vec::new();
        let modified = relocate_pc_games(&mut doc, r"D:\Games", &mut |line: &str| {
            log.push(line.to_string())
        });

        assert_eq!(modified, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(
            doc.get("Brawlout", "Application"),
            Some(r"D:\Games\Brawlout\Brawlout.exe")
        );
        assert!(doc
            .to_text()
            .starts_with("[Brawlout]\r\nApplication = D:\\Games\\Brawlout\\Brawlout.exe\r\n"));
        assert_eq!(doc.get("Local", "application"), Some(r"bin\run.exe"));
    }
}
