//! Catalog of the INI files in a HyperSpin `Settings` folder.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// HyperSpin global settings files
pub const HYPERSPIN_FILES: &[&str] = &["Global Settings.ini", "Global Bezel.ini"];

/// Main menu wheel files
pub const MAIN_MENU_FILES: &[&str] = &[
    "PC Games.ini",
    "All.ini",
    "Arcades.ini",
    "Back.ini",
    "Collections.ini",
    "Consoles.ini",
    "Handhelds.ini",
];

/// Groups of settings files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IniGroup {
    HyperSpin,
    MainMenuChanger,
    /// Per-system files: every `.ini` not in the other groups
    Systems,
}

impl IniGroup {
    pub const ALL: [IniGroup; 3] = [IniGroup::HyperSpin, IniGroup::MainMenuChanger, IniGroup::Systems];

    /// Fixed file list, empty for [`IniGroup::Systems`]
    pub fn known_files(self) -> &'static [&'static str] {
        match self {
            IniGroup::HyperSpin => HYPERSPIN_FILES,
            IniGroup::MainMenuChanger => MAIN_MENU_FILES,
            IniGroup::Systems => &[],
        }
    }
}

impl fmt::Display for IniGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IniGroup::HyperSpin => write!(f, "HyperSpin"),
            IniGroup::MainMenuChanger => write!(f, "MainMenuChanger"),
            IniGroup::Systems => write!(f, "Systems"),
        }
    }
}

/// `.ini` file names in `dir`, sorted case-insensitively. A missing folder lists nothing.
pub fn list_ini_files(dir: impl AsRef<Path>) -> Vec<String> {
    let dir = dir.as_ref();
    let Ok(read) = fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "settings folder not readable");
        return Vec::new();
    };

    let mut names = read
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.to_lowercase().ends_with(".ini"))
        .collect::<Vec<_>>();
    names.sort_by_key(|name| name.to_lowercase());
    names
}

fn contains_ignore_case(list: &[&str], name: &str) -> bool {
    list.iter().any(|known| known.eq_ignore_ascii_case(name))
}

/// Files to offer for `group`, given the files present in the folder.
///
/// Fixed groups list the known files that exist, or the full known list when none do.
/// Systems list only existing files outside the fixed groups.
pub fn files_for(group: IniGroup, available: &[String]) -> Vec<String> {
    match group {
        IniGroup::Systems => available
            .iter()
            .filter(|name| {
                !contains_ignore_case(HYPERSPIN_FILES, name)
                    && !contains_ignore_case(MAIN_MENU_FILES, name)
            })
            .cloned()
            .collect(),
        fixed => {
            let known = fixed.known_files();
            let present = known
                .iter()
                .filter_map(|file| {
                    available
                        .iter()
                        .find(|name| name.eq_ignore_ascii_case(file))
                        .cloned()
                })
                .collect::<Vec<_>>();
            if present.is_empty() {
                known.iter().map(|f| f.to_string()).collect()
            } else {
                present
            }
        }
    }
}
