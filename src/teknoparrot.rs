//! TeknoParrot game profiles.
//!
//! A profile is one `*.xml` file in the UserProfiles folder. Profiles are grouped by a
//! static table of path-prefix categories, and can be turned into `.bat` launchers or
//! dumped into a frontend INI module through [`IniDocument`].

use crate::document::IniDocument;
use crate::error::{Error, Result};
use crate::xml::{node_text, read_xml_file};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Default path fragment the static categories are rooted at
pub const DEFAULT_CATEGORY_ROOT: &str = r"e:\arcade\2-roms";

/// Category assigned when no prefix matches
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Launcher used when no executable is configured
pub const DEFAULT_EXE: &str = "TeknoParrotUi.exe";

/// A game profile loaded from the UserProfiles folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// The profile XML file
    pub xml_path: PathBuf,
    /// `GameNameInternal`, or the file stem when absent
    pub name: String,
    /// `GamePath`, or empty
    pub game_path: String,
    /// Category label assigned by [`categorize`]
    pub category: String,
}

impl Profile {
    /// Build a profile from XML text
    pub fn from_xml(xml_path: impl Into<PathBuf>, xml: &str) -> Self {
        let xml_path = xml_path.into();
        let name = node_text(xml, "GameNameInternal").unwrap_or_else(|| file_stem(&xml_path));
        let game_path = node_text(xml, "GamePath").unwrap_or_default();
        Self {
            xml_path,
            name,
            game_path,
            category: String::new(),
        }
    }

    /// Load a profile; an unreadable file still yields a profile named after its stem
    pub fn load(xml_path: impl Into<PathBuf>) -> Self {
        let xml_path = xml_path.into();
        match read_xml_file(&xml_path) {
            Ok((xml, _)) => Self::from_xml(xml_path, &xml),
            Err(e) => {
                warn!(path = %xml_path.display(), error = %e, "unreadable profile");
                Self::from_xml(xml_path, "")
            }
        }
    }

    /// Profile file name without extension
    pub fn stem(&self) -> String {
        file_stem(&self.xml_path)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All files in `dir` with the given extension (case-insensitive), sorted by path
pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::not_found(dir.display().to_string()));
    }
    let read = fs::read_dir(dir).map_err(|e| Error::from_io(dir.display().to_string(), e))?;

    let mut files = read
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        })
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

/// Load every `*.xml` profile in `dir`, sorted by file name
pub fn scan_profiles(dir: impl AsRef<Path>) -> Result<Vec<Profile>> {
    let dir = dir.as_ref();
    let profiles = files_with_extension(dir, "xml")?
        .into_iter()
        .map(Profile::load)
        .collect::<Vec<_>>();
    debug!(dir = %dir.display(), count = profiles.len(), "scanned profiles");
    Ok(profiles)
}

/// A profile filter: a label and the normalized path fragments it matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display label
    pub label: String,
    /// Nesting level for display (0 = top level)
    pub depth: usize,
    /// Normalized path fragments; empty matches everything
    pub prefixes: Vec<String>,
}

impl Category {
    fn new(label: &str, depth: usize, root: &str, parts: &[&str]) -> Self {
        let prefixes = if parts.is_empty() {
            Vec::new()
        } else {
            let mut prefix = normalize_path(root).trim_end_matches('\\').to_string();
            for part in parts {
                prefix.push('\\');
                prefix.push_str(&part.to_lowercase());
            }
            vec![prefix]
        };
        Self {
            label: label.to_string(),
            depth,
            prefixes,
        }
    }

    /// Label indented by depth
    pub fn display_label(&self) -> String {
        format!("{}{}", "    ".repeat(self.depth), self.label)
    }

    /// Whether a normalized game path falls under this category
    pub fn matches(&self, normalized: &str) -> bool {
        self.prefixes.is_empty() || self.prefixes.iter().any(|p| normalized.contains(p.as_str()))
    }
}

/// The built-in category table rooted at `root`
pub fn static_categories(root: &str) -> Vec<Category> {
    vec![
        Category::new("All", 0, root, &[]),
        Category::new("LIGHTGUN", 0, root, &["lightgun games"]),
        Category::new("Modern Arcade", 1, root, &["lightgun games", "arcade moderno"]),
        Category::new(
            "Namco System 357-369",
            1,
            root,
            &["lightgun games", "arcade", "namco system 357-369"],
        ),
        Category::new(
            "Namco System 246-256",
            1,
            root,
            &["lightgun games", "arcade", "namco system 246-256"],
        ),
        Category::new(
            "Namco System 246-256",
            0,
            root,
            &["1-placas arcade", "namco system 246-256"],
        ),
        Category::new(
            "Namco System 357-369",
            0,
            root,
            &["1-placas arcade", "namco system 357-369"],
        ),
        Category::new("Sega Triforce", 0, root, &["1-placas arcade", "sega triforce"]),
        Category::new("Teknoparrot", 0, root, &["1-placas arcade", "teknoparrot"]),
    ]
}

/// Normalize a path for matching: forward slashes become backslashes, then lower-case
pub fn normalize_path(path: &str) -> String {
    path.replace('/', "\\").to_lowercase()
}

/// Assign each profile the category with the longest matching prefix
pub fn categorize(profiles: &mut [Profile], categories: &[Category]) {
    for profile in profiles.iter_mut() {
        let normalized = normalize_path(&profile.game_path);
        let mut best: Option<(&str, usize)> = None;

        for category in categories {
            for prefix in &category.prefixes {
                if !prefix.is_empty()
                    && normalized.contains(prefix.as_str())
                    && best.is_none_or(|(_, len)| prefix.len() > len)
                {
                    best = Some((&category.label, prefix.len()));
                }
            }
        }

        profile.category = best.map_or(UNCATEGORIZED, |(label, _)| label).to_string();
    }
}

/// Profiles visible under `category`
pub fn filter<'a>(profiles: &'a [Profile], category: &Category) -> Vec<&'a Profile> {
    profiles
        .iter()
        .filter(|p| category.matches(&normalize_path(&p.game_path)))
        .collect()
}

/// Profile whose name or file stem matches `name`, ignoring case
pub fn find_profile<'a>(profiles: &'a [Profile], name: &str) -> Option<&'a Profile> {
    let name = name.trim();
    profiles
        .iter()
        .find(|p| p.name.trim().eq_ignore_ascii_case(name))
        .or_else(|| profiles.iter().find(|p| p.stem().eq_ignore_ascii_case(name)))
}

/// How profiles are launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// TeknoParrotUi executable (may be empty)
    pub exe: String,
    /// Add `--startMinimized`
    pub start_minimized: bool,
    /// Extra arguments, whitespace separated
    pub extra_args: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            exe: String::new(),
            start_minimized: true,
            extra_args: String::new(),
        }
    }
}

impl LaunchOptions {
    fn exe_or_default(&self) -> &str {
        let exe = self.exe.trim();
        if exe.is_empty() { DEFAULT_EXE } else { exe }
    }

    fn extra(&self) -> impl Iterator<Item = &str> {
        self.extra_args.split_whitespace()
    }

    /// Arguments passed to the executable for a direct launch
    pub fn launch_args(&self, profile: &Profile) -> Vec<String> {
        let mut args = Vec::new();
        if self.start_minimized {
            args.push("--startMinimized".to_string());
        }
        args.push(format!("--profile={}", profile.xml_path.display()));
        args.extend(self.extra().map(str::to_string));
        args
    }

    /// Start TeknoParrot for `profile` without waiting for it
    pub fn launch(&self, profile: &Profile) -> Result<()> {
        let exe = self.exe.trim();
        if exe.is_empty() || !Path::new(exe).exists() {
            return Err(Error::not_found(exe));
        }
        let args = self.launch_args(profile);
        info!(exe, ?args, "launching profile");
        Command::new(exe)
            .args(&args)
            .spawn()
            .map_err(|e| Error::process(exe, e.to_string()))?;
        Ok(())
    }

    /// Frontend command line: executable file name followed by the launch arguments
    pub fn command_line(&self, profile: &Profile) -> String {
        let exe = self.exe_or_default();
        let exe_name = split_exe(exe).map_or(exe, |(_, name)| name);

        let mut parts = vec![exe_name.to_string()];
        if self.start_minimized {
            parts.push("--startMinimized".to_string());
        }
        parts.push(format!("--profile=\"{}\"", profile.xml_path.display()));
        parts.extend(self.extra().map(str::to_string));
        parts.join(" ")
    }

    /// Batch script launching `profile`, with CRLF line endings.
    ///
    /// An absolute executable path makes the script change into the executable's folder
    /// first, since TeknoParrot resolves its data relative to the working directory.
    pub fn bat_script(&self, profile: &Profile) -> String {
        let exe = self.exe_or_default();
        let mut start = vec!["start \"\"".to_string()];

        let mut script = String::from("@echo off\r\n");
        script.push_str(&format!("REM TeknoParrot launcher for profile: {}\r\n", profile.name));
        match split_exe(exe) {
            Some((dir, name)) => {
                script.push_str(&format!("cd /d \"{dir}\"\r\n"));
                start.push(format!("\"{name}\""));
            }
            None => start.push(format!("\"{exe}\"")),
        }

        if self.start_minimized {
            start.push("--startMinimized".to_string());
        }
        start.push(format!("--profile=\"{}\"", profile.xml_path.display()));
        start.extend(self.extra().map(str::to_string));

        script.push_str(&start.join(" "));
        script.push_str("\r\nexit\r\n");
        script
    }
}

/// Whether `path` is absolute in either Windows (`X:\`, `\\server`) or Unix form
fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/');
    drive || path.starts_with('\\') || path.starts_with('/')
}

/// Split an absolute executable path into (folder, file name)
fn split_exe(exe: &str) -> Option<(&str, &str)> {
    if !is_absolute(exe) {
        return None;
    }
    let sep = exe.rfind(['\\', '/'])?;
    let dir = &exe[..sep];
    // keep the root separator for `C:\x.exe`
    let dir = if dir.ends_with(':') || dir.is_empty() {
        &exe[..=sep]
    } else {
        dir
    };
    Some((dir, &exe[sep + 1..]))
}

/// Replace characters Windows forbids in file names, and control characters, with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Write `<sanitized name>.bat` for `profile` into `out_dir`
pub fn write_bat(profile: &Profile, out_dir: impl AsRef<Path>, options: &LaunchOptions) -> Result<PathBuf> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir.display().to_string(), e.to_string()))?;

    let mut name = sanitize_filename(&profile.name);
    if name.is_empty() {
        name = profile.stem();
    }
    let bat_path = out_dir.join(format!("{name}.bat"));
    fs::write(&bat_path, options.bat_script(profile))
        .map_err(|e| Error::io(bat_path.display().to_string(), e.to_string()))?;

    debug!(path = %bat_path.display(), "wrote launcher");
    Ok(bat_path)
}

/// `name = stem` lines, one per profile
pub fn listing(profiles: &[Profile]) -> String {
    profiles
        .iter()
        .map(|p| format!("{} = {}", p.name.trim(), p.stem().trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Title shown by the frontend while the game loads
pub fn fade_title(profile: &Profile) -> String {
    format!("Play! - [ {} ] - TeknoParrot", profile.stem())
}

/// Write one section per profile into `doc`, returning the number of sections written.
///
/// Existing sections are updated in place; other content of the document is untouched.
pub fn dump_to_ini(
    doc: &mut IniDocument,
    profiles: &[Profile],
    options: &LaunchOptions,
) -> Result<usize> {
    for profile in profiles {
        let raw = if profile.name.is_empty() {
            profile.stem()
        } else {
            profile.name.clone()
        };
        let section = raw.replace(['\r', '\n'], " ");
        let section = section.trim();

        doc.set(section, "ShortName", &profile.stem())?;
        doc.set(section, "FadeTitle", &fade_title(profile))?;
        doc.set(section, "CommandLine", &options.command_line(profile))?;
        if profile.game_path.is_empty() {
            doc.remove(section, "GamePath");
        } else {
            doc.set(section, "GamePath", &profile.game_path)?;
        }
    }

    info!(count = profiles.len(), "dumped profiles to INI");
    Ok(profiles.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, game_path: &str) -> Profile {
        Profile {
            xml_path: PathBuf::from(format!("/tp/UserProfiles/{}.xml", name.trim())),
            name: name.to_string(),
            game_path: game_path.to_string(),
            category: String::new(),
        }
    }

    #[test]
    fn test_profile_from_xml() {
        let xml = "<GameProfile><GameNameInternal>Time Crisis 5</GameNameInternal>\
                   <GamePath>E:\\tc5\\game.exe</GamePath></GameProfile>";
        let p = Profile::from_xml("/profiles/TC5.xml", xml);
        assert_eq!(p.name, "Time Crisis 5");
        assert_eq!(p.game_path, "E:\\tc5\\game.exe");
        assert_eq!(p.stem(), "TC5");
    }

    #[test]
    fn test_profile_without_name_uses_stem() {
        let p = Profile::from_xml("/profiles/Daytona3.xml", "<GameProfile/>");
        assert_eq!(p.name, "Daytona3");
        assert_eq!(p.game_path, "");
    }

    #[test]
    fn test_static_categories_prefixes() {
        let cats = static_categories(DEFAULT_CATEGORY_ROOT);
        assert_eq!(cats[0].label, "All");
        assert!(cats[0].prefixes.is_empty());
        assert_eq!(cats[1].prefixes, vec![r"e:\arcade\2-roms\lightgun games"]);
        assert_eq!(cats[2].display_label(), "    Modern Arcade");
        assert_eq!(
            cats.last().unwrap().prefixes,
            vec![r"e:\arcade\2-roms\1-placas arcade\teknoparrot"]
        );
    }

    #[test]
    fn test_categorize_longest_prefix() {
        let cats = static_categories(DEFAULT_CATEGORY_ROOT);
        let mut profiles = vec![
            profile("a", r"E:\Arcade\2-ROMS\LIGHTGUN GAMES\Arcade\Namco System 357-369\x.exe"),
            profile("b", "E:/Arcade/2-ROMS/LIGHTGUN GAMES/other/y.exe"),
            profile("c", r"D:\elsewhere\z.exe"),
            profile("d", ""),
        ];
        categorize(&mut profiles, &cats);
        assert_eq!(profiles[0].category, "Namco System 357-369");
        assert_eq!(profiles[1].category, "LIGHTGUN");
        assert_eq!(profiles[2].category, UNCATEGORIZED);
        assert_eq!(profiles[3].category, UNCATEGORIZED);
    }

    #[test]
    fn test_categorize_matches_any_drive() {
        let cats = static_categories(r"arcade\2-roms");
        let mut profiles = vec![profile("a", r"F:\Arcade\2-ROMS\1-PLACAS ARCADE\Sega Triforce\f.exe")];
        categorize(&mut profiles, &cats);
        assert_eq!(profiles[0].category, "Sega Triforce");
    }

    #[test]
    fn test_filter() {
        let cats = static_categories(DEFAULT_CATEGORY_ROOT);
        let profiles = vec![
            profile("a", r"e:\arcade\2-roms\lightgun games\x.exe"),
            profile("b", r"c:\y.exe"),
        ];
        assert_eq!(filter(&profiles, &cats[0]).len(), 2);
        let lightgun = filter(&profiles, &cats[1]);
        assert_eq!(lightgun.len(), 1);
        assert_eq!(lightgun[0].name, "a");
    }

    #[test]
    fn test_launch_args() {
        let options = LaunchOptions {
            exe: r"C:\TP\TeknoParrotUi.exe".to_string(),
            start_minimized: true,
            extra_args: "--foo  --bar".to_string(),
        };
        let p = profile("Game", "");
        assert_eq!(
            options.launch_args(&p),
            vec![
                "--startMinimized".to_string(),
                "--profile=/tp/UserProfiles/Game.xml".to_string(),
                "--foo".to_string(),
                "--bar".to_string(),
            ]
        );
    }

    #[test]
    fn test_find_profile() {
        let profiles = vec![profile("Time Crisis 5", ""), profile("Daytona", "")];
        assert_eq!(
            find_profile(&profiles, "time crisis 5").map(|p| p.name.as_str()),
            Some("Time Crisis 5")
        );
        assert_eq!(
            find_profile(&profiles, "DAYTONA").map(|p| p.name.as_str()),
            Some("Daytona")
        );
        assert!(find_profile(&profiles, "Outrun").is_none());
    }

    #[test]
    fn test_launch_requires_existing_exe() {
        let p = profile("Game", "");
        let err = LaunchOptions::default().launch(&p).unwrap_err();
        assert!(err.is_not_found());

        let options = LaunchOptions {
            exe: "/no/such/TeknoParrotUi.exe".to_string(),
            ..LaunchOptions::default()
        };
        assert!(options.launch(&p).unwrap_err().is_not_found());
    }

    #[test]
    fn test_bat_script_absolute_exe() {
        let options = LaunchOptions {
            exe: r"C:\TeknoParrot\TeknoParrotUi.exe".to_string(),
            start_minimized: true,
            extra_args: String::new(),
        };
        let script = options.bat_script(&profile("Game", ""));
        assert_eq!(
            script,
            "@echo off\r\n\
             REM TeknoParrot launcher for profile: Game\r\n\
             cd /d \"C:\\TeknoParrot\"\r\n\
             start \"\" \"TeknoParrotUi.exe\" --startMinimized --profile=\"/tp/UserProfiles/Game.xml\"\r\n\
             exit\r\n"
        );
    }

    #[test]
    fn test_bat_script_relative_exe() {
        let options = LaunchOptions {
            exe: String::new(),
            start_minimized: false,
            extra_args: "-x".to_string(),
        };
        let script = options.bat_script(&profile("Game", ""));
        assert!(!script.contains("cd /d"));
        assert!(script.contains("start \"\" \"TeknoParrotUi.exe\" --profile="));
        assert!(script.contains(".xml\" -x\r\n"));
    }

    #[test]
    fn test_split_exe_root() {
        assert_eq!(split_exe(r"C:\x.exe"), Some((r"C:\", "x.exe")));
        assert_eq!(split_exe("/opt/tp/x.exe"), Some(("/opt/tp", "x.exe")));
        assert_eq!(split_exe("x.exe"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Time Crisis: 5 <DX>?"), "Time Crisis_ 5 _DX__");
        assert_eq!(sanitize_filename(" a/b\\c\t "), "a_b_c_");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_listing() {
        let profiles = vec![profile("Alpha", ""), profile(" Beta ", "")];
        assert_eq!(listing(&profiles), "Alpha = Alpha\nBeta = Beta");
    }

    #[test]
    fn test_dump_to_ini() {
        let mut doc = IniDocument::parse("[Old Game]\r\nShortName=old\r\nGamePath=x\r\n");
        let mut p = profile("Old Game", "");
        p.xml_path = PathBuf::from("/up/OG.xml");
        let options = LaunchOptions {
            exe: r"C:\TP\TeknoParrotUi.exe".to_string(),
            start_minimized: false,
            extra_args: String::new(),
        };

        assert_eq!(dump_to_ini(&mut doc, &[p], &options).unwrap(), 1);
        assert_eq!(doc.get("Old Game", "ShortName"), Some("OG"));
        assert_eq!(
            doc.get("Old Game", "FadeTitle"),
            Some("Play! - [ OG ] - TeknoParrot")
        );
        assert_eq!(
            doc.get("Old Game", "CommandLine"),
            Some(r#"TeknoParrotUi.exe --profile="/up/OG.xml""#)
        );
        assert!(!doc.contains("Old Game", "GamePath"));
        assert!(doc.to_text().starts_with("[Old Game]\r\nShortName=OG\r\n"));
    }
}
