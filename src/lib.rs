//! # Cabinet
//!
//! Format-preserving INI editing and batch tooling for arcade frontend setups
//! (HyperSpin, TeknoParrot).
//!
//! The core is [`IniDocument`]: an INI file held as its raw lines plus an index of
//! `(section, key)` entries. Reading never rewrites anything, and editing a value changes
//! only that value's text on its own line. Comments, blank lines, ordering, whitespace,
//! line endings and the file's encoding all survive a load/edit/save cycle.
//!
//! ## Features
//!
//! - **Format-preserving INI**: [`IniDocument`] with get/set/remove and byte-exact round trips
//! - **Value typing**: [`ValueKind`] classifies values as boolean, color, integer, float or text
//! - **Settings**: [`Settings`] persisted as a flat JSON object
//! - **Profiles**: [`teknoparrot`] profile scanning, categories, `.bat` launchers and INI dumps
//! - **Relocation**: [`relocate`] drive-letter swaps and PC game path rebasing
//! - **Batches**: [`jobs`] runs external tools one at a time ([`media`] for ffmpeg,
//!   [`xiso`] for ISO packing)
//!
//! ## Example
//!
//! ```rust
//! use cabinet::{IniDocument, ValueKind};
//!
//! let mut doc = IniDocument::parse("; wheel\n[Main]\nspeed = 5\nshow_clock=true\n");
//!
//! assert_eq!(doc.get("Main", "speed"), Some("5"));
//! assert_eq!(ValueKind::classify("true"), ValueKind::Boolean(true));
//!
//! doc.set("Main", "speed", "7").unwrap();
//! doc.set("Main", "theme", "dark").unwrap();
//!
//! assert_eq!(
//!     doc.to_text(),
//!     "; wheel\n[Main]\nspeed = 7\nshow_clock=true\ntheme=dark\n"
//! );
//! ```
//!
//! ## Batches
//!
//! ```rust,no_run
//! use cabinet::jobs::{BatchDriver, CommandRunner};
//! use cabinet::xiso;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let jobs = xiso::scan_isos("isos")?
//!     .iter()
//!     .map(|iso| xiso::pack_job(Path::new("xdvdfs"), iso))
//!     .collect::<Vec<_>>();
//!
//! let driver = BatchDriver::new();
//! for report in driver.run(jobs, &mut CommandRunner, &mut ())? {
//!     println!("{}: {}", report.label, report.status);
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
mod document;
mod error;
mod line;
mod settings;
mod value;

pub mod hyperspin;
pub mod jobs;
pub mod media;
pub mod relocate;
pub mod teknoparrot;
pub mod xiso;
pub mod xml;

// Public API exports
pub use document::{Entry, IniDocument};
pub use error::{Error, Result};
pub use line::{EntryParts, LineKind, TextEncoding, classify, split_lines};
pub use settings::{SETTINGS_FILE, Settings};
pub use value::{
    HexColor, ValueKind, format_bool, format_float, parse_bool, parse_float, parse_int,
    render_edit,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let text = "; comment\r\n[A]\r\n  foo = 1  \r\n\r\n[B]\r\nbar=2";
        assert_eq!(IniDocument::parse(text).to_text(), text);
    }

    #[test]
    fn test_edit_one_value() {
        let mut doc = IniDocument::parse("[A]\nfoo=1\n[B]\nbar=2\n");
        doc.set("A", "foo", "9").unwrap();
        doc.set("B", "baz", "x").unwrap();
        assert_eq!(doc.to_text(), "[A]\nfoo=9\n[B]\nbar=2\nbaz=x\n");
    }

    #[test]
    fn test_value_typing() {
        assert_eq!(ValueKind::classify("0xFF00FF").type_name(), "color");
        assert_eq!(ValueKind::classify("42").type_name(), "int");
        assert_eq!(ValueKind::classify("1.5").type_name(), "float");
        assert_eq!(ValueKind::classify("hello").type_name(), "text");
    }

    #[test]
    fn test_classify_lines() {
        assert!(matches!(classify("[Main]"), LineKind::Section { .. }));
        assert!(matches!(classify("k=v"), LineKind::Entry(_)));
        assert_eq!(classify("; note"), LineKind::Other);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.start_minimized);
    }
}
