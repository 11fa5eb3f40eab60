use cabinet::{Error, IniDocument, TextEncoding};
use std::fs;
use tempfile::TempDir;

const GLOBAL_SETTINGS: &str = "; HyperSpin global settings\r\n\
[Main]\r\n\
Menu_Mode = multi\r\n\
Enable_Exit=true\r\n\
\r\n\
[Resolution]\r\n\
  FullScreen = true  \r\n\
Width=1920\r\n\
; trailing comment\r\n";

#[test]
fn test_round_trip_is_byte_exact() {
    let inputs = [
        GLOBAL_SETTINGS,
        "[A]\nfoo=1\n[B]\nbar=2",
        "no sections at all\n= orphan\n;x=y\n",
        "[A]\rk=v\r\n[B]\nk2 = v2 ",
        "",
        "\n\n\n",
        "[Ünïcödé]\nclé=valeur ✓\n",
    ];

    for text in inputs {
        let doc = IniDocument::parse(text);
        assert_eq!(doc.to_text(), text, "round trip changed {:?}", text);
    }
}

#[test]
fn test_read_values() {
    let doc = IniDocument::parse(GLOBAL_SETTINGS);
    assert_eq!(doc.get("Main", "Menu_Mode"), Some("multi"));
    assert_eq!(doc.get("Resolution", "FullScreen"), Some("true"));
    assert_eq!(doc.get(" Resolution ", " Width "), Some("1920"));
    assert_eq!(doc.get("Main", "menu_mode"), None);
    assert_eq!(doc.get("Missing", "Menu_Mode"), None);
    assert_eq!(doc.sections(), &["Main".to_string(), "Resolution".to_string()]);
    assert_eq!(doc.len(), 4);
}

#[test]
fn test_set_existing_changes_only_that_line() {
    let mut doc = IniDocument::parse(GLOBAL_SETTINGS);
    doc.set("Resolution", "FullScreen", "false").unwrap();

    let expected = GLOBAL_SETTINGS.replace("  FullScreen = true  \r\n", "  FullScreen = false  \r\n");
    assert_eq!(doc.to_text(), expected);
    assert_eq!(doc.get("Resolution", "FullScreen"), Some("false"));
}

#[test]
fn test_set_same_value_is_noop() {
    let mut doc = IniDocument::parse(GLOBAL_SETTINGS);
    doc.set("Main", "Menu_Mode", "multi").unwrap();
    assert_eq!(doc.to_text(), GLOBAL_SETTINGS);
}

#[test]
fn test_set_new_key_goes_to_end_of_section() {
    let mut doc = IniDocument::parse("[A]\nfoo=1\n[B]\nbar=2\n");
    doc.set("A", "foo", "9").unwrap();
    doc.set("B", "baz", "x").unwrap();
    doc.set("A", "new", "y").unwrap();
    assert_eq!(doc.to_text(), "[A]\nfoo=9\nnew=y\n[B]\nbar=2\nbaz=x\n");
    assert_eq!(doc.get("B", "baz"), Some("x"));
    assert_eq!(doc.get("A", "new"), Some("y"));
}

#[test]
fn test_set_new_key_uses_document_line_endings() {
    let mut doc = IniDocument::parse(GLOBAL_SETTINGS);
    doc.set("Main", "Theme", "Default").unwrap();
    assert!(
        doc.to_text()
            .contains("Enable_Exit=true\r\n\r\nTheme=Default\r\n[Resolution]")
    );
}

#[test]
fn test_set_new_section_appends_header() {
    let mut doc = IniDocument::parse("[A]\nfoo=1");
    doc.set("B", "bar", "2").unwrap();
    assert_eq!(doc.to_text(), "[A]\nfoo=1\n[B]\nbar=2\n");
    assert_eq!(doc.sections(), &["A".to_string(), "B".to_string()]);
}

#[test]
fn test_set_in_preamble() {
    let mut doc = IniDocument::parse("; header\n[A]\nfoo=1\n");
    doc.set("", "version", "2").unwrap();
    assert_eq!(doc.to_text(), "; header\nversion=2\n[A]\nfoo=1\n");
    assert_eq!(doc.get("", "version"), Some("2"));
}

#[test]
fn test_set_flattens_line_breaks() {
    let mut doc = IniDocument::parse("[A]\nk=v\n");
    doc.set("A", "k", "one\ntwo\r\nthree").unwrap();
    assert_eq!(doc.get("A", "k"), Some("one two  three"));
    assert_eq!(doc.to_text().lines().count(), 2);
}

#[test]
fn test_duplicate_key_last_wins() {
    let mut doc = IniDocument::parse("[A]\nk=first\nk=second\n");
    assert_eq!(doc.get("A", "k"), Some("second"));

    doc.set("A", "k", "third").unwrap();
    assert_eq!(doc.to_text(), "[A]\nk=first\nk=third\n");
}

#[test]
fn test_repeated_section_header_merges() {
    let doc = IniDocument::parse("[A]\nx=1\n[B]\ny=2\n[A]\nz=3\n");
    assert_eq!(doc.sections(), &["A".to_string(), "B".to_string()]);
    assert_eq!(doc.items("A"), vec![("x", "1"), ("z", "3")]);
}

#[test]
fn test_remove() {
    let mut doc = IniDocument::parse("[A]\nfoo=1\nbar=2\n");
    assert!(doc.remove("A", "foo"));
    assert!(!doc.remove("A", "foo"));
    assert_eq!(doc.to_text(), "[A]\nbar=2\n");
    assert_eq!(doc.entry("A", "bar").map(|e| e.line_index), Some(1));
}

#[test]
fn test_items_sorted_case_insensitively() {
    let doc = IniDocument::parse("[S]\nzeta=1\nAlpha=2\nbeta=3\n");
    assert_eq!(
        doc.items("S"),
        vec![("Alpha", "2"), ("beta", "3"), ("zeta", "1")]
    );
}

#[test]
fn test_comment_lines_are_not_entries() {
    let doc = IniDocument::parse("[A]\n;k=v\n# note\nreal = 1\n");
    assert_eq!(doc.len(), 1);
    assert!(!doc.contains("A", ";k"));
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = IniDocument::load(dir.path().join("nope.ini")).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(err.is_not_found());
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Global Settings.ini");
    fs::write(&path, GLOBAL_SETTINGS).unwrap();

    let mut doc = IniDocument::load(&path).unwrap();
    doc.set("Main", "Menu_Mode", "single").unwrap();
    doc.save().unwrap();

    let on_disk = fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, GLOBAL_SETTINGS.replace("multi", "single"));

    doc.set("Main", "Menu_Mode", "scratch").unwrap();
    doc.reload().unwrap();
    assert_eq!(doc.get("Main", "Menu_Mode"), Some("single"));
}

#[test]
fn test_save_without_path_fails() {
    let doc = IniDocument::parse("[A]\n");
    assert!(doc.save().is_err());
}

#[test]
fn test_save_as_sets_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.ini");

    let mut doc = IniDocument::new();
    doc.set("Main", "k", "v").unwrap();
    doc.save_as(&path).unwrap();

    assert_eq!(doc.path(), Some(path.as_path()));
    assert_eq!(fs::read_to_string(&path).unwrap(), "[Main]\nk=v\n");
}

#[test]
fn test_encoding_preserved_on_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.ini");
    let original = TextEncoding::Utf16Le.encode("[Main]\r\nk=v\r\n");
    fs::write(&path, &original).unwrap();

    let mut doc = IniDocument::load(&path).unwrap();
    assert_eq!(doc.encoding(), TextEncoding::Utf16Le);
    assert_eq!(doc.get("Main", "k"), Some("v"));

    doc.set("Main", "k", "w").unwrap();
    doc.save().unwrap();
    assert_eq!(
        fs::read(&path).unwrap(),
        TextEncoding::Utf16Le.encode("[Main]\r\nk=w\r\n")
    );
}

#[test]
fn test_invalid_bytes_are_tolerated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.ini");
    fs::write(&path, b"[Main]\nname=Caf\xe9\nother=1\n").unwrap();

    let doc = IniDocument::load(&path).unwrap();
    assert_eq!(doc.get("Main", "other"), Some("1"));
    assert_eq!(doc.get("Main", "name"), Some("Caf\u{FFFD}"));
}

#[test]
fn test_set_bracketed_section_reads_back() {
    let mut doc = IniDocument::parse("[Old Game]\nShortName=OG\n");
    doc.set("Time Crisis 5 [Rev A]", "ShortName", "TC5").unwrap();
    doc.set("Time Crisis 5 [Rev A]", "FadeTitle", "x").unwrap();

    assert_eq!(
        doc.to_text(),
        "[Old Game]\nShortName=OG\n[Time Crisis 5 [Rev A]]\nShortName=TC5\nFadeTitle=x\n"
    );
    assert_eq!(doc.get("Old Game", "ShortName"), Some("OG"));
    assert_eq!(doc.get("Time Crisis 5 [Rev A]", "ShortName"), Some("TC5"));
    assert_eq!(doc.sections().len(), 2);
}

#[test]
fn test_set_rejects_keys_that_would_not_read_back() {
    let mut doc = IniDocument::parse("[A]\na=1\n");

    for key in ["a=b", "x;y", "[k", "", "two\nlines"] {
        let err = doc.set("A", key, "2").unwrap_err();
        assert!(matches!(err, Error::InvalidEntry { .. }), "{key:?}: {err}");
    }
    let err = doc.set("B\r\nC", "k", "v").unwrap_err();
    assert!(matches!(err, Error::InvalidEntry { .. }));

    assert_eq!(doc.to_text(), "[A]\na=1\n");
    assert_eq!(doc.get("A", "a"), Some("1"));
}

#[test]
fn test_failed_save_keeps_edits_for_retry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Global Settings.ini");
    fs::write(&path, GLOBAL_SETTINGS).unwrap();

    let mut doc = IniDocument::load(&path).unwrap();
    doc.set("Main", "Menu_Mode", "single").unwrap();

    // A directory in place of the file makes the write fail
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    let err = doc.save().unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
    assert_eq!(doc.get("Main", "Menu_Mode"), Some("single"));

    let retry = dir.path().join("retry.ini");
    doc.save_as(&retry).unwrap();
    assert_eq!(
        fs::read_to_string(&retry).unwrap(),
        GLOBAL_SETTINGS.replace("multi", "single")
    );
}
