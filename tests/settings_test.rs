use cabinet::Settings;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(dir.path().join("settings.json"));
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_corrupt_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ \"exe\": ").unwrap();
    assert_eq!(Settings::load(&path), Settings::default());
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let settings = Settings {
        exe: r"C:\TeknoParrot\TeknoParrotUi.exe".to_string(),
        start_minimized: false,
        last_category: "LIGHTGUN".to_string(),
        drive_letter: "F".to_string(),
        ..Settings::default()
    };
    settings.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"exe\": "));

    assert_eq!(Settings::load(&path), settings);
}

#[test]
fn test_unknown_keys_survive_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{"ffmpeg_path": "C:\\ffmpeg\\ffmpeg.exe", "window": {"w": 800, "h": 600}}"#,
    )
    .unwrap();

    let mut settings = Settings::load(&path);
    assert_eq!(settings.ffmpeg_path, r"C:\ffmpeg\ffmpeg.exe");
    settings.last_folder = "videos".to_string();
    settings.save(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["window"]["w"], 800);
    assert_eq!(value["last_folder"], "videos");
    assert_eq!(value["start_minimized"], true);
}
