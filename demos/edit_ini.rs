//! Load, inspect and edit an INI file without disturbing its formatting.
//!
//! ```bash
//! cargo run --example edit_ini
//! ```

use cabinet::{IniDocument, ValueKind, render_edit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Cabinet INI Editing Example ===\n");

    let source = "\
; HyperSpin main menu
[Main]
Menu_Mode = multi
Single_Mode_Name=
Enable_Exit=TRUE

[Wheel]
Alpha = 0.15
Speed = high
Text_Color1=0xFFFFFF
";

    let mut doc = IniDocument::parse(source);
    println!("Sections: {:?}", doc.sections());
    println!("Entries:  {}\n", doc.len());

    for section in doc.sections() {
        println!("[{}]", section);
        for (key, value) in doc.items(section) {
            let kind = ValueKind::classify(value);
            println!("  {:<18} {:<10} ({})", key, value, kind.type_name());
        }
    }

    // Typed edit: the boolean keeps the file's spelling style
    let original = doc.get("Main", "Enable_Exit").unwrap_or_default().to_string();
    let edited = render_edit(&original, &ValueKind::Boolean(false));
    doc.set("Main", "Enable_Exit", &edited)?;
    println!("\nEnable_Exit: {} -> {}", original, edited);

    // Plain edits and an insert
    doc.set("Wheel", "Alpha", "0.3")?;
    doc.set("Wheel", "Text_Color2", "0xFF0000")?;
    doc.remove("Main", "Single_Mode_Name");

    println!("\n--- Edited document ---\n{}", doc);
    Ok(())
}
