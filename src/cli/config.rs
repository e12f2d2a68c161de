use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::models::ViewMode;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path, Settings};

pub fn show() -> Result<()> {
    println!("{}", format_settings(&load_settings()));
    println!("Stored at {}", settings_path().display());
    Ok(())
}

pub fn set_mode(mode: &str) -> Result<()> {
    let mode: ViewMode = mode.parse()?;
    let mut settings = load_settings();
    settings.default_view_mode = mode.as_str().to_string();
    save_settings(&settings)?;
    println!("Default view mode set to {mode}.");
    Ok(())
}

pub fn set_file(path: &str) -> Result<()> {
    let resolved = shellexpand_path(path);
    let mut settings = load_settings();
    settings.payload_path = Some(resolved.clone());
    save_settings(&settings)?;
    println!("Default payload file set to {resolved}.");
    Ok(())
}

pub fn format_settings(settings: &Settings) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("default_view_mode"), Cell::new(&settings.default_view_mode)]);
    table.add_row(vec![
        Cell::new("payload_path"),
        Cell::new(settings.payload_path.as_deref().unwrap_or("(not set)")),
    ]);
    table.add_row(vec![
        Cell::new("log_level"),
        Cell::new(settings.log_level.as_deref().unwrap_or("(default)")),
    ]);
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_settings_defaults() {
        let out = format_settings(&Settings::default());
        assert!(out.contains("comparative"));
        assert!(out.contains("(not set)"));
        assert!(out.contains("(default)"));
    }
}
