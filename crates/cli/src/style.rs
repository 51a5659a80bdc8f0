//! Shared styling utilities for the CLI.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Text removed from the first input (red).
pub fn removed(text: &str) -> String {
    Style::new().red().apply_to(text).to_string()
}

/// Text added by the second input (green).
pub fn added(text: &str) -> String {
    Style::new().green().apply_to(text).to_string()
}

/// Changed words inside a removed line.
pub fn removed_emphasis(text: &str) -> String {
    Style::new().red().bold().underlined().apply_to(text).to_string()
}

/// Changed words inside an added line.
pub fn added_emphasis(text: &str) -> String {
    Style::new().green().bold().underlined().apply_to(text).to_string()
}

/// Merge window kind label (cyan).
pub fn kind(label: &str) -> String {
    Style::new().cyan().apply_to(label).to_string()
}
