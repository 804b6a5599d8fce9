//! Shared styling utilities for terminal output.

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

/// Create an informational string (cyan bullet).
pub fn info(msg: &str) -> String {
    let style = Style::new().cyan();
    format!("{} {}", style.apply_to("●"), msg)
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

/// Branch name label (blue, bold).
pub fn branch(name: &str) -> String {
    let style = Style::new().blue().bold();
    style.apply_to(name).to_string()
}

/// Commit id label (yellow).
pub fn commit(id: &str) -> String {
    let style = Style::new().yellow();
    style.apply_to(id).to_string()
}
