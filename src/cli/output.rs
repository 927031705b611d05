//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, checkmarks
//! - Red: errors
//! - Yellow: warnings
//! - Cyan: paths, commands, hints
//! - Dimmed: secondary info

use console::{style, StyledObject};

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint<D>(styled: StyledObject<D>) -> StyledObject<D> {
    if colors_enabled() {
        styled
    } else {
        styled.force_styling(false)
    }
}

/// Print a success message with checkmark (green).
///
/// Example: `✓ initialized /srv/vault/ossuary.toml`
pub fn success(msg: &str) {
    println!("{} {}", paint(style("✓").green()), msg);
}

/// Print an error message to stderr (red).
///
/// Example: `✗ secret does not exist: db/password`
pub fn error(msg: &str) {
    eprintln!("{} {}", paint(style("✗").red()), msg);
}

/// Print a warning message to stderr (yellow).
pub fn warn(msg: &str) {
    eprintln!("{} {}", paint(style("⚠").yellow()), msg);
}

/// Print a hint message to stderr (cyan).
///
/// Example: `→ run: ossuary init`
pub fn hint(msg: &str) {
    eprintln!("{} {}", paint(style("→").cyan()), paint(style(msg).cyan()));
}

/// Format a path in cyan for inline use.
pub fn path(p: &std::path::Path) -> String {
    paint(style(p.display())).cyan().to_string()
}

/// Format a command in green for inline use.
pub fn cmd(c: &str) -> String {
    paint(style(c)).green().to_string()
}

/// Print a dimmed/secondary message.
///
/// Example: `no secrets found`
pub fn dimmed(msg: &str) {
    println!("{}", paint(style(msg)).dim());
}
