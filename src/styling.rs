//! Styling helpers for terminal output.
//!
//! Colour is never ambient state here: every helper that may emit ANSI codes
//! takes an explicit `colored` flag, resolved once from configuration and
//! threaded through by the caller.

mod constants;

pub use constants::*;

use anstyle::Style;

/// Wrap `text` in `style` when `colored` is set, otherwise return it unchanged.
pub fn paint(text: &str, style: Style, colored: bool) -> String {
    if colored {
        format!("{}{text}{}", style.render(), style.render_reset())
    } else {
        text.to_string()
    }
}

/// Style for a percentage change in ns/op: more time is a regression.
pub fn delta_style(change: f32) -> Style {
    if change > 0.0 {
        REGRESSION
    } else {
        IMPROVEMENT
    }
}

/// Format quoted tool output with a gutter bar on each line.
///
/// Used in error messages to set git or harness diagnostics apart from our
/// own wording. Trailing blank lines are dropped.
pub fn format_with_gutter(content: &str) -> String {
    let gutter = GUTTER;
    let mut output = String::new();
    for line in content.trim_end().lines() {
        output.push_str(&format!("{gutter} {gutter:#} {line}\n"));
    }
    output
}
