//! Style constants and emojis for terminal output
//!
//! Two complementary approaches are used:
//!
//! - `color-print` (`cformat!`, `cwrite!`) with HTML-like tags for messages,
//!   e.g. `cformat!("<red>Checkout of <bold>{rev}</> failed</>")`.
//! - `anstyle` constants below for computed styles, such as colouring a
//!   benchmark delta by its sign.
//!
//! | Semantic | color-print tag | anstyle constant |
//! |----------|-----------------|------------------|
//! | Error / regression | `<red>` | `ERROR`, `REGRESSION` |
//! | Warning | `<yellow>` | |
//! | Hint | `<dim>` | |
//! | Improvement / success | `<green>` | `IMPROVEMENT` |

use anstyle::{AnsiColor, Color, Style};

/// Error style (red) - for programmatic use; prefer `<red>` in cformat!
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// A benchmark got slower (more ns/op).
pub const REGRESSION: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// A benchmark got faster (fewer ns/op).
pub const IMPROVEMENT: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Gutter style for quoted tool output (git and harness diagnostics)
pub const GUTTER: Style = Style::new().bg_color(Some(Color::Ansi(AnsiColor::BrightWhite)));

/// Error emoji: `cwrite!(f, "{ERROR_EMOJI} <red>message</>")`
pub const ERROR_EMOJI: &str = "❌";

/// Warning emoji: `cwrite!(f, "{WARNING_EMOJI} <yellow>message</>")`
pub const WARNING_EMOJI: &str = "🟡";

/// Hint emoji: `cwrite!(f, "{HINT_EMOJI} <dim>message</>")`
pub const HINT_EMOJI: &str = "💡";

/// Success emoji: `cformat!("{SUCCESS_EMOJI} <green>message</>")`
pub const SUCCESS_EMOJI: &str = "✅";
