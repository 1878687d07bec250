//! Benchlog error types and formatting
//!
//! **`BenchError`** is a typed enum for domain errors that can be
//! pattern-matched and tested. Use `.into()` to convert to `anyhow::Error`
//! while preserving the type for `downcast_ref`. Display produces styled
//! output for users; the binary strips the styling when colour is off.
//!
//! Cache read/write failures are deliberately absent: they are logged where
//! they happen and degrade to an empty cache.

use std::path::PathBuf;

use color_print::{cformat, cwrite};

use crate::styling::{ERROR_EMOJI, HINT_EMOJI, format_with_gutter};

/// Domain errors for package resolution, sandboxing and benchmark execution.
///
/// # Usage
///
/// ```ignore
/// // Return a typed error (Display produces styled output)
/// return Err(BenchError::InvalidArgument { message: "no packages".into() }.into());
///
/// // Pattern match on errors
/// if let Some(BenchError::HarnessFailure { stderr, .. }) = err.downcast_ref() {
///     eprintln!("{stderr}");
/// }
/// ```
#[derive(Debug, Clone)]
pub enum BenchError {
    /// Package selectors matched nothing, matched something outside version
    /// control, or span more than one repository.
    Resolution {
        message: String,
        hint: Option<String>,
    },
    /// Exporting a tree into a sandbox failed.
    Checkout {
        revision: String,
        path: PathBuf,
        output: String,
    },
    /// The benchmark harness exited with a non-zero status.
    HarnessFailure { package: String, stderr: String },
    /// The harness could not be run or produced output we cannot use.
    Execution { message: String },
    /// Bad threshold, filter, or package list.
    InvalidArgument { message: String },
    /// A git invocation failed.
    Git { command: String, stderr: String },
    SandboxAlreadyOpen { revision: String },
    DuplicateBenchmark { name: String },
}

impl std::error::Error for BenchError {}

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchError::Resolution { message, hint } => {
                cwrite!(f, "{ERROR_EMOJI} <red>Cannot resolve packages: {message}</>")?;
                match hint {
                    Some(hint) => cwrite!(f, "\n\n{HINT_EMOJI} <dim>{hint}</>"),
                    None => Ok(()),
                }
            }

            BenchError::Checkout {
                revision,
                path,
                output,
            } => {
                let header = cformat!(
                    "{ERROR_EMOJI} <red>Could not check out <bold>{revision}</> to <bold>{}</></>",
                    path.display()
                );
                write!(f, "{}", format_error_block(header, output))
            }

            BenchError::HarnessFailure { package, stderr } => {
                let header =
                    cformat!("{ERROR_EMOJI} <red>Benchmarks failed in <bold>{package}</></>");
                write!(f, "{}", format_error_block(header, stderr))
            }

            BenchError::Execution { message } => {
                cwrite!(f, "{ERROR_EMOJI} <red>{message}</>")
            }

            BenchError::InvalidArgument { message } => {
                cwrite!(f, "{ERROR_EMOJI} <red>Invalid argument: {message}</>")
            }

            BenchError::Git { command, stderr } => {
                let header = cformat!("{ERROR_EMOJI} <red>Command failed: <bold>{command}</></>");
                write!(f, "{}", format_error_block(header, stderr))
            }

            BenchError::SandboxAlreadyOpen { revision } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Sandbox for <bold>{revision}</> is already open</>"
                )
            }

            BenchError::DuplicateBenchmark { name } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Benchmark <bold>{name}</> is already present</>"
                )
            }
        }
    }
}

impl BenchError {
    pub(crate) fn execution(message: impl Into<String>) -> Self {
        BenchError::Execution {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        BenchError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn resolution(message: impl Into<String>) -> Self {
        BenchError::Resolution {
            message: message.into(),
            hint: None,
        }
    }

    pub(crate) fn multiple_repositories() -> Self {
        BenchError::Resolution {
            message: "packages span multiple git repositories".into(),
            hint: Some("Packages must all live in one git repository".into()),
        }
    }
}

/// Reading or spawning the harness failed; I/O on our own files is handled
/// where it happens.
impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        BenchError::execution(format!("benchmark harness I/O failed: {e}"))
    }
}

/// Format an error with header and gutter content
fn format_error_block(header: String, error: &str) -> String {
    let trimmed = error.trim();
    if trimmed.is_empty() {
        header
    } else {
        format!("{header}\n{}", format_with_gutter(trimmed))
    }
}
