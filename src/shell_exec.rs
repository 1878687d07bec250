//! Running external tools (git and the benchmark harness).
//!
//! Two shapes are supported:
//!
//! - [`run`]: wait for the process and capture stdout and stderr.
//! - [`stream_lines`]: hand stdout to the caller line by line while the
//!   process is still running, capturing stderr in parallel.
//!
//! Every invocation is logged at debug level as a copy-pasteable command
//! line.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;

use anstyle::Style;
use crossbeam_channel::unbounded;

/// Render `cmd` as a shell command line, including environment overrides
/// and the working directory when one is set.
pub fn describe(cmd: &Command) -> String {
    fn quote(s: &OsStr) -> String {
        shell_escape::escape(Cow::Owned(s.to_string_lossy().into_owned())).into_owned()
    }

    let mut parts = Vec::new();
    if let Some(dir) = cmd.get_current_dir() {
        parts.push(format!("cd {} &&", quote(dir.as_os_str())));
    }
    for (key, value) in cmd.get_envs() {
        if let Some(value) = value {
            parts.push(format!("{}={}", key.to_string_lossy(), quote(value)));
        }
    }
    parts.push(quote(cmd.get_program()));
    parts.extend(cmd.get_args().map(quote));
    parts.join(" ")
}

/// Run `cmd` to completion, capturing its output.
///
/// Spawn failures are returned as I/O errors; a non-zero exit is not an
/// error here, callers classify it from `Output::status`.
pub fn run(cmd: &mut Command) -> io::Result<Output> {
    log::debug!("$ {}", describe(cmd));
    cmd.stdin(Stdio::null()).output()
}

/// Result of a streamed process once both output pipes are drained.
#[derive(Debug)]
pub struct StreamedOutput {
    pub status: ExitStatus,
    pub stderr: Vec<u8>,
}

/// Run `cmd`, calling `on_line` for each stdout line as it is produced.
///
/// Stdout is drained by a reader thread that pushes lines into a channel;
/// the calling thread consumes them as they arrive, so results are visible
/// before the process exits. Stderr is drained by a second thread that
/// echoes it to our stderr (painted with `stderr_style` if given) and keeps
/// a copy. Neither pipe can fill up and stall the child.
///
/// The first error wins: a failing `on_line` or a read error on stdout kills
/// the child and is returned once the child has been reaped. The reader
/// threads are not joined on that path, since processes the child started
/// may still hold the pipes; they finish when the pipes close.
///
/// Lines are passed without their terminator. Bytes that are not UTF-8 are
/// replaced, never rejected.
pub fn stream_lines<E, F>(
    cmd: &mut Command,
    stderr_style: Option<Style>,
    mut on_line: F,
) -> Result<StreamedOutput, E>
where
    E: From<io::Error>,
    F: FnMut(&str) -> Result<(), E>,
{
    log::debug!("$ {}", describe(cmd));
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");

    let (tx, rx) = unbounded::<io::Result<String>>();
    let stdout_reader = thread::spawn(move || {
        for line in BufReader::new(stdout).split(b'\n') {
            let line = line.map(|mut bytes| {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                String::from_utf8_lossy(&bytes).into_owned()
            });
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    let stderr_reader = thread::spawn(move || tee_stderr(stderr, stderr_style));

    let mut first_error: Option<E> = None;
    for line in rx {
        match line {
            Ok(line) => {
                if let Err(e) = on_line(&line) {
                    first_error = Some(e);
                    break;
                }
            }
            Err(e) => {
                first_error = Some(e.into());
                break;
            }
        }
    }

    if let Some(e) = first_error {
        kill(&mut child);
        let _ = child.wait();
        drop(stdout_reader);
        drop(stderr_reader);
        return Err(e);
    }

    let status = child.wait();
    // Stdout is already at EOF here: the channel only closes when its
    // reader finishes.
    let _ = stdout_reader.join();
    let stderr = stderr_reader.join().unwrap_or_default();
    Ok(StreamedOutput {
        status: status?,
        stderr,
    })
}

/// Copy `pipe` to our stderr while keeping everything that was read.
fn tee_stderr(mut pipe: impl Read, style: Option<Style>) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Stopped reading child stderr: {e}");
                break;
            }
        };
        captured.extend_from_slice(&buf[..n]);

        let mut out = io::stderr().lock();
        let _ = match style {
            Some(style) => write!(
                out,
                "{}{}{}",
                style.render(),
                String::from_utf8_lossy(&buf[..n]),
                style.render_reset()
            ),
            None => out.write_all(&buf[..n]),
        };
    }
    captured
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("Failed to kill child process {}: {e}", child.id());
    }
}
