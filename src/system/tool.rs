//! External 7-Zip executable adapter: location, subprocess driving,
//! progress parsing and cooperative teardown.

use crate::engine::progress::CancelToken;
use crate::utils::error::{EngineError, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// How long the tool may stay silent before it is considered hung.
const STALL_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(windows)]
const CANDIDATE_NAMES: &[&str] = &["7z.exe"];
#[cfg(not(windows))]
const CANDIDATE_NAMES: &[&str] = &["7zz", "7z", "7za"];

static LOCATED: OnceLock<Option<SevenZipTool>> = OnceLock::new();

/// Handle to a located 7-Zip executable.
#[derive(Debug, Clone)]
pub struct SevenZipTool {
    path: PathBuf,
}

enum ToolLine {
    Out(String),
    Err(String),
}

impl SevenZipTool {
    /// Locates a compatible executable, checking well-known install
    /// locations and then the PATH search. The result is memoized for the
    /// process lifetime.
    pub fn locate() -> Result<Self> {
        LOCATED
            .get_or_init(|| locate_from(&probe_dirs(), CANDIDATE_NAMES))
            .clone()
            .ok_or(EngineError::ToolUnavailable)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the tool to completion, streaming `-bsp1` percent output into
    /// `on_percent`. Kills the subprocess and waits for teardown when
    /// cancellation is requested or when no output arrives for
    /// [`STALL_TIMEOUT`]; the caller is responsible for deleting any
    /// partial output it asked the tool to produce.
    pub fn run(
        &self,
        args: &[OsString],
        cwd: Option<&Path>,
        on_percent: &mut dyn FnMut(u8),
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut command = Command::new(&self.path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        // Arguments carry the password, so only the program path is logged.
        log::debug!("running external tool: {}", self.path.display());

        let mut child = command
            .spawn()
            .map_err(|e| EngineError::ToolExecutionFailed {
                reason: format!("failed to spawn {}: {}", self.path.display(), e),
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, tx.clone(), ToolLine::Out);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, tx.clone(), ToolLine::Err);
        }
        drop(tx);

        let mut diagnostics = String::new();
        let mut last_output = Instant::now();
        loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Cancelled);
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(ToolLine::Out(line)) => {
                    last_output = Instant::now();
                    if let Some(percent) = parse_percent(&line) {
                        on_percent(percent);
                    }
                }
                Ok(ToolLine::Err(line)) => {
                    last_output = Instant::now();
                    log::debug!("tool stderr: {}", line);
                    diagnostics.push_str(&line);
                    diagnostics.push('\n');
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_output.elapsed() > STALL_TIMEOUT {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(EngineError::ToolExecutionFailed {
                            reason: format!(
                                "no output for {} seconds, assuming the tool hung",
                                STALL_TIMEOUT.as_secs()
                            ),
                        });
                    }
                }
                // Both stream readers finished; the process is exiting.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let status = child.wait().map_err(EngineError::Io)?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if status.success() {
            return Ok(());
        }

        let diagnostics = diagnostics.trim().to_string();
        if diagnostics.to_ascii_lowercase().contains("wrong password") {
            return Err(EngineError::WrongPassword);
        }
        Err(EngineError::ToolExecutionFailed {
            reason: format!("{}: {}", status, diagnostics),
        })
    }
}

fn probe_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    #[cfg(windows)]
    {
        dirs.push(PathBuf::from("C:\\Program Files\\7-Zip"));
        dirs.push(PathBuf::from("C:\\Program Files (x86)\\7-Zip"));
    }
    #[cfg(not(windows))]
    {
        dirs.push(PathBuf::from("/usr/local/bin"));
        dirs.push(PathBuf::from("/usr/bin"));
        dirs.push(PathBuf::from("/opt/homebrew/bin"));
    }
    if let Some(path_var) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path_var));
    }
    dirs
}

fn locate_from(dirs: &[PathBuf], names: &[&str]) -> Option<SevenZipTool> {
    for dir in dirs {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                log::info!("using 7-Zip executable: {}", candidate.display());
                return Some(SevenZipTool { path: candidate });
            }
        }
    }
    None
}

/// Reads a stream on its own thread, splitting on `\r` as well as `\n`
/// since 7-Zip redraws its progress line with carriage returns.
fn spawn_line_reader<R: Read + Send + 'static>(
    mut reader: R,
    tx: Sender<ToolLine>,
    wrap: fn(String) -> ToolLine,
) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut line = Vec::new();
        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for &byte in &buf[..read] {
                if byte == b'\n' || byte == b'\r' {
                    if !line.is_empty() {
                        let text = String::from_utf8_lossy(&line).into_owned();
                        line.clear();
                        if tx.send(wrap(text)).is_err() {
                            return;
                        }
                    }
                } else {
                    line.push(byte);
                }
            }
        }
        if !line.is_empty() {
            let _ = tx.send(wrap(String::from_utf8_lossy(&line).into_owned()));
        }
    });
}

/// Parses the percentage from a `-bsp1` progress line such as
/// `" 42% 3 + data.bin"`.
fn parse_percent(line: &str) -> Option<u8> {
    let prefix = &line[..line.find('%')?];
    let value: u32 = prefix.split_whitespace().last()?.parse().ok()?;
    Some(value.min(100) as u8)
}
