//! The external tool boundary: source compilers and compressors.
//!
//! The pipeline treats every tool as an opaque `bytes -> bytes` function.
//! [`ExternalTool`] runs a separate process with a timeout; closures can stand
//! in for tools when embedding or testing.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use kiln_common::OutputKind;
use tracing::debug;

/// Default time allowed for one tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Failures reported by external tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// The program name.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Communicating with the running program failed.
    #[error("I/O error talking to {program}: {source}")]
    Io {
        /// The program name.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("{program} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// The program name.
        program: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// The program wrote diagnostics to stderr.
    #[error("stderr: {stderr}")]
    Diagnostics {
        /// The program name.
        program: String,
        /// What the program printed.
        stderr: String,
    },

    /// The program exited unsuccessfully without printing diagnostics.
    #[error("{program} exited with {status}")]
    Exit {
        /// The program name.
        program: String,
        /// The exit status description.
        status: String,
    },

    /// An in-process tool rejected its input.
    #[error("{0}")]
    Rejected(String),
}

/// Compiles one source language into its output language.
pub trait Transform: Send + Sync {
    /// Compiles `input`, returning the compiled bytes.
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, ToolError>;
}

impl<F> Transform for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, ToolError> + Send + Sync,
{
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, ToolError> {
        self(input)
    }
}

/// Minifies a finished artifact.
pub trait Compressor: Send + Sync {
    /// Compresses `input`, an artifact of the given kind.
    fn compress(&self, input: &[u8], kind: OutputKind) -> Result<Vec<u8>, ToolError>;
}

impl<F> Compressor for F
where
    F: Fn(&[u8], OutputKind) -> Result<Vec<u8>, ToolError> + Send + Sync,
{
    fn compress(&self, input: &[u8], kind: OutputKind) -> Result<Vec<u8>, ToolError> {
        self(input, kind)
    }
}

/// A command-line filter: input on stdin, output on stdout.
///
/// Anything printed on stderr counts as failure even when the exit status is
/// zero, since compilers commonly report problems there without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalTool {
    /// Creates a tool running `program` with `args` and the default timeout.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a tool from a command line such as `["lessc", "-"]`.
    ///
    /// Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Replaces the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the program on `input` and returns its stdout.
    ///
    /// The timeout covers the whole call, including draining stdout and
    /// stderr after the program exits. On expiry the program and anything it
    /// started in its process group are killed.
    pub fn run(&self, input: &[u8]) -> Result<Vec<u8>, ToolError> {
        debug!(program = %self.program, args = ?self.args, bytes = input.len(), "running tool");
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(|e| ToolError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        let (tx, rx) = mpsc::channel();
        let stdin = child.stdin.take();
        let data = input.to_vec();
        spawn_pipe(Pipe::Stdin, tx.clone(), move || {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&data) {
                    // The tool may exit without reading everything; its exit
                    // status and stderr tell the real story.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok(Vec::new())
        });
        let stdout = child.stdout.take();
        spawn_pipe(Pipe::Stdout, tx.clone(), move || read_all(stdout));
        let stderr = child.stderr.take();
        spawn_pipe(Pipe::Stderr, tx, move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    terminate(&mut child);
                    return Err(self.timeout_error());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    terminate(&mut child);
                    return Err(self.io_error(e));
                }
            }
        };

        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
        for _ in 0..3 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (pipe, result) = match rx.recv_timeout(remaining) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    debug!(program = %self.program, "output still open after exit");
                    terminate(&mut child);
                    return Err(self.timeout_error());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    terminate(&mut child);
                    return Err(self.io_error(std::io::Error::other("pipe thread panicked")));
                }
            };
            let bytes = result.map_err(|e| {
                terminate(&mut child);
                self.io_error(e)
            })?;
            match pipe {
                Pipe::Stdin => {}
                Pipe::Stdout => stdout = bytes,
                Pipe::Stderr => stderr = bytes,
            }
        }

        let stderr = String::from_utf8_lossy(&stderr);
        if !stderr.trim().is_empty() {
            return Err(ToolError::Diagnostics {
                program: self.program.clone(),
                stderr: stderr.trim_end().to_string(),
            });
        }
        if !status.success() {
            return Err(ToolError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(stdout)
    }

    fn timeout_error(&self) -> ToolError {
        ToolError::Timeout {
            program: self.program.clone(),
            timeout: self.timeout,
        }
    }

    fn io_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

impl Transform for ExternalTool {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, ToolError> {
        self.run(input)
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdin,
    Stdout,
    Stderr,
}

type PipeMessage = (Pipe, std::io::Result<Vec<u8>>);

/// Runs one pipe transfer on its own thread and reports the result on `tx`.
///
/// The thread is detached: if a leftover process keeps the pipe open it
/// finishes whenever that process exits or is killed.
fn spawn_pipe<F>(pipe: Pipe, tx: mpsc::Sender<PipeMessage>, transfer: F)
where
    F: FnOnce() -> std::io::Result<Vec<u8>> + Send + 'static,
{
    thread::spawn(move || {
        let _ = tx.send((pipe, transfer()));
    });
}

fn read_all<R: Read>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// Kills the child and, on unix, every process in its group, then reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = i32::try_from(child.id()) {
        // SAFETY: plain syscall; a negative pid addresses the child's group.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// One external compressor per output kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCompressor {
    /// Compressor for `.css` artifacts.
    pub style: ExternalTool,
    /// Compressor for `.js` artifacts.
    pub script: ExternalTool,
}

impl Compressor for ExternalCompressor {
    fn compress(&self, input: &[u8], kind: OutputKind) -> Result<Vec<u8>, ToolError> {
        match kind {
            OutputKind::Style => self.style.run(input),
            OutputKind::Script => self.script.run(input),
        }
    }
}

/// The compilers and compressor a pipeline uses.
pub struct Toolchain {
    style: Box<dyn Transform>,
    script: Box<dyn Transform>,
    compressor: Box<dyn Compressor>,
}

impl Toolchain {
    /// Creates a toolchain from a style compiler, a script compiler, and a
    /// compressor.
    pub fn new(
        style: impl Transform + 'static,
        script: impl Transform + 'static,
        compressor: impl Compressor + 'static,
    ) -> Self {
        Self {
            style: Box::new(style),
            script: Box::new(script),
            compressor: Box::new(compressor),
        }
    }

    /// The conventional command-line tools: `lessc -`, `coffee -sc`, and
    /// `yuicompressor --type css|js`.
    pub fn external_defaults() -> Self {
        Self::new(
            ExternalTool::new("lessc", ["-"]),
            ExternalTool::new("coffee", ["-sc"]),
            ExternalCompressor {
                style: ExternalTool::new("yuicompressor", ["--type", "css"]),
                script: ExternalTool::new("yuicompressor", ["--type", "js"]),
            },
        )
    }

    /// The compiler producing the given output kind.
    pub fn transform_for(&self, kind: OutputKind) -> &dyn Transform {
        match kind {
            OutputKind::Style => self.style.as_ref(),
            OutputKind::Script => self.script.as_ref(),
        }
    }

    /// The compressor.
    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(input: &[u8]) -> Result<Vec<u8>, ToolError> {
        Ok(input.to_ascii_uppercase())
    }

    fn reject(_: &[u8]) -> Result<Vec<u8>, ToolError> {
        Err(ToolError::Rejected("syntax error on line 1".to_string()))
    }

    fn strip_spaces(input: &[u8], _: OutputKind) -> Result<Vec<u8>, ToolError> {
        Ok(input.iter().copied().filter(|b| *b != b' ').collect())
    }

    #[test]
    fn functions_are_tools() {
        let chain = Toolchain::new(upper, reject, strip_spaces);
        assert_eq!(
            chain.transform_for(OutputKind::Style).transform(b"b{}").unwrap(),
            b"B{}"
        );
        assert!(chain.transform_for(OutputKind::Script).transform(b"x").is_err());
        assert_eq!(
            chain.compressor().compress(b"a { }", OutputKind::Style).unwrap(),
            b"a{}"
        );
    }

    #[test]
    fn from_command_splits_program() {
        let tool = ExternalTool::from_command(&["coffee".to_string(), "-sc".to_string()]).unwrap();
        assert_eq!(tool.program(), "coffee");
        assert_eq!(tool.args(), ["-sc".to_string()]);
        assert_eq!(tool.timeout(), DEFAULT_TIMEOUT);
        assert!(ExternalTool::from_command(&[]).is_none());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let tool = ExternalTool::new("kiln-no-such-tool", Vec::<String>::new());
        assert!(matches!(tool.run(b"x"), Err(ToolError::Spawn { .. })));
    }

    #[test]
    fn timeout_display() {
        let err = ToolError::Timeout {
            program: "lessc".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "lessc timed out after 2s");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn sh(script: &str) -> ExternalTool {
            ExternalTool::new("sh", ["-c", script])
        }

        #[test]
        fn stdin_to_stdout() {
            assert_eq!(sh("cat").run(b"body{color:red}").unwrap(), b"body{color:red}");
        }

        #[test]
        fn stderr_fails_even_on_success() {
            match sh("cat >/dev/null; echo 'warning: deprecated' >&2").run(b"x") {
                Err(ToolError::Diagnostics { stderr, .. }) => {
                    assert_eq!(stderr, "warning: deprecated")
                }
                other => panic!("expected Diagnostics, got {other:?}"),
            }
        }

        #[test]
        fn nonzero_exit_fails() {
            assert!(matches!(
                sh("cat >/dev/null; exit 3").run(b"x"),
                Err(ToolError::Exit { .. })
            ));
        }

        #[test]
        fn tool_ignoring_stdin_still_succeeds() {
            let big = vec![b'a'; 1 << 20];
            assert_eq!(sh("printf ok").run(&big).unwrap(), b"ok");
        }

        #[test]
        fn slow_tool_times_out() {
            let tool = sh("sleep 5").with_timeout(Duration::from_millis(100));
            let start = Instant::now();
            assert!(matches!(tool.run(b""), Err(ToolError::Timeout { .. })));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn background_process_holding_output_times_out() {
            let tool = sh("sleep 4 & cat").with_timeout(Duration::from_millis(500));
            let start = Instant::now();
            assert!(matches!(tool.run(b"x"), Err(ToolError::Timeout { .. })));
            assert!(
                start.elapsed() < Duration::from_secs(3),
                "run took {:?}",
                start.elapsed()
            );
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn timeout_kills_background_processes() {
            let dir = tempfile::tempdir().unwrap();
            let pidfile = dir.path().join("bg.pid");
            let script = format!("sleep 30 & echo $! > '{}'; cat", pidfile.display());
            let tool = sh(&script).with_timeout(Duration::from_millis(500));
            assert!(matches!(tool.run(b"x"), Err(ToolError::Timeout { .. })));

            let pid = std::fs::read_to_string(&pidfile).unwrap();
            let stat = format!("/proc/{}/stat", pid.trim());
            // Killed but not yet reaped shows up as a zombie.
            let alive = || match std::fs::read_to_string(&stat) {
                Ok(line) => !line
                    .rsplit(')')
                    .next()
                    .unwrap_or("")
                    .trim_start()
                    .starts_with('Z'),
                Err(_) => false,
            };
            let start = Instant::now();
            while alive() && start.elapsed() < Duration::from_secs(5) {
                thread::sleep(Duration::from_millis(50));
            }
            assert!(!alive(), "background sleep {} survived", pid.trim());
        }

        #[test]
        fn quiet_background_process_does_not_delay_output() {
            let tool = sh("sleep 4 >/dev/null 2>&1 & cat").with_timeout(Duration::from_secs(10));
            let start = Instant::now();
            assert_eq!(tool.run(b"x").unwrap(), b"x");
            assert!(start.elapsed() < Duration::from_secs(3));
        }
    }
}
