// invoker.rs — Bounded build/check invocation.
//
// The engine treats the build tool as an opaque bounded call: given a
// directory and a command, produce an exit status and captured output
// within a deadline. The trait seam lets tests substitute canned outcomes
// without spawning processes.
//
// ProcessInvoker drains stdout/stderr on background threads (a full pipe
// would otherwise deadlock a chatty compiler) and polls try_wait until the
// deadline, then kills the child.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::project::BuildCommand;

/// Result of one bounded build invocation.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Process exited with status 0.
    pub success: bool,
    /// Deadline elapsed before exit; the process was killed.
    pub timed_out: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
}

/// An opaque, bounded build/check call.
pub trait BuildInvoker {
    fn invoke(
        &self,
        dir: &Path,
        command: &BuildCommand,
        timeout: Duration,
    ) -> std::io::Result<BuildOutcome>;
}

/// Default invoker: spawns the command as a child process.
pub struct ProcessInvoker;

impl BuildInvoker for ProcessInvoker {
    fn invoke(
        &self,
        dir: &Path,
        command: &BuildCommand,
        timeout: Duration,
    ) -> std::io::Result<BuildOutcome> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout_handle = drain(child.stdout.take());
        let stderr_handle = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        break None;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        };

        let mut output = stdout_handle.join().unwrap_or_default();
        let stderr_text = stderr_handle.join().unwrap_or_default();
        if !stderr_text.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&stderr_text);
        }

        Ok(match status {
            Some(status) => BuildOutcome {
                success: status.success(),
                timed_out: false,
                output,
            },
            None => BuildOutcome {
                success: false,
                timed_out: true,
                output,
            },
        })
    }
}

/// Read a child stream to completion on a background thread.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_string(&mut buf);
        }
        buf
    })
}
