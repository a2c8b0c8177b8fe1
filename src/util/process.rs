use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{MixError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Last few lines of stderr, enough to explain a failure.
    pub fn stderr_tail(&self) -> String {
        let lines = self.stderr.lines().collect::<Vec<&str>>();
        lines[lines.len().saturating_sub(5)..].join("\n")
    }
}

/// Runs `program` to completion, killing it once `timeout` elapses.
///
/// stdout and stderr are drained on their own threads so a chatty child can
/// never block on a full pipe.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> Result<ProcessOutput> {
    debug!("exec: {} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| MixError::store_failure(program, format!("failed to start: {}", e)))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    // a timeout too large to represent means no deadline at all
    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if deadline.map_or(false, |d| Instant::now() >= d) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MixError::store_failure(
                    program,
                    format!("timed out after {}s", timeout.as_secs_f32()),
                ));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(MixError::store_failure(program, e.to_string())),
        }
    };

    let collect = |handle: Option<thread::JoinHandle<String>>| handle.and_then(|h| h.join().ok()).unwrap_or_default();
    Ok(ProcessOutput {
        success: status.success(),
        code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}
