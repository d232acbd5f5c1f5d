//! Synchronous execution of the external executable.

use crate::Invocation;
use std::{
    io,
    process::{Command, Stdio},
    time::{Duration, Instant},
};
use thiserror::Error;

//==============
// Errors

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` failed with return code {}", describe_code(.code))]
    ExitStatus { program: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "<none, terminated by signal>".to_owned(), |c| c.to_string())
}

impl InvokeError {
    /// Exit code of the failed process, if it exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            InvokeError::Spawn { .. } => None,
            InvokeError::ExitStatus { code, .. } => *code,
        }
    }
}

//=================
// Executor

/// Standard output captured from one successful invocation.
#[derive(Debug, Clone)]
pub struct Captured {
    pub stdout: String,
    /// Wall-clock latency of the invocation as observed by the harness.
    pub elapsed: Duration,
}

/// Capability to run an [`Invocation`] to completion and capture its output.
///
/// Invocations block until the child terminates; there is no timeout.
pub trait Executor {
    fn execute(&self, invocation: &Invocation) -> Result<Captured, InvokeError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, invocation: &Invocation) -> Result<Captured, InvokeError> {
        (**self).execute(invocation)
    }
}

/// [`Executor`] that spawns a real child process.
///
/// Standard error is inherited so that diagnostics of the external executable reach the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<Captured, InvokeError> {
        log::debug!("executing `{invocation}`");

        let start = Instant::now();
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| InvokeError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        let elapsed = start.elapsed();

        if !output.status.success() {
            return Err(InvokeError::ExitStatus {
                program: invocation.program.clone(),
                code: output.status.code(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        log::trace!("`{}` wrote {} bytes in {:?}", invocation.program, stdout.len(), elapsed);
        Ok(Captured { stdout, elapsed })
    }
}
