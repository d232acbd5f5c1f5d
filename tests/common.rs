#![allow(dead_code)]

use mc_sweep::{Captured, Executor, Invocation, InvokeError};
use std::{cell::RefCell, collections::VecDeque, time::Duration};

/// Scripted [`Executor`]: records every invocation and answers with a canned stdout or a failure.
pub struct StubExecutor {
    respond: Box<dyn Fn(&Invocation) -> Result<String, Option<i32>>>,
    queue: RefCell<VecDeque<Result<String, Option<i32>>>>,
    pub calls: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Answers every invocation with `respond`; `Err(code)` simulates a non-zero exit.
    pub fn with(respond: impl Fn(&Invocation) -> Result<String, Option<i32>> + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            queue: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Same stdout for every invocation.
    pub fn constant(stdout: &str) -> Self {
        let stdout = stdout.to_owned();
        Self::with(move |_| Ok(stdout.clone()))
    }

    /// Answers invocations in order from `outcomes`; once exhausted, fails with code `99`.
    pub fn scripted(outcomes: impl IntoIterator<Item = Result<&'static str, Option<i32>>>) -> Self {
        let stub = Self::with(|_| Err(Some(99)));
        stub.queue
            .borrow_mut()
            .extend(outcomes.into_iter().map(|o| o.map(str::to_owned)));
        stub
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Value of environment variable `key` in the `i`-th invocation.
    pub fn env_of(&self, i: usize, key: &str) -> Option<String> {
        self.calls.borrow()[i]
            .env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl Executor for StubExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<Captured, InvokeError> {
        self.calls.borrow_mut().push(invocation.clone());
        let outcome = match self.queue.borrow_mut().pop_front() {
            Some(o) => o,
            None => (self.respond)(invocation),
        };
        match outcome {
            Ok(stdout) => Ok(Captured {
                stdout,
                elapsed: Duration::from_millis(2),
            }),
            Err(code) => Err(InvokeError::ExitStatus {
                program: invocation.program.clone(),
                code,
            }),
        }
    }
}

pub fn are_close(left: f64, right: f64, pct: f64) -> bool {
    let avg_abs = (left.abs() + right.abs()) / 2.0;
    (left - right).abs() <= avg_abs * pct
}
