//! Sweep runner: enumerates a parameter grid, invokes the external executable at every point, and turns
//! its captured output into records.
//!
//! A [`SweepPlan`] combines a [`Grid`] with one or more [`Probe`]s. For each grid point, every probe renders
//! its command template, runs it through an [`Executor`], and extracts its fields; the axis values and
//! all probe fields form one [`Record`]. Points are processed strictly sequentially and records reach the
//! [`RecordSink`] in enumeration order.

use crate::{
    stats::{LatencyRecorder, SummaryStats},
    CommandTemplate, ExtractError, Extraction, Executor, Grid, GridPoint, InvokeError, Record,
    RecordSink, TableError, TemplateError, Value,
};
use std::fmt;
use thiserror::Error;

//==============
// Errors

/// Error that stops a sweep as a whole.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("sweep `{sweep}`: {source}")]
    Template {
        sweep: String,
        #[source]
        source: TemplateError,
    },

    #[error("sweep `{sweep}`: column `{column}` is produced more than once")]
    DuplicateColumn { sweep: String, column: String },

    #[error("sweep `{sweep}` has no probes")]
    NoProbes { sweep: String },

    #[error("sweep `{sweep}`: {source}")]
    Table {
        sweep: String,
        #[source]
        source: TableError,
    },

    #[error("sweep `{sweep}`: failed to set up latency histogram")]
    Histogram { sweep: String },
}

/// Why a single grid point produced no record.
#[derive(Debug, Error)]
pub enum PointError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

//=================
// Plan

/// One invocation made at every grid point, and the fields extracted from its output.
#[derive(Debug, Clone)]
pub struct Probe {
    label: String,
    command: CommandTemplate,
    extraction: Extraction,
}

impl Probe {
    pub fn new(label: impl Into<String>, command: CommandTemplate, extraction: Extraction) -> Self {
        Self {
            label: label.into(),
            command,
            extraction,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn command(&self) -> &CommandTemplate {
        &self.command
    }
}

/// A named grid plus the probes run at each of its points.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    name: String,
    grid: Grid,
    probes: Vec<Probe>,
}

impl SweepPlan {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Columns of the records this plan yields: axis names in axis order, then each probe's fields in
    /// probe order.
    pub fn columns(&self) -> Vec<String> {
        let axes = self.grid.axes().iter().map(|a| a.name());
        let fields = self.probes.iter().flat_map(|p| p.extraction.field_names());
        axes.chain(fields).map(str::to_owned).collect()
    }

    /// Checks, before anything is executed, that every placeholder names an axis and every column is
    /// produced exactly once.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.probes.is_empty() {
            return Err(SweepError::NoProbes {
                sweep: self.name.clone(),
            });
        }

        let axes = self.grid.axes().iter().map(|a| a.name());
        for probe in &self.probes {
            probe
                .command
                .validate(axes.clone())
                .map_err(|source| SweepError::Template {
                    sweep: self.name.clone(),
                    source,
                })?;
        }

        let columns = self.columns();
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].contains(c) {
                return Err(SweepError::DuplicateColumn {
                    sweep: self.name.clone(),
                    column: c.clone(),
                });
            }
        }
        Ok(())
    }
}

//=================
// Runner

/// What to do with the rest of the grid after a point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and move on to the next point.
    #[default]
    Continue,
    /// Stop the sweep at the first failed point. Records already accepted by the sink are kept.
    AbortSweep,
}

/// A grid point that produced no record.
#[derive(Debug)]
pub struct PointFailure {
    pub index: usize,
    pub values: Vec<(String, Value)>,
    pub probe: String,
    pub error: PointError,
}

impl fmt::Display for PointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self
            .values
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "point #{} ({values}), probe `{}`: {}", self.index, self.probe, self.error)
    }
}

impl PointFailure {
    /// One-line cause shown in the progress output: the exit code of a process that exited with
    /// one, otherwise the error itself (e.g. the executable could not be launched).
    pub fn progress_message(&self) -> String {
        match &self.error {
            PointError::Invoke(InvokeError::ExitStatus { code: Some(code), .. }) => {
                format!("probe `{}` failed with return code {code}", self.probe)
            }
            e => format!("probe `{}`: {e}", self.probe),
        }
    }
}

/// Outcome of a completed (or aborted) sweep.
#[derive(Debug)]
pub struct SweepReport {
    pub sweep: String,
    /// Grid points attempted.
    pub points: usize,
    /// Records handed to the sink.
    pub records: usize,
    pub failures: Vec<PointFailure>,
    /// `true` if [`FailurePolicy::AbortSweep`] stopped the sweep before the grid was exhausted.
    pub aborted: bool,
    /// Wall-clock latency of every successful invocation.
    pub latency: SummaryStats,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sweep `{}`: {} points, {} records, {} failures{}; invocation latency: {}",
            self.sweep,
            self.points,
            self.records,
            self.failures.len(),
            if self.aborted { ", aborted" } else { "" },
            self.latency
        )
    }
}

/// Runs [`SweepPlan`]s against an [`Executor`].
pub struct SweepRunner<E> {
    executor: E,
    policy: FailurePolicy,
}

impl<E: Executor> SweepRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Executes `plan`, handing each successful point's record to `sink` as soon as it is complete.
    ///
    /// Failed points do not stop the sweep unless the policy is [`FailurePolicy::AbortSweep`]; they are
    /// listed in the returned [`SweepReport`].
    ///
    /// # Errors
    /// - [`SweepError::Template`], [`SweepError::DuplicateColumn`], [`SweepError::NoProbes`] if the plan is
    ///   invalid; nothing is executed in that case.
    /// - [`SweepError::Table`] if the sink rejects a record (e.g. the output file became unwritable).
    pub fn run(&self, plan: &SweepPlan, sink: &mut impl RecordSink) -> Result<SweepReport, SweepError> {
        plan.validate()?;

        let mut latency = LatencyRecorder::new().map_err(|_| SweepError::Histogram {
            sweep: plan.name.clone(),
        })?;
        let mut report = SweepReport {
            sweep: plan.name.clone(),
            points: 0,
            records: 0,
            failures: Vec::new(),
            aborted: false,
            latency: latency.summary(),
        };

        let total = plan.grid.len();
        log::info!("starting sweep `{}` over {total} points", plan.name);

        for point in plan.grid.points() {
            report.points += 1;
            match self.run_point(plan, &point, &mut latency) {
                Ok(record) => {
                    sink.accept(&record).map_err(|source| SweepError::Table {
                        sweep: plan.name.clone(),
                        source,
                    })?;
                    report.records += 1;
                    println!(
                        "[{}/{total}] {}: {}",
                        point.index() + 1,
                        plan.name,
                        describe_record(&record)
                    );
                }
                Err((probe, error)) => {
                    let failure = PointFailure {
                        index: point.index(),
                        values: point.values().to_vec(),
                        probe,
                        error,
                    };
                    println!(
                        "[{}/{total}] {}: {}",
                        point.index() + 1,
                        plan.name,
                        failure.progress_message()
                    );
                    log::warn!("sweep `{}`: {failure}", plan.name);
                    report.failures.push(failure);
                    if self.policy == FailurePolicy::AbortSweep {
                        report.aborted = report.points < total;
                        break;
                    }
                }
            }
        }

        report.latency = latency.summary();
        log::info!("{report}");
        Ok(report)
    }

    /// Runs every probe of `plan` at `point`; on failure returns the failing probe's label and the cause.
    fn run_point(
        &self,
        plan: &SweepPlan,
        point: &GridPoint,
        latency: &mut LatencyRecorder,
    ) -> Result<Record, (String, PointError)> {
        let mut record: Record = point.values().iter().cloned().collect();

        for probe in &plan.probes {
            let fail = |e: PointError| (probe.label.clone(), e);

            let invocation = probe.command.render(point).map_err(|e| fail(e.into()))?;
            let captured = self
                .executor
                .execute(&invocation)
                .map_err(|e| fail(e.into()))?;
            if let Err(e) = latency.record(captured.elapsed) {
                log::debug!("latency of `{invocation}` not recorded: {e:?}");
            }

            let fields = probe
                .extraction
                .apply(&captured.stdout)
                .map_err(|e| fail(e.into()))?;
            for (name, value) in fields.fields() {
                record.set(name.clone(), value.clone());
            }
        }

        Ok(record)
    }
}

fn describe_record(record: &Record) -> String {
    record
        .fields()
        .iter()
        .map(|(n, v)| format!("{n}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(error: InvokeError) -> PointFailure {
        PointFailure {
            index: 0,
            values: vec![("threads".to_owned(), Value::Int(2))],
            probe: "openmp".to_owned(),
            error: error.into(),
        }
    }

    #[test]
    fn progress_shows_plain_exit_code() {
        let f = failure(InvokeError::ExitStatus {
            program: "./monte-carlo".to_owned(),
            code: Some(1),
        });
        assert_eq!(f.progress_message(), "probe `openmp` failed with return code 1");
    }

    #[test]
    fn progress_shows_launch_failure_cause() {
        let f = failure(InvokeError::Spawn {
            program: "./missing".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
        let msg = f.progress_message();
        assert!(msg.contains("failed to launch `./missing`"), "{msg}");
        assert!(msg.contains("no such file"), "{msg}");
        assert!(!msg.contains("None"), "{msg}");
    }
}
