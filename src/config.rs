//! Harness configuration: executable locations, output directories, and the ranges swept by each scenario.

use crate::FailurePolicy;
use std::path::{Path, PathBuf};

/// Environment variable combining schedule policy and chunk size, e.g. `static,5`.
pub const SCHEDULE_ENV: &str = "OMP_SCHEDULE";

/// Environment variable holding the thread count as a decimal integer.
pub const THREADS_ENV: &str = "OMP_NUM_THREADS";

/// Half-open integer range `start..end` visited in increments of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRange {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl StepRange {
    pub const fn new(start: i64, end: i64, step: i64) -> Self {
        Self { start, end, step }
    }

    /// Values of the range; empty if `step` is not positive.
    pub fn values(&self) -> Vec<i64> {
        if self.step <= 0 {
            return Vec::new();
        }
        (self.start..self.end).step_by(self.step as usize).collect()
    }
}

/// Configuration of a harness run.
///
/// Defaults reproduce the study the harness was written for; each setting can be changed with the
/// corresponding `with_*` method.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessCfg {
    pub(crate) exe: String,
    pub(crate) hybrid_exe: String,
    pub(crate) launcher: String,
    pub(crate) launcher_procs_flag: String,
    pub(crate) data_dir: PathBuf,
    pub(crate) plots_dir: PathBuf,
    pub(crate) fixed_iterations: i64,
    pub(crate) weak_scaling_iterations: i64,
    pub(crate) baseline_schedule: String,
    pub(crate) baseline_threads: i64,
    pub(crate) schedules: Vec<String>,
    pub(crate) chunks: Vec<i64>,
    pub(crate) iteration_range: StepRange,
    pub(crate) speedup_range: StepRange,
    pub(crate) speedup_processes: StepRange,
    pub(crate) thread_range: StepRange,
    pub(crate) weak_threads: StepRange,
    pub(crate) weak_processes: StepRange,
    pub(crate) failure_policy: FailurePolicy,
}

impl Default for HarnessCfg {
    /// Instantiates a default [`HarnessCfg`]:
    /// - executables `./monte-carlo` and `./hypred`, the latter launched through `mpirun -n <processes>`;
    /// - tables under `./data`, charts under `./plots`;
    /// - `3000` iterations for the schedule and thread sweeps, `10000` for the weak-scaling sweep;
    /// - baseline schedule `static,5` and `6` threads wherever those are held constant;
    /// - schedules `static`, `dynamic`, `guided` and chunk sizes `1..500`;
    /// - iteration sweep `200..10200` step `200`, speedup sweep `400..10100` step `200` with `2..16` step `2`
    ///   processes, thread sweep `1..=20`, weak scaling over `2..17` step `2` threads and `1..17` step `2`
    ///   processes;
    /// - [`FailurePolicy::Continue`].
    fn default() -> Self {
        Self {
            exe: "./monte-carlo".to_owned(),
            hybrid_exe: "./hypred".to_owned(),
            launcher: "mpirun".to_owned(),
            launcher_procs_flag: "-n".to_owned(),
            data_dir: PathBuf::from("./data"),
            plots_dir: PathBuf::from("./plots"),
            fixed_iterations: 3000,
            weak_scaling_iterations: 10000,
            baseline_schedule: "static,5".to_owned(),
            baseline_threads: 6,
            schedules: ["static", "dynamic", "guided"].map(str::to_owned).to_vec(),
            chunks: vec![1, 5, 10, 25, 50, 100, 150, 200, 250, 500],
            iteration_range: StepRange::new(200, 10200, 200),
            speedup_range: StepRange::new(400, 10100, 200),
            speedup_processes: StepRange::new(2, 16, 2),
            thread_range: StepRange::new(1, 21, 1),
            weak_threads: StepRange::new(2, 17, 2),
            weak_processes: StepRange::new(1, 17, 2),
            failure_policy: FailurePolicy::Continue,
        }
    }
}

impl HarnessCfg {
    pub fn with_exe(mut self, exe: impl Into<String>) -> Self {
        self.exe = exe.into();
        self
    }

    pub fn with_hybrid_exe(mut self, exe: impl Into<String>) -> Self {
        self.hybrid_exe = exe.into();
        self
    }

    /// Program used to start the hybrid executable with several processes, and its process-count flag.
    pub fn with_launcher(mut self, launcher: impl Into<String>, procs_flag: impl Into<String>) -> Self {
        self.launcher = launcher.into();
        self.launcher_procs_flag = procs_flag.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_plots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plots_dir = dir.into();
        self
    }

    pub fn with_fixed_iterations(mut self, iterations: i64) -> Self {
        self.fixed_iterations = iterations;
        self
    }

    pub fn with_weak_scaling_iterations(mut self, iterations: i64) -> Self {
        self.weak_scaling_iterations = iterations;
        self
    }

    pub fn with_baseline(mut self, schedule: impl Into<String>, threads: i64) -> Self {
        self.baseline_schedule = schedule.into();
        self.baseline_threads = threads;
        self
    }

    pub fn with_schedules<S: AsRef<str>>(mut self, schedules: &[S], chunks: &[i64]) -> Self {
        self.schedules = schedules.iter().map(|s| s.as_ref().to_owned()).collect();
        self.chunks = chunks.to_vec();
        self
    }

    pub fn with_iteration_range(mut self, range: StepRange) -> Self {
        self.iteration_range = range;
        self
    }

    pub fn with_speedup_ranges(mut self, iterations: StepRange, processes: StepRange) -> Self {
        self.speedup_range = iterations;
        self.speedup_processes = processes;
        self
    }

    pub fn with_thread_range(mut self, range: StepRange) -> Self {
        self.thread_range = range;
        self
    }

    pub fn with_weak_scaling_ranges(mut self, threads: StepRange, processes: StepRange) -> Self {
        self.weak_threads = threads;
        self.weak_processes = processes;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn plots_dir(&self) -> &Path {
        &self.plots_dir
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Process counts of the speedup sweep's hybrid invocations.
    pub fn speedup_processes(&self) -> Vec<i64> {
        self.speedup_processes.values()
    }
}
