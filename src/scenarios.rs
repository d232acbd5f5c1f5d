//! The sweeps of the Monte Carlo performance study, expressed as [`SweepPlan`]s.

use crate::{
    config::{SCHEDULE_ENV, THREADS_ENV},
    extract::{PAYOFF_TOKEN, TIME_TOKEN},
    Axis, ColumnKind, CommandTemplate, Executor, Extraction, Grid, HarnessCfg, Probe, Schema,
    SweepError, SweepPlan, SweepReport, SweepRunner, TableWriter,
};
use std::{fmt, path::PathBuf};

/// Canonical column names of the tables written by the sweeps.
pub mod col {
    pub const SCHEDULE: &str = "schedule";
    pub const CHUNK: &str = "chunk";
    pub const TIME: &str = "time";
    pub const ITERATION: &str = "iteration";
    pub const PAYOFF_AVG: &str = "payoff_avg";
    pub const THREADS: &str = "threads";
    pub const PROCESSES: &str = "processes";
    pub const TIME_SERIAL: &str = "time_serial";
    pub const TIME_OPENMP: &str = "time_openmp";

    /// Time column of a hybrid run with `processes` processes, e.g. `time_mpi_8n`.
    pub fn time_mpi(processes: i64) -> String {
        format!("time_mpi_{processes}n")
    }
}

/// The sweeps the harness knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    /// Schedule policy × chunk size at a fixed iteration count.
    Schedule,
    /// Iteration count at the baseline schedule and thread count, recording the payoff average.
    Iterations,
    /// Thread count at a fixed iteration count.
    Threads,
    /// Serial, OpenMP and hybrid timings per iteration count.
    Speedup,
    /// Thread count × process count of the hybrid executable at a fixed large iteration count.
    WeakScaling,
}

impl SweepKind {
    /// Every kind, in the order the command line runs them.
    pub const ALL: [SweepKind; 5] = [
        SweepKind::Schedule,
        SweepKind::Iterations,
        SweepKind::Threads,
        SweepKind::Speedup,
        SweepKind::WeakScaling,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SweepKind::Schedule => "schedule",
            SweepKind::Iterations => "iterations",
            SweepKind::Threads => "threads",
            SweepKind::Speedup => "speedup",
            SweepKind::WeakScaling => "weak-scaling",
        }
    }

    /// File name of the table written under the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            SweepKind::Schedule => "schedule.csv",
            SweepKind::Iterations => "iterations-avg.csv",
            SweepKind::Threads => "threads.csv",
            SweepKind::Speedup => "vs.csv",
            SweepKind::WeakScaling => "hybrid_stats.csv",
        }
    }

    pub fn table_path(self, cfg: &HarnessCfg) -> PathBuf {
        cfg.data_dir.join(self.file_name())
    }

    pub fn plan(self, cfg: &HarnessCfg) -> SweepPlan {
        match self {
            SweepKind::Schedule => schedule_plan(cfg),
            SweepKind::Iterations => iterations_plan(cfg),
            SweepKind::Threads => threads_plan(cfg),
            SweepKind::Speedup => speedup_plan(cfg),
            SweepKind::WeakScaling => weak_scaling_plan(cfg),
        }
    }

    /// Column kinds of the table this sweep writes.
    pub fn schema(self, cfg: &HarnessCfg) -> Schema {
        match self {
            SweepKind::Schedule => Schema::new()
                .text(col::SCHEDULE)
                .int(col::CHUNK)
                .float(col::TIME),
            SweepKind::Iterations => Schema::new().int(col::ITERATION).float(col::PAYOFF_AVG),
            SweepKind::Threads => Schema::new().int(col::THREADS).float(col::TIME),
            SweepKind::Speedup => cfg.speedup_processes().into_iter().fold(
                Schema::new()
                    .int(col::ITERATION)
                    .float(col::TIME_SERIAL)
                    .float(col::TIME_OPENMP),
                |schema, n| schema.column(col::time_mpi(n), ColumnKind::Float),
            ),
            SweepKind::WeakScaling => Schema::new()
                .int(col::THREADS)
                .int(col::PROCESSES)
                .float(col::TIME),
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//=================
// Plans

fn time_at_token_1(column: impl Into<String>) -> Extraction {
    let column: String = column.into();
    Extraction::positional([(column, TIME_TOKEN)])
}

/// Direct invocation of the executable with `iterations` (a literal or a placeholder).
fn exe(cfg: &HarnessCfg, iterations: &str) -> CommandTemplate {
    CommandTemplate::new(&cfg.exe).args(["-i", iterations])
}

/// Invocation of the hybrid executable through the launcher with `processes` processes.
fn hybrid(cfg: &HarnessCfg, processes: &str, iterations: &str) -> CommandTemplate {
    CommandTemplate::new(&cfg.launcher).args([
        cfg.launcher_procs_flag.as_str(),
        processes,
        cfg.hybrid_exe.as_str(),
        "-i",
        iterations,
    ])
}

/// Schedule policy × chunk size; the pair is passed as `OMP_SCHEDULE=<schedule>,<chunk>`.
pub fn schedule_plan(cfg: &HarnessCfg) -> SweepPlan {
    let grid = Grid::default()
        .with_axis(Axis::texts(col::SCHEDULE, &cfg.schedules))
        .with_axis(Axis::ints(col::CHUNK, cfg.chunks.iter().copied()));
    let iterations = cfg.fixed_iterations.to_string();
    let command = exe(cfg, &iterations).env(SCHEDULE_ENV, "{schedule},{chunk}");

    SweepPlan::new(SweepKind::Schedule.name(), grid)
        .with_probe(Probe::new("openmp", command, time_at_token_1(col::TIME)))
}

/// Iteration count at the baseline schedule and thread count; records the average payoff.
pub fn iterations_plan(cfg: &HarnessCfg) -> SweepPlan {
    let grid = Grid::default().with_axis(Axis::ints(col::ITERATION, cfg.iteration_range.values()));
    let command = exe(cfg, "{iteration}")
        .env(SCHEDULE_ENV, &cfg.baseline_schedule)
        .env(THREADS_ENV, cfg.baseline_threads.to_string());

    SweepPlan::new(SweepKind::Iterations.name(), grid).with_probe(Probe::new(
        "openmp",
        command,
        Extraction::positional([(col::PAYOFF_AVG, PAYOFF_TOKEN)]),
    ))
}

/// Thread count at the baseline schedule and a fixed iteration count.
pub fn threads_plan(cfg: &HarnessCfg) -> SweepPlan {
    let grid = Grid::default().with_axis(Axis::ints(col::THREADS, cfg.thread_range.values()));
    let iterations = cfg.fixed_iterations.to_string();
    let command = exe(cfg, &iterations)
        .env(SCHEDULE_ENV, &cfg.baseline_schedule)
        .env(THREADS_ENV, "{threads}");

    SweepPlan::new(SweepKind::Threads.name(), grid)
        .with_probe(Probe::new("openmp", command, time_at_token_1(col::TIME)))
}

/// Per iteration count: one serial run (`-p 0`), one OpenMP run and one hybrid run per process count,
/// all combined into a single record.
pub fn speedup_plan(cfg: &HarnessCfg) -> SweepPlan {
    let grid = Grid::default().with_axis(Axis::ints(col::ITERATION, cfg.speedup_range.values()));
    let baseline = |t: CommandTemplate| {
        t.env(SCHEDULE_ENV, &cfg.baseline_schedule)
            .env(THREADS_ENV, cfg.baseline_threads.to_string())
    };

    let serial = baseline(exe(cfg, "{iteration}").args(["-p", "0"]));
    let openmp = baseline(exe(cfg, "{iteration}"));

    let mut plan = SweepPlan::new(SweepKind::Speedup.name(), grid)
        .with_probe(Probe::new("serial", serial, time_at_token_1(col::TIME_SERIAL)))
        .with_probe(Probe::new("openmp", openmp, time_at_token_1(col::TIME_OPENMP)));

    for n in cfg.speedup_processes() {
        let command = baseline(hybrid(cfg, &n.to_string(), "{iteration}"));
        plan = plan.with_probe(Probe::new(
            format!("mpi_{n}"),
            command,
            time_at_token_1(col::time_mpi(n)),
        ));
    }
    plan
}

/// Thread count × process count of the hybrid executable at the weak-scaling iteration count.
pub fn weak_scaling_plan(cfg: &HarnessCfg) -> SweepPlan {
    let grid = Grid::default()
        .with_axis(Axis::ints(col::THREADS, cfg.weak_threads.values()))
        .with_axis(Axis::ints(col::PROCESSES, cfg.weak_processes.values()));
    let iterations = cfg.weak_scaling_iterations.to_string();
    let command = hybrid(cfg, "{processes}", &iterations)
        .env(SCHEDULE_ENV, &cfg.baseline_schedule)
        .env(THREADS_ENV, "{threads}");

    SweepPlan::new(SweepKind::WeakScaling.name(), grid)
        .with_probe(Probe::new("hybrid", command, time_at_token_1(col::TIME)))
}

//=================
// Running

/// Runs the sweep `kind`, appending each record to its table file as soon as it is available.
///
/// The data directory must exist. The table file is replaced wholesale.
pub fn run_sweep<E: Executor>(
    kind: SweepKind,
    cfg: &HarnessCfg,
    executor: E,
) -> Result<SweepReport, SweepError> {
    let plan = kind.plan(cfg);
    plan.validate()?;

    let path = kind.table_path(cfg);
    let mut writer = TableWriter::create(&path, plan.columns()).map_err(|source| SweepError::Table {
        sweep: plan.name().to_owned(),
        source,
    })?;
    log::info!("writing `{}` to {}", kind, path.display());

    SweepRunner::new(executor)
        .with_policy(cfg.failure_policy)
        .run(&plan, &mut writer)
}
