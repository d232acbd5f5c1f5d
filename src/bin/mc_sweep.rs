//! mc-sweep CLI: runs the Monte Carlo performance sweeps and charts their tables.

use anyhow::Context;
use clap::Parser;
use mc_sweep::{
    analyze::{analyze_file, PlotStyle},
    run_sweep, FailurePolicy, HarnessCfg, ProcessExecutor, SweepKind,
};
use std::{fs, path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "mc-sweep")]
#[command(about = "Drives a Monte Carlo executable through parameter sweeps and charts the results")]
#[command(version)]
struct Cli {
    /// Sweep schedule policy and chunk size
    #[arg(long)]
    schedule_stats: bool,

    /// Compare serial, OpenMP and hybrid timings across iteration counts
    #[arg(long)]
    vs_stats: bool,

    /// Sweep the thread count
    #[arg(long)]
    threads_stats: bool,

    /// Sweep the iteration count, recording the average payoff
    #[arg(long)]
    iterations_stats: bool,

    /// Sweep threads and processes of the hybrid executable
    #[arg(long, alias = "hypred-stats")]
    hybrid_stats: bool,

    /// Table to analyze and chart
    #[arg(long, value_name = "CSV")]
    analyze: Option<PathBuf>,

    /// Chart style for path statistics tables
    #[arg(long, value_enum)]
    plot_type: Option<PlotStyle>,

    /// Monte Carlo executable
    #[arg(long, value_name = "PATH")]
    exe: Option<String>,

    /// Hybrid (MPI + OpenMP) executable
    #[arg(long, value_name = "PATH")]
    hybrid_exe: Option<String>,

    /// Launcher of the hybrid executable
    #[arg(long, value_name = "PROG")]
    launcher: Option<String>,

    /// Directory of the sweep tables
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory of the charts
    #[arg(long, value_name = "DIR")]
    plots_dir: Option<PathBuf>,

    /// Stop a sweep at its first failed point
    #[arg(long)]
    abort_on_failure: bool,
}

impl Cli {
    fn cfg(&self) -> HarnessCfg {
        let mut cfg = HarnessCfg::default();
        if let Some(exe) = &self.exe {
            cfg = cfg.with_exe(exe);
        }
        if let Some(exe) = &self.hybrid_exe {
            cfg = cfg.with_hybrid_exe(exe);
        }
        if let Some(launcher) = &self.launcher {
            cfg = cfg.with_launcher(launcher, "-n");
        }
        if let Some(dir) = &self.data_dir {
            cfg = cfg.with_data_dir(dir);
        }
        if let Some(dir) = &self.plots_dir {
            cfg = cfg.with_plots_dir(dir);
        }
        if self.abort_on_failure {
            cfg = cfg.with_failure_policy(FailurePolicy::AbortSweep);
        }
        cfg
    }

    /// Requested sweeps, in execution order.
    fn sweeps(&self) -> Vec<SweepKind> {
        SweepKind::ALL
            .into_iter()
            .filter(|k| match k {
                SweepKind::Schedule => self.schedule_stats,
                SweepKind::Iterations => self.iterations_stats,
                SweepKind::Threads => self.threads_stats,
                SweepKind::Speedup => self.vs_stats,
                SweepKind::WeakScaling => self.hybrid_stats,
            })
            .collect()
    }
}

fn main() -> anyhow::Result<ExitCode> {
    _ = env_logger::try_init();

    let cli = Cli::parse();
    let cfg = cli.cfg();

    for dir in [cfg.data_dir(), cfg.plots_dir()] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut failed = false;

    for kind in cli.sweeps() {
        match run_sweep(kind, &cfg, ProcessExecutor) {
            Ok(report) => {
                println!("{report}");
                println!("table: {}", kind.table_path(&cfg).display());
                failed |= !report.is_complete();
            }
            Err(e) => {
                log::error!("{e}");
                eprintln!("error: {e:#}");
                failed = true;
            }
        }
    }

    if let Some(path) = &cli.analyze {
        if let Err(e) = analyze_file(path, cfg.plots_dir(), cli.plot_type) {
            log::error!("{e}");
            eprintln!("error: analyzing {}: {e}", path.display());
            failed = true;
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
