//! Analysis of persisted sweep tables: recognizes which sweep (or path-statistics file) a table came
//! from, derives speedup columns, summarizes numeric columns, and plans the charts for it.

use crate::{
    chart::{BoxChart, Chart, ChartError, ChartJob, ComboChart, LineChart, RefLine, ScatterChart, Series},
    derive_ratios,
    scenarios::col,
    stats::ColumnStats,
    Ratio, Schema, Table, TableError, UndefinedRow,
};
use std::path::Path;
use thiserror::Error;

//==============
// Errors

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("unrecognized table with columns {columns:?}")]
    UnknownTable { columns: Vec<String> },
}

//=================
// Column names

/// Path-statistics columns written by the simulation's `--save-stats` option.
pub mod path_col {
    pub const DAY: &str = "day";
    pub const MEAN: &str = "mean";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const STD_DEV: &str = "std_dev";
    pub const END_PRICE: &str = "end_price";
}

/// Maps a header to the canonical snake-case column name, e.g. `Payoff Avg` to `payoff_avg` and
/// `Thread count` to `threads`.
pub fn canonical_column_name(name: &str) -> String {
    let snake = name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let alias = match snake.as_str() {
        "thread" | "thread_count" | "c" => col::THREADS,
        "n" => col::PROCESSES,
        "last_price" => path_col::END_PRICE,
        _ => return snake,
    };
    alias.to_owned()
}

/// Renames every column of `table` to its canonical name.
pub fn canonicalize(table: &mut Table) -> Result<(), TableError> {
    table.rename_columns(canonical_column_name)
}

//=================
// Table kinds

/// What a table holds, as recognized from its canonical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    PayoffConvergence,
    WeakScaling,
    ThreadScaling,
    PathStats,
    Schedules,
    Speedup,
}

impl TableKind {
    /// Recognizes a table by its canonical column names; the first matching rule wins.
    pub fn detect(table: &Table) -> Option<TableKind> {
        let has = |c: &str| table.has_column(c);
        if has(col::PAYOFF_AVG) {
            Some(TableKind::PayoffConvergence)
        } else if has(col::THREADS) && has(col::PROCESSES) {
            Some(TableKind::WeakScaling)
        } else if has(col::THREADS) {
            Some(TableKind::ThreadScaling)
        } else if has(path_col::DAY) {
            Some(TableKind::PathStats)
        } else if has(col::SCHEDULE) {
            Some(TableKind::Schedules)
        } else if has(col::TIME_SERIAL) {
            Some(TableKind::Speedup)
        } else {
            None
        }
    }

    /// Column kinds a table of this kind must satisfy. Speedup tables declare every `time_*` column a
    /// float, whatever process counts were swept.
    pub fn schema(self, table: &Table) -> Schema {
        match self {
            TableKind::PayoffConvergence => Schema::new().int(col::ITERATION).float(col::PAYOFF_AVG),
            TableKind::WeakScaling => Schema::new()
                .int(col::THREADS)
                .int(col::PROCESSES)
                .float(col::TIME),
            TableKind::ThreadScaling => Schema::new().int(col::THREADS).float(col::TIME),
            TableKind::PathStats => [
                path_col::DAY,
                path_col::MEAN,
                path_col::MIN,
                path_col::MAX,
                path_col::STD_DEV,
                path_col::END_PRICE,
            ]
            .into_iter()
            .fold(Schema::new(), Schema::float),
            TableKind::Schedules => Schema::new()
                .text(col::SCHEDULE)
                .int(col::CHUNK)
                .float(col::TIME),
            TableKind::Speedup => table
                .columns()
                .iter()
                .filter(|c| c.starts_with("time_"))
                .fold(Schema::new().int(col::ITERATION), |schema, c| schema.float(c)),
        }
    }
}

/// Chart style for path-statistics tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotStyle {
    /// Box plots of mean, min, max and standard deviation.
    Box,
    /// End price against day.
    Scatter,
}

/// One speedup chart: bars for two timing columns and their ratio as a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedupView {
    pub base: String,
    pub comparison: String,
    pub title: String,
    /// Image path relative to the plots directory.
    pub image: String,
}

impl SpeedupView {
    fn new(base: impl Into<String>, comparison: impl Into<String>, title: &str, image: &str) -> Self {
        Self {
            base: base.into(),
            comparison: comparison.into(),
            title: title.to_owned(),
            image: image.to_owned(),
        }
    }

    /// OpenMP over serial, 8-process hybrid over serial, 8-process hybrid over OpenMP.
    pub fn defaults() -> Vec<SpeedupView> {
        let mpi_8 = col::time_mpi(8);
        vec![
            SpeedupView::new(
                col::TIME_SERIAL,
                col::TIME_OPENMP,
                "OpenMP speedup over serial",
                "speedup/openmp_speedup.png",
            ),
            SpeedupView::new(
                col::TIME_SERIAL,
                &mpi_8,
                "MPI (8 processes) speedup over serial",
                "speedup/mpi_8n_speedup.png",
            ),
            SpeedupView::new(
                col::TIME_OPENMP,
                &mpi_8,
                "MPI (8 processes) speedup over OpenMP",
                "speedup/mpi_8n_speedup_over_openmp.png",
            ),
        ]
    }
}

//=================
// Planning

/// Result of analyzing one table.
#[derive(Debug)]
pub struct Analysis {
    pub kind: TableKind,
    /// Statistics of every column holding at least one number, in column order.
    pub column_stats: Vec<(String, ColumnStats)>,
    pub charts: Vec<ChartJob>,
    /// Derived speedup cells left empty.
    pub undefined: Vec<UndefinedRow>,
}

fn column_stats(table: &Table) -> Vec<(String, ColumnStats)> {
    table
        .columns()
        .iter()
        .filter_map(|c| {
            let values = table.numbers(c).ok()?;
            Some((c.clone(), ColumnStats::new(&values)?))
        })
        .collect()
}

fn line(title: &str, x_label: &str, y_label: &str, series: Vec<Series>) -> LineChart {
    LineChart {
        title: title.to_owned(),
        x_label: x_label.to_owned(),
        y_label: y_label.to_owned(),
        series,
        log_y: false,
        reference: None,
    }
}

/// One series per distinct value of `group`, labelled `{prefix}{value}`.
fn grouped_series(
    table: &Table,
    group: &str,
    prefix: &str,
    x: &str,
    y: &str,
) -> Result<Vec<Series>, TableError> {
    table
        .group_by(group)?
        .into_iter()
        .map(|(key, rows)| Ok(Series::new(format!("{prefix}{key}"), rows.pairs_f64(x, y)?)))
        .collect()
}

/// Decides which charts to draw for `table` (with canonical column names) without drawing them.
///
/// Speedup views whose columns are absent are skipped with a warning.
///
/// # Errors
/// - [`AnalyzeError::UnknownTable`] if the table's kind cannot be recognized.
/// - [`TableError::ParseValue`] if a cell does not parse as the kind its column has in
///   [`TableKind::schema`], e.g. a non-numeric `time`.
pub fn analyze_table(
    table: &Table,
    plots_dir: &Path,
    style: Option<PlotStyle>,
) -> Result<Analysis, AnalyzeError> {
    let kind = TableKind::detect(table).ok_or_else(|| AnalyzeError::UnknownTable {
        columns: table.columns().to_vec(),
    })?;
    log::debug!("analyzing {kind:?} table with {} rows", table.len());

    let mut typed = table.clone();
    typed.conform(&kind.schema(table))?;
    let table = &typed;

    let job = |image: &str, chart: Chart| ChartJob {
        path: plots_dir.join(image),
        chart,
    };
    let mut undefined = Vec::new();

    let charts = match kind {
        TableKind::PayoffConvergence => {
            let mean = ColumnStats::new(&table.numbers(col::PAYOFF_AVG)?).map(|s| s.mean);
            let mut chart = line(
                "Convergence of Average Payoff",
                "Iterations",
                "Average Payoff",
                vec![Series::new(
                    "payoff average",
                    table.pairs_f64(col::ITERATION, col::PAYOFF_AVG)?,
                )],
            );
            chart.reference = mean.map(|y| RefLine {
                label: "mean value".to_owned(),
                y,
            });
            vec![job("iteration_avg.png", Chart::Line(chart))]
        }

        TableKind::ThreadScaling => {
            let min = ColumnStats::new(&table.numbers(col::TIME)?).map(|s| s.min);
            let mut chart = line(
                "Time elapsed",
                "Threads",
                "Time (s)",
                vec![Series::new("time", table.pairs_f64(col::THREADS, col::TIME)?)],
            );
            chart.reference = min.map(|y| RefLine {
                label: "min value".to_owned(),
                y,
            });
            vec![job("threads_stats.png", Chart::Line(chart))]
        }

        TableKind::Schedules => {
            let mut chart = line(
                "Schedules Performance",
                "Chunk Size",
                "Time Elapsed (s)",
                grouped_series(table, col::SCHEDULE, "", col::CHUNK, col::TIME)?,
            );
            chart.log_y = true;
            vec![job("schedules.png", Chart::Line(chart))]
        }

        TableKind::WeakScaling => {
            let mut chart = line(
                "Weak scaling",
                "MPI processes",
                "Time Elapsed (s)",
                grouped_series(table, col::THREADS, "Threads ", col::PROCESSES, col::TIME)?,
            );
            chart.log_y = true;
            vec![job("weak_scaling.png", Chart::Line(chart))]
        }

        TableKind::PathStats => match style {
            Some(PlotStyle::Box) => {
                let groups = [path_col::MEAN, path_col::MIN, path_col::MAX, path_col::STD_DEV]
                    .into_iter()
                    .filter(|c| table.has_column(c))
                    .map(|c| Ok((c.to_owned(), table.numbers(c)?)))
                    .collect::<Result<Vec<_>, TableError>>()?;
                vec![job(
                    "box_plot_statistics.png",
                    Chart::Box(BoxChart {
                        title: "Path statistics".to_owned(),
                        y_label: "Price".to_owned(),
                        groups,
                    }),
                )]
            }
            Some(PlotStyle::Scatter) => vec![job(
                "end_price_over_days.png",
                Chart::Scatter(ScatterChart {
                    title: "End price over days".to_owned(),
                    x_label: "Day".to_owned(),
                    y_label: "End price".to_owned(),
                    points: table.pairs_f64(path_col::DAY, path_col::END_PRICE)?,
                }),
            )],
            None => {
                let series = [path_col::MEAN, path_col::MIN, path_col::MAX]
                    .into_iter()
                    .filter(|c| table.has_column(c))
                    .map(|c| Ok(Series::new(c, table.pairs_f64(path_col::DAY, c)?)))
                    .collect::<Result<Vec<_>, TableError>>()?;
                vec![job(
                    "paths_line.png",
                    Chart::Line(line("Path statistics over days", "Day", "Price", series)),
                )]
            }
        },

        TableKind::Speedup => {
            let mut derived = table.clone();
            let mut charts = Vec::new();
            for view in SpeedupView::defaults() {
                if !(table.has_column(&view.base) && table.has_column(&view.comparison)) {
                    log::warn!(
                        "skipping `{}`: needs columns `{}` and `{}`",
                        view.image,
                        view.base,
                        view.comparison
                    );
                    continue;
                }
                let speedup = format!("speedup_{}_{}", view.base, view.comparison);
                undefined.extend(derive_ratios(
                    &mut derived,
                    &[Ratio::new(&view.base, &view.comparison, &speedup)],
                )?);

                charts.push(job(
                    &view.image,
                    Chart::Combo(ComboChart {
                        title: view.title.clone(),
                        x_label: "Iterations".to_owned(),
                        y_label: "Time (s)".to_owned(),
                        y2_label: "Speedup".to_owned(),
                        bars: [
                            Series::new(&view.base, derived.pairs_f64(col::ITERATION, &view.base)?),
                            Series::new(
                                &view.comparison,
                                derived.pairs_f64(col::ITERATION, &view.comparison)?,
                            ),
                        ],
                        bar_width: 20.0,
                        line: Series::new("speedup", derived.pairs_f64(col::ITERATION, &speedup)?),
                    }),
                ));
            }
            charts
        }
    };

    Ok(Analysis {
        kind,
        column_stats: column_stats(table),
        charts,
        undefined,
    })
}

/// Loads the table at `path`, canonicalizes its columns, prints a summary of every numeric column,
/// and draws its charts under `plots_dir`.
pub fn analyze_file(
    path: impl AsRef<Path>,
    plots_dir: &Path,
    style: Option<PlotStyle>,
) -> Result<Analysis, AnalyzeError> {
    let path = path.as_ref();
    let mut table = Table::read_csv(path)?;
    canonicalize(&mut table)?;

    let analysis = analyze_table(&table, plots_dir, style)?;

    println!("{}: {} rows, {:?}", path.display(), table.len(), analysis.kind);
    for (name, stats) in &analysis.column_stats {
        println!("  {name}: {stats}");
    }
    for u in &analysis.undefined {
        println!("  {u}");
    }

    for chart in &analysis.charts {
        chart.render()?;
        println!("  chart: {}", chart.path.display());
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_headers_are_canonicalized() {
        let names: Vec<_> = ["Payoff Avg", "Thread count", "c", "n", "Std Dev", "last_price", "Time"]
            .into_iter()
            .map(canonical_column_name)
            .collect();
        assert_eq!(
            names,
            vec!["payoff_avg", "threads", "threads", "processes", "std_dev", "end_price", "time"]
        );
    }
}
