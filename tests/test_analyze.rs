use mc_sweep::{
    analyze::{analyze_table, canonicalize, AnalyzeError, PlotStyle, TableKind},
    chart::Chart,
    ColumnKind, Schema, Table, TableError,
};
use std::path::Path;

fn load(csv: &str) -> Table {
    let mut table = Table::from_reader(csv.as_bytes(), &Schema::default()).unwrap();
    canonicalize(&mut table).unwrap();
    table
}

fn file_names(analysis: &mc_sweep::analyze::Analysis) -> Vec<String> {
    analysis
        .charts
        .iter()
        .map(|c| c.path.strip_prefix("plots").unwrap().display().to_string())
        .collect()
}

#[test]
fn test_tables_are_recognized_by_their_columns() {
    let cases = [
        ("Iteration,Payoff Avg\n200,1.5\n", TableKind::PayoffConvergence),
        ("c,n,Time\n2,1,0.5\n", TableKind::WeakScaling),
        ("Thread count,Time\n1,0.5\n", TableKind::ThreadScaling),
        (",Day,Mean,Min,Max,Std Dev,End Price\n0,1,100,90,110,5,101\n", TableKind::PathStats),
        ("Schedule,Chunk,Time\nstatic,1,0.5\n", TableKind::Schedules),
        ("iteration,time_serial,time_openmp\n400,1.0,0.5\n", TableKind::Speedup),
    ];
    for (csv, expected) in cases {
        assert_eq!(TableKind::detect(&load(csv)), Some(expected), "{csv}");
    }
    assert_eq!(TableKind::detect(&load("foo,bar\n1,2\n")), None);
}

#[test]
fn test_payoff_chart_has_mean_reference_line() {
    let table = load("iteration,payoff_avg\n200,1.0\n400,2.0\n600,3.0\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();

    assert_eq!(file_names(&analysis), vec!["iteration_avg.png"]);
    let Chart::Line(chart) = &analysis.charts[0].chart else {
        panic!("expected a line chart");
    };
    assert_eq!(chart.series[0].points, vec![(200.0, 1.0), (400.0, 2.0), (600.0, 3.0)]);
    assert_eq!(chart.reference.as_ref().map(|r| r.y), Some(2.0));

    let stats: Vec<_> = analysis.column_stats.iter().map(|(c, s)| (c.as_str(), s.count)).collect();
    assert_eq!(stats, vec![("iteration", 3), ("payoff_avg", 3)]);
}

#[test]
fn test_thread_chart_has_min_reference_line() {
    let table = load("threads,time\n1,0.9\n2,0.5\n3,0.6\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();

    assert_eq!(file_names(&analysis), vec!["threads_stats.png"]);
    let Chart::Line(chart) = &analysis.charts[0].chart else {
        panic!("expected a line chart");
    };
    assert_eq!(chart.reference.as_ref().map(|r| r.y), Some(0.5));
}

#[test]
fn test_schedules_chart_has_one_log_series_per_schedule() {
    let table = load("schedule,chunk,time\nstatic,1,0.5\nstatic,5,0.4\ndynamic,1,0.9\ndynamic,5,0.7\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();

    assert_eq!(file_names(&analysis), vec!["schedules.png"]);
    let Chart::Line(chart) = &analysis.charts[0].chart else {
        panic!("expected a line chart");
    };
    assert!(chart.log_y);
    let labels: Vec<_> = chart.series.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["static", "dynamic"]);
    assert_eq!(chart.series[1].points, vec![(1.0, 0.9), (5.0, 0.7)]);
}

#[test]
fn test_weak_scaling_chart_groups_by_threads() {
    let table = load("threads,processes,time\n2,1,1.0\n2,3,0.6\n4,1,0.8\n4,3,0.5\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();

    assert_eq!(file_names(&analysis), vec!["weak_scaling.png"]);
    let Chart::Line(chart) = &analysis.charts[0].chart else {
        panic!("expected a line chart");
    };
    let labels: Vec<_> = chart.series.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Threads 2", "Threads 4"]);
    assert_eq!(chart.series[0].points, vec![(1.0, 1.0), (3.0, 0.6)]);
}

#[test]
fn test_speedup_views_skip_absent_columns() {
    let table = load("iteration,time_serial,time_openmp,time_mpi_2n\n400,1.0,0.5,0.4\n600,2.0,0.0,0.8\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();

    assert_eq!(file_names(&analysis), vec!["speedup/openmp_speedup.png"]);
    let Chart::Combo(chart) = &analysis.charts[0].chart else {
        panic!("expected a combo chart");
    };
    assert_eq!(chart.bars[0].points, vec![(400.0, 1.0), (600.0, 2.0)]);
    // The zero OpenMP time leaves the second speedup undefined.
    assert_eq!(chart.line.points, vec![(400.0, 2.0)]);
    assert_eq!(analysis.undefined.len(), 1);
    assert_eq!(analysis.undefined[0].row, 1);
}

#[test]
fn test_all_speedup_views_with_eight_processes() {
    let table = load("iteration,time_serial,time_openmp,time_mpi_8n\n400,1.0,0.5,0.25\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();
    assert_eq!(
        file_names(&analysis),
        vec![
            "speedup/openmp_speedup.png",
            "speedup/mpi_8n_speedup.png",
            "speedup/mpi_8n_speedup_over_openmp.png",
        ]
    );
    let Chart::Combo(chart) = &analysis.charts[2].chart else {
        panic!("expected a combo chart");
    };
    assert_eq!(chart.line.points, vec![(400.0, 2.0)]);
}

#[test]
fn test_path_stats_chart_follows_plot_style() {
    let table = load(",Day,Mean,Min,Max,Std Dev,End Price\n0,1,100.0,90.0,110.0,5.0,101.0\n1,2,102.0,91.0,112.0,6.0,99.5\n");
    let plots = Path::new("plots");

    let boxed = analyze_table(&table, plots, Some(PlotStyle::Box)).unwrap();
    assert_eq!(file_names(&boxed), vec!["box_plot_statistics.png"]);
    let Chart::Box(chart) = &boxed.charts[0].chart else {
        panic!("expected a box chart");
    };
    let groups: Vec<_> = chart.groups.iter().map(|(g, v)| (g.as_str(), v.len())).collect();
    assert_eq!(groups, vec![("mean", 2), ("min", 2), ("max", 2), ("std_dev", 2)]);

    let scatter = analyze_table(&table, plots, Some(PlotStyle::Scatter)).unwrap();
    assert_eq!(file_names(&scatter), vec!["end_price_over_days.png"]);
    let Chart::Scatter(chart) = &scatter.charts[0].chart else {
        panic!("expected a scatter chart");
    };
    assert_eq!(chart.points, vec![(1.0, 101.0), (2.0, 99.5)]);

    let lines = analyze_table(&table, plots, None).unwrap();
    assert_eq!(file_names(&lines), vec!["paths_line.png"]);
}

#[test]
fn test_unknown_table_is_an_error() {
    let table = load("foo,bar\n1,2\n");
    assert!(analyze_table(&table, Path::new("plots"), None).is_err());
}

#[test]
fn test_non_numeric_time_is_a_format_error() {
    let table = load("threads,time\n1,0.5\n2,oops\n3,0.6\n");
    assert_eq!(TableKind::detect(&table), Some(TableKind::ThreadScaling));

    let err = analyze_table(&table, Path::new("plots"), None).unwrap_err();
    match err {
        AnalyzeError::Table(TableError::ParseValue { line, column, value, expected }) => {
            assert_eq!((line, column.as_str(), value.as_str()), (3, "time", "oops"));
            assert_eq!(expected, ColumnKind::Float);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_legacy_headers_are_typed_after_renaming() {
    let table = load("Thread count,Time\n1,0.5\n2,1\n");
    let analysis = analyze_table(&table, Path::new("plots"), None).unwrap();
    let Chart::Line(chart) = &analysis.charts[0].chart else {
        panic!("expected a line chart");
    };
    assert_eq!(chart.series[0].points, vec![(1.0, 0.5), (2.0, 1.0)]);
}

#[test]
fn test_speedup_schema_covers_every_process_count() {
    let table = load("iteration,time_serial,time_openmp,time_mpi_2n,time_mpi_4n\n400,1.0,0.5,0.4,x\n");
    let err = analyze_table(&table, Path::new("plots"), None).unwrap_err();
    assert!(
        matches!(&err, AnalyzeError::Table(TableError::ParseValue { column, .. }) if column == "time_mpi_4n"),
        "{err:?}"
    );
}
