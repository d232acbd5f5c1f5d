//! Chart rendering to PNG files with [plotters](https://crates.io/crates/plotters).
//!
//! Charts are described by plain data ([`Chart`]) so that what gets drawn can be decided, and tested,
//! independently of the drawing backend.

use plotters::prelude::*;
use std::{
    error::Error,
    fs,
    ops::Range,
    path::{Path, PathBuf},
};
use thiserror::Error;

const PURPLE: RGBColor = RGBColor(128, 0, 128);
const DEEP_PINK: RGBColor = RGBColor(255, 20, 147);

//==============
// Errors

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: drawing failed: {message}")]
    Draw { path: String, message: String },

    #[error("{path}: nothing to plot")]
    NoData { path: String },
}

//=================
// Chart descriptions

/// A labelled sequence of `(x, y)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// Horizontal reference line, e.g. the mean of the plotted values.
#[derive(Debug, Clone, PartialEq)]
pub struct RefLine {
    pub label: String,
    pub y: f64,
}

/// One or more line series sharing both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    /// Logarithmic y axis; ignored (with a warning) if any value is not positive.
    pub log_y: bool,
    pub reference: Option<RefLine>,
}

/// Two bar series side by side on the primary y axis plus one line on a secondary y axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub y2_label: String,
    pub bars: [Series; 2],
    pub bar_width: f64,
    pub line: Series,
}

/// Box plots of several value groups.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxChart {
    pub title: String,
    pub y_label: String,
    pub groups: Vec<(String, Vec<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Line(LineChart),
    Combo(ComboChart),
    Box(BoxChart),
    Scatter(ScatterChart),
}

/// A chart and the image file it is written to. Existing files are overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartJob {
    pub path: PathBuf,
    pub chart: Chart,
}

//=================
// Rendering

impl ChartJob {
    /// Draws the chart, creating the image's parent directory if needed.
    pub fn render(&self) -> Result<(), ChartError> {
        let path = self.path.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ChartError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let drawn = match &self.chart {
            Chart::Line(c) => draw_line(path, c),
            Chart::Combo(c) => draw_combo(path, c),
            Chart::Box(c) => draw_box(path, c),
            Chart::Scatter(c) => draw_scatter(path, c),
        };

        match drawn {
            Ok(true) => {
                log::info!("wrote chart {}", path.display());
                Ok(())
            }
            Ok(false) => Err(ChartError::NoData {
                path: path.display().to_string(),
            }),
            Err(e) => Err(ChartError::Draw {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

type DrawResult = Result<bool, Box<dyn Error>>;

/// Range covering `values` with a 5% margin on each side.
fn padded(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let margin = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.5 };
    Some(lo - margin..hi + margin)
}

fn draw_line(path: &Path, c: &LineChart) -> DrawResult {
    let all_y = || {
        c.series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .chain(c.reference.iter().map(|r| r.y))
    };
    let log_y = c.log_y && all_y().all(|y| y > 0.0);
    if c.log_y && !log_y {
        log::warn!("{}: non-positive values, using a linear y axis", path.display());
    }
    let ty = |y: f64| if log_y { y.log10() } else { y };

    let Some(x_range) = padded(c.series.iter().flat_map(|s| s.points.iter().map(|p| p.0))) else {
        return Ok(false);
    };
    let Some(y_range) = padded(all_y().map(ty)) else {
        return Ok(false);
    };
    let (x0, x1) = (x_range.start, x_range.end);

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&c.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;

    let y_fmt = |v: &f64| {
        if log_y {
            format!("{:.3e}", 10f64.powf(*v))
        } else {
            format!("{v:.3}")
        }
    };
    chart
        .configure_mesh()
        .x_desc(c.x_label.as_str())
        .y_desc(c.y_label.as_str())
        .y_label_formatter(&y_fmt)
        .draw()?;

    for (i, s) in c.series.iter().enumerate() {
        let color = Palette99::pick(i).mix(1.0);
        let pts: Vec<(f64, f64)> = s.points.iter().map(|&(x, y)| (x, ty(y))).collect();
        chart
            .draw_series(LineSeries::new(pts.clone(), color.stroke_width(2)))?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(pts.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
    }

    if let Some(r) = &c.reference {
        let y = ty(r.y);
        chart
            .draw_series(LineSeries::new(vec![(x0, y), (x1, y)], RED.stroke_width(1)))?
            .label(r.label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(true)
}

fn draw_combo(path: &Path, c: &ComboChart) -> DrawResult {
    let half = c.bar_width / 2.0;
    let Some(x_range) = padded(
        c.bars
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .flat_map(|x| [x - c.bar_width, x + c.bar_width]),
    ) else {
        return Ok(false);
    };
    let bar_max = c
        .bars
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.1))
        .fold(0f64, f64::max);
    let Some(y2_range) = padded(c.line.points.iter().map(|p| p.1)) else {
        return Ok(false);
    };

    let root = BitMapBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&c.title, ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), 0f64..(bar_max * 1.1).max(f64::MIN_POSITIVE))?
        .set_secondary_coord(x_range, y2_range);

    chart
        .configure_mesh()
        .x_desc(c.x_label.as_str())
        .y_desc(c.y_label.as_str())
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc(c.y2_label.as_str())
        .draw()?;

    // The first bar series sits right of its x value, the second left of it.
    for (s, (offset, color)) in c.bars.iter().zip([(half, PURPLE), (-half, BLUE)]) {
        chart
            .draw_series(s.points.iter().map(|&(x, y)| {
                Rectangle::new(
                    [(x + offset - half, 0.0), (x + offset + half, y)],
                    color.mix(0.7).filled(),
                )
            }))?
            .label(s.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.mix(0.7).filled()));
    }

    chart
        .draw_secondary_series(LineSeries::new(
            c.line.points.iter().copied(),
            DEEP_PINK.stroke_width(2),
        ))?
        .label(c.line.label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], DEEP_PINK));
    chart.draw_secondary_series(
        c.line
            .points
            .iter()
            .map(|&p| Circle::new(p, 4, DEEP_PINK.filled())),
    )?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(true)
}

fn draw_box(path: &Path, c: &BoxChart) -> DrawResult {
    let groups: Vec<&(String, Vec<f64>)> = c.groups.iter().filter(|(_, v)| !v.is_empty()).collect();
    let Some(y_range) = padded(groups.iter().flat_map(|(_, v)| v.iter().copied())) else {
        return Ok(false);
    };
    let labels: Vec<String> = groups.iter().map(|(l, _)| l.clone()).collect();

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&c.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(
            labels[..].into_segmented(),
            y_range.start as f32..y_range.end as f32,
        )?;
    chart.configure_mesh().y_desc(c.y_label.as_str()).draw()?;

    chart.draw_series(groups.iter().zip(&labels).map(|((_, values), label)| {
        Boxplot::new_vertical(SegmentValue::CenterOf(label), &Quartiles::new(values.as_slice()))
            .width(40)
            .style(BLUE)
    }))?;

    root.present()?;
    Ok(true)
}

fn draw_scatter(path: &Path, c: &ScatterChart) -> DrawResult {
    let Some(x_range) = padded(c.points.iter().map(|p| p.0)) else {
        return Ok(false);
    };
    let Some(y_range) = padded(c.points.iter().map(|p| p.1)) else {
        return Ok(false);
    };

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&c.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(c.x_label.as_str())
        .y_desc(c.y_label.as_str())
        .draw()?;
    chart.draw_series(c.points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

    root.present()?;
    Ok(true)
}
