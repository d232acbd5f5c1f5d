//! Drives an external Monte Carlo executable through parameter sweeps, collects one record per grid point
//! from its textual output, persists the records as CSV tables, and derives and charts performance
//! metrics from those tables.
//!
//! The building blocks are:
//! - a [`Grid`] of named [`Axis`] values, enumerated in a deterministic order;
//! - [`CommandTemplate`]s rendered at each grid point into [`Invocation`]s, run by an [`Executor`];
//! - [`Extraction`] rules turning captured output into named fields;
//! - the [`SweepRunner`], which ties these together and hands [`Record`]s to a [`RecordSink`]
//!   such as a [`TableWriter`];
//! - [`Table`] loading, [`derive_ratios`], and chart planning in [`analyze`].
//!
//! The sweeps of the OpenMP / MPI performance study are predefined in [`scenarios`] and configured by
//! [`HarnessCfg`].
//!
//! ```rust
//! use mc_sweep::{Axis, CommandTemplate, Extraction, Grid, Probe, SweepPlan};
//!
//! let grid = Grid::default()
//!     .with_axis(Axis::texts("schedule", &["static", "dynamic"]))
//!     .with_axis(Axis::ints("chunk", [1, 5]));
//! let command = CommandTemplate::new("./monte-carlo")
//!     .args(["-i", "3000"])
//!     .env("OMP_SCHEDULE", "{schedule},{chunk}");
//! let plan = SweepPlan::new("schedule", grid)
//!     .with_probe(Probe::new("openmp", command, Extraction::positional([("time", 1)])));
//!
//! assert!(plan.validate().is_ok());
//! assert_eq!(plan.grid().len(), 4);
//! assert_eq!(plan.columns(), vec!["schedule", "chunk", "time"]);
//! ```

#![deny(clippy::unwrap_used)]

mod value;
pub use value::*;

mod grid;
pub use grid::*;

mod template;
pub use template::*;

mod invoke;
pub use invoke::*;

pub mod extract;
pub use extract::{numeric_tokens, ExtractError, Extraction};

mod table;
pub use table::*;

mod derive;
pub use derive::*;

mod sweep;
pub use sweep::*;

pub mod stats;

pub mod config;
pub use config::{HarnessCfg, StepRange};

pub mod scenarios;
pub use scenarios::{run_sweep, SweepKind};

pub mod chart;

pub mod analyze;
