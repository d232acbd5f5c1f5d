//! Derived columns computed point-wise from two existing columns of a loaded table.

use crate::{Table, TableError, Value};
use std::fmt;

/// `result = base / comparison`, e.g. speedup = serial time / parallel time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ratio {
    pub base: String,
    pub comparison: String,
    pub result: String,
}

impl Ratio {
    pub fn new(
        base: impl Into<String>,
        comparison: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            comparison: comparison.into(),
            result: result.into(),
        }
    }
}

/// Why a derived cell was left [`Value::Missing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undefined {
    ZeroDenominator,
    MissingOperand,
}

/// A row whose derived value is undefined. Such rows get [`Value::Missing`] instead of an infinite or NaN value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedRow {
    pub row: usize,
    pub result: String,
    pub reason: Undefined,
}

impl fmt::Display for UndefinedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            Undefined::ZeroDenominator => "denominator is zero",
            Undefined::MissingOperand => "an operand is missing or not numeric",
        };
        write!(f, "row {}: `{}` undefined, {reason}", self.row, self.result)
    }
}

/// Appends (or replaces) one column per ratio. Base and comparison columns are never modified.
///
/// Rows whose value cannot be defined are reported in the returned list rather than failing the derivation.
///
/// # Errors
/// - [`TableError::MissingColumn`] if a base or comparison column does not exist.
/// - [`TableError::DuplicateColumn`] if a result name equals its own base or comparison column.
pub fn derive_ratios(table: &mut Table, ratios: &[Ratio]) -> Result<Vec<UndefinedRow>, TableError> {
    let mut undefined = Vec::new();

    for ratio in ratios {
        if ratio.result == ratio.base || ratio.result == ratio.comparison {
            return Err(TableError::DuplicateColumn {
                column: ratio.result.clone(),
            });
        }

        let base = table.column(&ratio.base)?;
        let comparison = table.column(&ratio.comparison)?;

        let values: Vec<Value> = base
            .iter()
            .zip(&comparison)
            .enumerate()
            .map(|(row, (b, c))| match (b.as_f64(), c.as_f64()) {
                (Some(_), Some(c)) if c == 0.0 => Err(Undefined::ZeroDenominator),
                (Some(b), Some(c)) => Ok(b / c),
                _ => Err(Undefined::MissingOperand),
            }
            .map(Value::Float)
            .unwrap_or_else(|reason| {
                let u = UndefinedRow {
                    row,
                    result: ratio.result.clone(),
                    reason,
                };
                log::warn!("{u}");
                undefined.push(u);
                Value::Missing
            }))
            .collect();

        table.set_column(&ratio.result, values)?;
    }

    Ok(undefined)
}
