//! Parameter grids: ordered axes and their Cartesian enumeration.

use crate::Value;

//=================
// Axis

/// One finite, ordered list of parameter values swept by nested enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    values: Vec<Value>,
}

impl Axis {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Axis of integer values.
    pub fn ints(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Int).collect())
    }

    /// Axis of short enumeration strings.
    pub fn texts<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        Self::new(
            name,
            values.iter().map(|s| Value::Text(s.as_ref().to_owned())).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//=================
// GridPoint

/// One combination of axis values, in axis order, with its position in the enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    index: usize,
    values: Vec<(String, Value)>,
}

impl GridPoint {
    /// Position of this point in enumeration order, starting at `0`.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    pub fn get(&self, axis: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == axis).map(|(_, v)| v)
    }

    /// Compact `axis=value` rendering used in progress output.
    pub fn describe(&self) -> String {
        self.values
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

//=================
// Grid

/// The Cartesian product of one or more [`Axis`]es.
///
/// Enumeration follows nested-loop semantics: the first axis varies slowest and the last axis fastest.
/// A grid without axes, or with any empty axis, has no points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    axes: Vec<Axis>,
}

impl Grid {
    pub fn new(axes: Vec<Axis>) -> Self {
        Self { axes }
    }

    /// Appends an inner (faster varying) axis.
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axes.push(axis);
        self
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of points in the product.
    pub fn len(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(Axis::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> GridPoints<'_> {
        GridPoints {
            grid: self,
            odometer: vec![0; self.axes.len()],
            index: 0,
            done: self.is_empty(),
        }
    }
}

/// Iterator over the points of a [`Grid`], see [`Grid::points`].
pub struct GridPoints<'a> {
    grid: &'a Grid,
    odometer: Vec<usize>,
    index: usize,
    done: bool,
}

impl GridPoints<'_> {
    /// Advances the odometer; returns `false` once every digit has rolled over.
    fn advance(&mut self) -> bool {
        for (digit, axis) in self.odometer.iter_mut().zip(&self.grid.axes).rev() {
            *digit += 1;
            if *digit < axis.len() {
                return true;
            }
            *digit = 0;
        }
        false
    }
}

impl Iterator for GridPoints<'_> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.done {
            return None;
        }

        let values = self
            .odometer
            .iter()
            .zip(&self.grid.axes)
            .map(|(&i, axis)| (axis.name.clone(), axis.values[i].clone()))
            .collect();
        let point = GridPoint {
            index: self.index,
            values,
        };

        self.index += 1;
        self.done = !self.advance();
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done {
            0
        } else {
            self.grid.len() - self.index
        };
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_axis_varies_slowest() {
        let grid = Grid::default()
            .with_axis(Axis::texts("schedule", &["static", "dynamic"]))
            .with_axis(Axis::ints("chunk", [1, 5, 10]));

        let seen: Vec<String> = grid.points().map(|p| p.describe()).collect();
        assert_eq!(
            seen,
            vec![
                "schedule=static, chunk=1",
                "schedule=static, chunk=5",
                "schedule=static, chunk=10",
                "schedule=dynamic, chunk=1",
                "schedule=dynamic, chunk=5",
                "schedule=dynamic, chunk=10",
            ]
        );
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.points().last().map(|p| p.index()), Some(5));
    }

    #[test]
    fn degenerate_grids() {
        assert_eq!(Grid::default().points().count(), 0);

        let empty_axis = Grid::default()
            .with_axis(Axis::ints("a", [1, 2]))
            .with_axis(Axis::ints("b", Vec::new()));
        assert_eq!(empty_axis.points().count(), 0);

        let single = Grid::default().with_axis(Axis::ints("threads", [4]));
        let points: Vec<_> = single.points().collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].get("threads"), Some(&Value::Int(4)));
    }
}
