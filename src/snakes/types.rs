//! Parsed tracer output.

use thiserror::Error;

/// Where the parser finds things on a tracer output file.
///
/// The defaults match the tracer's current output; other tool versions move
/// the header length and the coordinate columns around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnakeFormat {
    /// Lines discarded before the first curve.
    pub header_lines: usize,
    /// 0-indexed token positions of the coordinates on a point line.
    pub x_column: usize,
    pub y_column: usize,
    /// Optional z coordinate; a point line without it yields `z = None`.
    pub z_column: Option<usize>,
}

impl Default for SnakeFormat {
    fn default() -> Self {
        Self {
            header_lines: 30,
            x_column: 2,
            y_column: 3,
            z_column: Some(4),
        }
    }
}

impl SnakeFormat {
    /// Coordinates must come from distinct token positions.
    pub fn validate(&self) -> Result<(), FormatError> {
        let mut columns = vec![("x", self.x_column), ("y", self.y_column)];
        columns.extend(self.z_column.map(|column| ("z", column)));
        for (idx, &(first, column)) in columns.iter().enumerate() {
            if let Some(&(second, _)) = columns[idx + 1..].iter().find(|(_, c)| *c == column) {
                return Err(FormatError::ColumnClash {
                    first,
                    second,
                    column,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{first} and {second} columns must differ (both are {column})")]
    ColumnClash {
        first: &'static str,
        second: &'static str,
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

/// One traced filament.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub name: String,
    pub points: Vec<Point>,
    /// From the indicator line after the curve: `Some(true)` closed,
    /// `Some(false)` open, `None` when absent or unrecognised.
    pub closed: Option<bool>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Curves of one output file, sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub curves: Vec<Curve>,
    pub junction_seen: bool,
}

impl ParseResult {
    pub fn curve(&self, name: &str) -> Option<&Curve> {
        self.curves
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.curves[idx])
    }

    pub fn point_count(&self) -> usize {
        self.curves.iter().map(Curve::len).sum()
    }
}
