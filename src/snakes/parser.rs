//! State machine over the tracer's snake output.
//!
//! Layout after the fixed header:
//! - a name line opens a curve
//! - point lines follow, coordinates at configurable token positions
//! - a single-token line closes the curve; the next line is its open/closed
//!   indicator (`#1`/`1` closed, `#0`/`0` open)
//! - a three-token line starts the junction section, which ends curve data
//!
//! Lines are tokenized lazily; the file is never held in memory as a whole.

use std::collections::HashSet;
use std::io::BufRead;

use thiserror::Error;

use super::types::{Curve, ParseResult, Point, SnakeFormat};

#[derive(Debug, Error)]
pub enum SnakeParseError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("file has {found} lines, shorter than the {expected}-line header")]
    TruncatedHeader { expected: usize, found: usize },
    #[error("line {line}: token {column} '{token}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("line {line}: point record has {found} tokens, coordinate column {column} missing")]
    MissingColumn {
        line: usize,
        column: usize,
        found: usize,
    },
    #[error("curve '{name}' (opened on line {line}) not terminated before end of file")]
    UnterminatedCurve { name: String, line: usize },
    #[error("line {line}: curve '{name}' appears more than once")]
    DuplicateCurve { name: String, line: usize },
}

/// Tokenized lines with 1-based line numbers.
struct TokenLines<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> TokenLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Discard `count` lines; returns how many were actually there.
    fn skip(&mut self, count: usize) -> Result<usize, SnakeParseError> {
        for skipped in 0..count {
            if !self.advance()? {
                return Ok(skipped);
            }
        }
        Ok(count)
    }

    fn next_tokens(&mut self) -> Result<Option<(usize, Vec<&str>)>, SnakeParseError> {
        if !self.advance()? {
            return Ok(None);
        }
        Ok(Some((self.line_no, self.buf.split_whitespace().collect())))
    }

    fn advance(&mut self) -> Result<bool, SnakeParseError> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        Ok(true)
    }
}

enum State {
    ExpectName,
    InCurve {
        name: String,
        opened_at: usize,
        points: Vec<Point>,
    },
    /// Curve just stored; the next line is its indicator.
    AwaitIndicator,
}

/// Parse one tracer output stream.
pub fn parse_snakes<R: BufRead>(
    reader: R,
    format: &SnakeFormat,
) -> Result<ParseResult, SnakeParseError> {
    let mut lines = TokenLines::new(reader);
    let found = lines.skip(format.header_lines)?;
    if found < format.header_lines {
        return Err(SnakeParseError::TruncatedHeader {
            expected: format.header_lines,
            found,
        });
    }

    let mut curves: Vec<Curve> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut junction_seen = false;
    let mut state = State::ExpectName;

    loop {
        let next = lines.next_tokens()?;
        state = match (state, next) {
            (State::ExpectName, None) | (State::AwaitIndicator, None) => break,
            (State::InCurve { name, opened_at, .. }, None) => {
                return Err(SnakeParseError::UnterminatedCurve {
                    name,
                    line: opened_at,
                });
            }

            (State::ExpectName, Some((_, tokens))) if tokens.is_empty() => State::ExpectName,
            (State::ExpectName, Some((_, tokens))) if tokens.len() == 3 => {
                junction_seen = true;
                break;
            }
            (State::ExpectName, Some((line, tokens))) => {
                let name = tokens[0].to_string();
                if !seen.insert(name.clone()) {
                    return Err(SnakeParseError::DuplicateCurve { name, line });
                }
                State::InCurve {
                    name,
                    opened_at: line,
                    points: Vec::new(),
                }
            }

            (State::InCurve { name, points, .. }, Some((_, tokens))) if tokens.len() == 1 => {
                curves.push(Curve {
                    name,
                    points,
                    closed: None,
                });
                State::AwaitIndicator
            }
            (State::InCurve { name, points, .. }, Some((_, tokens))) if tokens.len() == 3 => {
                curves.push(Curve {
                    name,
                    points,
                    closed: None,
                });
                junction_seen = true;
                break;
            }
            (
                State::InCurve {
                    name,
                    opened_at,
                    mut points,
                },
                Some((line, tokens)),
            ) => {
                points.push(parse_point(line, &tokens, format)?);
                State::InCurve {
                    name,
                    opened_at,
                    points,
                }
            }

            (State::AwaitIndicator, Some((_, tokens))) => {
                if let Some(curve) = curves.last_mut() {
                    curve.closed = indicator(&tokens);
                }
                State::ExpectName
            }
        };
    }

    curves.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::trace!(curves = curves.len(), junction_seen, "parsed snake stream");
    Ok(ParseResult {
        curves,
        junction_seen,
    })
}

fn parse_point(line: usize, tokens: &[&str], format: &SnakeFormat) -> Result<Point, SnakeParseError> {
    let x = coordinate(line, tokens, format.x_column)?;
    let y = coordinate(line, tokens, format.y_column)?;
    let z = match format.z_column {
        Some(column) if column < tokens.len() => Some(coordinate(line, tokens, column)?),
        _ => None,
    };
    Ok(Point { x, y, z })
}

fn coordinate(line: usize, tokens: &[&str], column: usize) -> Result<f64, SnakeParseError> {
    let token = tokens.get(column).ok_or(SnakeParseError::MissingColumn {
        line,
        column,
        found: tokens.len(),
    })?;
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| SnakeParseError::InvalidNumber {
            line,
            column,
            token: token.to_string(),
        })
}

fn indicator(tokens: &[&str]) -> Option<bool> {
    match tokens {
        ["1"] | ["#1"] => Some(true),
        ["0"] | ["#0"] => Some(false),
        _ => None,
    }
}
