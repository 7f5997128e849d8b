//! Formula evaluation.
//!
//! A formula body (input after the `=` prefix) is case-folded and
//! dispatched: `SUM(range)` and `AVG(range)` aggregate the referenced
//! cells' numeric values, a pure arithmetic expression goes through the
//! restricted parser, and everything else is an unsupported-formula error.
//! All failures surface as an [`EvalError`] that the sheet renders into the
//! cell as an `Error: ...` string; nothing here panics or escapes.

use thiserror::Error;

use super::cell::{CellKind, Grid, Value, classify};
use super::cell_ref::CellRef;
use super::deps::parse_range;
use super::parse::eval_arithmetic;

/// Why a formula failed to evaluate.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unsupported formula")]
    Unsupported,

    #[error("invalid syntax")]
    Syntax,

    #[error("character '{0}' is not allowed in arithmetic")]
    ForbiddenChar(char),

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed range '{0}'")]
    BadRange(String),

    #[error("range '{0}' is out of bounds")]
    OutOfBounds(String),

    #[error("circular reference")]
    Circular,
}

#[derive(Clone, Copy)]
enum Aggregate {
    Sum,
    Avg,
}

/// Classify raw input and compute its value against the current store.
///
/// The classifier contract: formulas evaluate synchronously (errors are
/// rendered in place), AI instructions and literals keep the raw text as
/// their value — AI cells stay pending until a response resolves them.
pub fn classify_and_evaluate(input: &str, grid: &Grid) -> (CellKind, Value) {
    match classify(input) {
        CellKind::Formula => {
            let value = match evaluate_formula(&input[1..], grid) {
                Ok(value) => value,
                Err(e) => render_error(&e),
            };
            (CellKind::Formula, value)
        }
        kind => (kind, Value::text(input)),
    }
}

/// Render an evaluation error as the in-cell display string.
pub fn render_error(error: &EvalError) -> Value {
    Value::text(format!("Error: {}", error))
}

/// Evaluate a formula body (without the `=` prefix).
pub fn evaluate_formula(body: &str, grid: &Grid) -> Result<Value, EvalError> {
    let content = body.trim().to_ascii_uppercase();

    if let Some(rest) = content.strip_prefix("SUM(") {
        return aggregate(rest, Aggregate::Sum, grid);
    }
    if let Some(rest) = content.strip_prefix("AVG(") {
        return aggregate(rest, Aggregate::Avg, grid);
    }

    if is_arithmetic(&content) {
        return eval_arithmetic(&content).map(Value::Number);
    }

    Err(EvalError::Unsupported)
}

fn is_arithmetic(content: &str) -> bool {
    !content.is_empty()
        && content
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(c))
}

/// Aggregate over a range argument (the text after `SUM(` / `AVG(`).
///
/// Missing or non-numeric cells count as zero; `AVG` divides by the full
/// range cell count. A range with a corner outside the 26x50 grid is an
/// error rather than a silent truncation.
fn aggregate(rest: &str, op: Aggregate, grid: &Grid) -> Result<Value, EvalError> {
    let inner = rest
        .strip_suffix(')')
        .ok_or_else(|| EvalError::BadRange(rest.to_string()))?;
    let (start, end) = parse_range(inner).ok_or_else(|| EvalError::BadRange(inner.to_string()))?;

    if !start.in_bounds() || !end.in_bounds() {
        return Err(EvalError::OutOfBounds(inner.to_string()));
    }

    let min_row = start.row.min(end.row);
    let max_row = start.row.max(end.row);
    let min_col = start.col.min(end.col);
    let max_col = start.col.max(end.col);

    let mut sum = 0.0;
    let mut count = 0usize;
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            count += 1;
            if let Some(cell) = grid.get(&CellRef::new(col, row)) {
                sum += cell.value.as_number().unwrap_or(0.0);
            }
        }
    }

    match op {
        Aggregate::Sum => Ok(Value::Number(sum)),
        Aggregate::Avg => Ok(Value::Number(sum / count as f64)),
    }
}
