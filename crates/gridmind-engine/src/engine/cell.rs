//! Cell data structures for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellKind`] - How a cell's raw input is interpreted
//! - [`Value`] - A computed scalar display value (text or number)
//! - [`CellMeta`] - Optional metadata (AI explanation, error, processing flag)
//! - [`Cell`] - A cell with raw input, computed value, metadata, and dependencies
//! - [`Grid`] - Thread-safe sparse storage for cells (backed by `DashMap`)
//!
//! A cell's kind is derived from its raw input exactly once, at construction.
//! The `raw` and `kind` fields are private so no caller can set one without
//! the other: the only ways to obtain a `Cell` are [`Cell::new`] (classifies
//! user input) and [`Cell::ai_update`] (an AI-produced value).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::cell_ref::CellRef;
use super::deps::extract_dependencies;
use super::format::format_number;

/// How a cell's raw input is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// Plain text or a number typed as-is.
    Literal,
    /// `=`-prefixed input, evaluated by the formula engine.
    Formula,
    /// `?`-prefixed instruction, or a value written by an AI response.
    Ai,
    /// A reference to another cell. Present in the model, produced by nothing yet.
    Reference,
    /// A value sourced from an external API. Present in the model, produced by nothing yet.
    Api,
}

/// Classify raw input by its leading character.
///
/// Pure and idempotent: `=` is a formula, `?` an AI instruction, anything
/// else a literal.
pub fn classify(raw: &str) -> CellKind {
    if raw.starts_with('=') {
        CellKind::Formula
    } else if raw.starts_with('?') {
        CellKind::Ai
    } else {
        CellKind::Literal
    }
}

/// A computed scalar display value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// Numeric view of the value. Text is coerced with `str::parse`;
    /// callers that aggregate treat `None` as zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
        }
    }
}

/// Optional per-cell metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CellMeta {
    /// Where the value came from (e.g. "ai").
    pub source: Option<String>,
    /// AI reasoning attached to this cell.
    pub explanation: Option<String>,
    /// Last failure affecting this cell (e.g. a failed AI request).
    pub error: Option<String>,
    /// An AI request targeting this cell is outstanding.
    pub processing: bool,
    /// When this cell was last written.
    pub last_updated: Option<DateTime<Utc>>,
}

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    raw: String,
    kind: CellKind,
    /// Computed display value.
    pub value: Value,
    pub meta: CellMeta,
    /// Cells this cell's formula reads (empty for non-formulas).
    pub depends_on: Vec<CellRef>,
}

impl Cell {
    /// Build a cell from user input, deriving its kind from the leading
    /// character. Formula dependencies are extracted here; the computed
    /// value starts as the raw text and is replaced when the sheet
    /// evaluates the cell (formulas) or an AI response resolves it.
    pub fn new(input: &str) -> Cell {
        let kind = classify(input);
        let depends_on = match kind {
            CellKind::Formula => extract_dependencies(&input[1..]),
            _ => Vec::new(),
        };
        Cell {
            raw: input.to_string(),
            kind,
            value: Value::text(input),
            meta: CellMeta {
                last_updated: Some(Utc::now()),
                ..CellMeta::default()
            },
            depends_on,
        }
    }

    /// Build a cell from an AI response update: raw and computed value are
    /// the returned text, the reasoning becomes the explanation, and the
    /// timestamp is the response's completion time.
    pub fn ai_update(value: &str, explanation: &str, at: DateTime<Utc>) -> Cell {
        Cell {
            raw: value.to_string(),
            kind: CellKind::Ai,
            value: Value::text(value),
            meta: CellMeta {
                source: Some("ai".to_string()),
                explanation: Some(explanation.to_string()),
                error: None,
                processing: false,
                last_updated: Some(at),
            },
            depends_on: Vec::new(),
        }
    }

    /// The raw input text this cell was built from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// The formula body (input without the `=` prefix), if this is a formula.
    pub fn formula_body(&self) -> Option<&str> {
        match self.kind {
            CellKind::Formula => self.raw.strip_prefix('='),
            _ => None,
        }
    }
}

/// Thread-safe sparse grid storage (DashMap is internally Arc-based, clones are cheap).
pub type Grid = Arc<DashMap<CellRef, Cell>>;
