//! Spreadsheet engine API.
//!
//! This module provides the core computation model for the spreadsheet:
//!
//! - [`Cell`], [`CellKind`], [`Value`], [`Grid`] - Data structures for cell storage
//! - [`CellRef`] - Cell reference parsing (A1 notation, single-letter columns)
//! - [`classify`] - Leading-character classification of raw input
//! - [`classify_and_evaluate`] / [`evaluate_formula`] - Formula evaluation
//! - [`extract_dependencies`] - Range dependencies of a formula
//! - [`detect_cycle`] - Circular dependency detection
//! - [`format_number`] - Number formatting for display

mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod eval;
mod format;
mod parse;

pub use cell::{Cell, CellKind, CellMeta, Grid, Value, classify};
pub use cell_ref::{CellRef, GRID_COLS, GRID_ROWS};
pub use cycle::detect_cycle;
pub use deps::{extract_dependencies, parse_range};
pub use eval::{EvalError, classify_and_evaluate, evaluate_formula, render_error};
pub use format::format_number;
pub use parse::eval_arithmetic;
