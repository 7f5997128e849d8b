//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "D2") and zero-indexed column/row coordinates. Only
//! single-letter columns exist in this address space: the grid is bounded at
//! 26 columns by 50 rows, and multi-letter references ("AA1") are rejected.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Number of addressable columns (A-Z).
pub const GRID_COLS: usize = 26;

/// Number of addressable rows (1-based rows 1..=50).
pub const GRID_ROWS: usize = 50;

/// A reference to a cell by column and row indices (0-indexed).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "D2").
    /// Returns None if the input is invalid or uses a multi-letter column.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let letter = caps["letter"].bytes().next()?;
        let col = (letter.to_ascii_uppercase() - b'A') as usize;
        let row = caps["number"].parse::<usize>().ok()?.checked_sub(1)?;
        Some(CellRef::new(col, row))
    }

    /// Whether this reference falls inside the fixed 26x50 grid.
    pub fn in_bounds(&self) -> bool {
        self.col < GRID_COLS && self.row < GRID_ROWS
    }

    /// Convert a column index to its letter (0 -> A, 25 -> Z).
    /// Indices beyond Z have no representation in this address space.
    pub fn col_to_letter(col: usize) -> Option<char> {
        if col < GRID_COLS {
            Some((b'A' + col as u8) as char)
        } else {
            None
        }
    }
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| {
        Regex::new(r"^(?<letter>[A-Za-z])(?<number>[0-9]+)$")
            .expect("cell reference regex must compile")
    })
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match CellRef::col_to_letter(self.col) {
            Some(letter) => write!(f, "{}{}", letter, self.row + 1),
            None => write!(f, "#{}:{}", self.col, self.row + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CellRef;

    #[test]
    fn test_parse_rejects_multi_letter_columns() {
        assert!(CellRef::from_str("AA1").is_none());
        assert!(CellRef::from_str("AB10").is_none());
    }

    #[test]
    fn test_parse_rejects_row_zero() {
        assert!(CellRef::from_str("A0").is_none());
    }

    #[test]
    fn test_col_to_letter_bounds() {
        assert_eq!(CellRef::col_to_letter(0), Some('A'));
        assert_eq!(CellRef::col_to_letter(25), Some('Z'));
        assert_eq!(CellRef::col_to_letter(26), None);
    }
}
