//! Dependency extraction from formula bodies.
//!
//! In this formula grammar cell references only appear inside the range
//! argument of an aggregate call (`SUM(A1:B5)`, `AVG(C1:C10)`); bare
//! arithmetic carries no references. The extracted set feeds the reverse
//! dependency map for recalculation and cycle detection.

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::{CellRef, GRID_COLS, GRID_ROWS};

/// Upper bound on cells a single range may contribute as dependencies.
/// The grid itself is only 26x50, so anything larger is a malformed range.
const MAX_DEPENDENCY_RANGE_CELLS: usize = GRID_COLS * GRID_ROWS;

/// Extract all cell references a formula body depends on.
pub fn extract_dependencies(body: &str) -> Vec<CellRef> {
    let mut deps = Vec::new();

    for caps in range_fn_re().captures_iter(body) {
        if let (Some(start), Some(end)) = (CellRef::from_str(&caps[1]), CellRef::from_str(&caps[2]))
        {
            let min_row = start.row.min(end.row);
            let max_row = start.row.max(end.row);
            let min_col = start.col.min(end.col);
            let max_col = start.col.max(end.col);

            let cell_count = (max_row - min_row + 1) * (max_col - min_col + 1);
            if cell_count > MAX_DEPENDENCY_RANGE_CELLS {
                continue;
            }

            for row in min_row..=max_row {
                for col in min_col..=max_col {
                    deps.push(CellRef::new(col, row));
                }
            }
        }
    }

    deps
}

/// Parse a cell range like "A1:B5" into its two corner references.
pub fn parse_range(range: &str) -> Option<(CellRef, CellRef)> {
    let (start, end) = range.split_once(':')?;
    Some((CellRef::from_str(start)?, CellRef::from_str(end)?))
}

fn range_fn_re() -> &'static Regex {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    RANGE_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:SUM|AVG)\(([A-Za-z][0-9]+):([A-Za-z][0-9]+)\)")
            .expect("range function regex must compile")
    })
}
