use chrono::Utc;
use gridmind_engine::engine::{
    Cell, CellKind, CellRef, EvalError, detect_cycle, evaluate_formula, render_error,
};
use std::collections::{HashMap, HashSet, VecDeque};

use super::state::{ChangeRecord, Sheet};

impl Sheet {
    /// Set cell contents from raw input.
    ///
    /// Classification happens inside [`Cell::new`]; formulas are evaluated
    /// synchronously against the current store and their transitive
    /// dependents are recomputed. Cells participating in (or reading
    /// through) a dependency cycle display a circular-reference error
    /// instead of recomputing forever. A later edit overwrites an
    /// AI-sourced cell without confirmation.
    pub fn set_cell_from_input(&mut self, cell_ref: CellRef, input: &str) {
        if input.trim().is_empty() {
            self.clear_cell(&cell_ref);
            return;
        }

        let cell = Cell::new(input);
        self.grid.insert(cell_ref.clone(), cell);

        self.rebuild_dependents();
        self.recalculate_from(std::slice::from_ref(&cell_ref));
        self.record_change("user", &format!("edit {}", cell_ref), &[cell_ref]);
    }

    /// Clear the specified cell. Cleared is indistinguishable from never set.
    pub fn clear_cell(&mut self, cell_ref: &CellRef) {
        if self.grid.remove(cell_ref).is_some() {
            self.rebuild_dependents();
            self.recalculate_from(std::slice::from_ref(cell_ref));
            self.record_change("user", &format!("clear {}", cell_ref), &[cell_ref.clone()]);
        }
    }

    /// Display string for a cell; a store miss renders empty.
    pub fn display_value(&self, cell_ref: &CellRef) -> String {
        self.grid
            .get(cell_ref)
            .map(|cell| cell.value.to_string())
            .unwrap_or_default()
    }

    /// Raw input of a cell, empty for a store miss. Used by the formula bar
    /// and when re-editing a cell.
    pub fn raw_value(&self, cell_ref: &CellRef) -> String {
        self.grid
            .get(cell_ref)
            .map(|cell| cell.raw().to_string())
            .unwrap_or_default()
    }

    /// Recompute the cells reachable from `starts` through the reverse
    /// dependency map, in dependency order.
    ///
    /// Cells whose dependency closure contains a cycle are settled first
    /// with a circular-reference error; the remaining subgraph is acyclic
    /// and evaluates via Kahn's algorithm.
    pub(crate) fn recalculate_from(&mut self, starts: &[CellRef]) {
        let affected = self.collect_affected(starts);

        let mut cyclic: HashSet<CellRef> = HashSet::new();
        for cell_ref in &affected {
            if detect_cycle(cell_ref, &self.grid).is_some() {
                cyclic.insert(cell_ref.clone());
            }
        }
        for cell_ref in &cyclic {
            if let Some(mut cell) = self.grid.get_mut(cell_ref)
                && cell.kind() == CellKind::Formula
            {
                cell.value = render_error(&EvalError::Circular);
                cell.meta.last_updated = Some(Utc::now());
            }
        }

        // Formula cells left to evaluate, in dependency order.
        let remaining: HashSet<CellRef> = affected
            .iter()
            .filter(|r| !cyclic.contains(*r))
            .filter(|r| {
                self.grid
                    .get(*r)
                    .is_some_and(|cell| cell.kind() == CellKind::Formula)
            })
            .cloned()
            .collect();

        let mut indegree: HashMap<CellRef, usize> = HashMap::new();
        for cell_ref in &remaining {
            let deps = self
                .grid
                .get(cell_ref)
                .map(|cell| cell.depends_on.clone())
                .unwrap_or_default();
            let count = deps.iter().filter(|d| remaining.contains(*d)).count();
            indegree.insert(cell_ref.clone(), count);
        }

        let mut queue: VecDeque<CellRef> = indegree
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(r, _)| r.clone())
            .collect();

        while let Some(cell_ref) = queue.pop_front() {
            self.evaluate_cell(&cell_ref);

            if let Some(deps) = self.dependents.get(&cell_ref) {
                for dependent in deps.clone() {
                    if let Some(count) = indegree.get_mut(&dependent) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
            indegree.remove(&cell_ref);
        }
    }

    /// Evaluate one formula cell against the current store.
    fn evaluate_cell(&mut self, cell_ref: &CellRef) {
        let body = match self.grid.get(cell_ref) {
            Some(cell) => match cell.formula_body() {
                Some(body) => body.to_string(),
                None => return,
            },
            None => return,
        };

        // Evaluate before taking a mutable guard: aggregation reads the grid.
        let value = match evaluate_formula(&body, &self.grid) {
            Ok(value) => value,
            Err(e) => render_error(&e),
        };

        if let Some(mut cell) = self.grid.get_mut(cell_ref) {
            cell.value = value;
            cell.meta.last_updated = Some(Utc::now());
        }
    }

    /// Starts plus their transitive dependents.
    fn collect_affected(&self, starts: &[CellRef]) -> Vec<CellRef> {
        let mut visited: HashSet<CellRef> = HashSet::new();
        let mut queue: VecDeque<CellRef> = starts.iter().cloned().collect();

        while let Some(cell_ref) = queue.pop_front() {
            if !visited.insert(cell_ref.clone()) {
                continue;
            }
            if let Some(deps) = self.dependents.get(&cell_ref) {
                queue.extend(deps.iter().cloned());
            }
        }

        visited.into_iter().collect()
    }

    /// Append a change record. History is append-only and read by nothing.
    pub(crate) fn record_change(&mut self, author: &str, description: &str, affected: &[CellRef]) {
        let mut diff = HashMap::new();
        for cell_ref in affected {
            if let Some(cell) = self.grid.get(cell_ref) {
                diff.insert(cell_ref.clone(), cell.clone());
            }
        }
        self.history.push(ChangeRecord {
            timestamp: Utc::now(),
            author: author.to_string(),
            description: description.to_string(),
            diff,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::Sheet;
    use gridmind_engine::engine::{CellKind, CellRef};

    fn r(id: &str) -> CellRef {
        CellRef::from_str(id).unwrap()
    }

    #[test]
    fn test_set_literal_and_display() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "hello");
        assert_eq!(sheet.display_value(&r("A1")), "hello");
        assert_eq!(sheet.display_value(&r("B1")), "");
    }

    #[test]
    fn test_formula_evaluates_on_edit() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "=2+2*3");
        assert_eq!(sheet.display_value(&r("A1")), "8");
        assert_eq!(
            sheet.grid.get(&r("A1")).unwrap().kind(),
            CellKind::Formula
        );
    }

    #[test]
    fn test_editing_referenced_cell_recomputes_dependents() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "10");
        sheet.set_cell_from_input(r("A2"), "20");
        sheet.set_cell_from_input(r("B1"), "=SUM(A1:A2)");
        assert_eq!(sheet.display_value(&r("B1")), "30");

        sheet.set_cell_from_input(r("A1"), "15");
        assert_eq!(sheet.display_value(&r("B1")), "35");

        sheet.clear_cell(&r("A2"));
        assert_eq!(sheet.display_value(&r("B1")), "15");
    }

    #[test]
    fn test_recalculation_chains_in_dependency_order() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "1");
        sheet.set_cell_from_input(r("B1"), "=SUM(A1:A1)");
        sheet.set_cell_from_input(r("C1"), "=SUM(B1:B1)");
        assert_eq!(sheet.display_value(&r("C1")), "1");

        sheet.set_cell_from_input(r("A1"), "7");
        assert_eq!(sheet.display_value(&r("B1")), "7");
        assert_eq!(sheet.display_value(&r("C1")), "7");
    }

    #[test]
    fn test_cycle_renders_in_cell_error_and_terminates() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "=SUM(B1:B1)");
        sheet.set_cell_from_input(r("B1"), "=SUM(A1:A1)");

        assert_eq!(
            sheet.display_value(&r("A1")),
            "Error: circular reference"
        );
        assert_eq!(
            sheet.display_value(&r("B1")),
            "Error: circular reference"
        );

        // Breaking the cycle recovers both cells.
        sheet.set_cell_from_input(r("B1"), "5");
        assert_eq!(sheet.display_value(&r("A1")), "5");
    }

    #[test]
    fn test_cell_reading_through_cycle_is_error_too() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "=SUM(B1:B1)");
        sheet.set_cell_from_input(r("B1"), "=SUM(A1:A1)");
        sheet.set_cell_from_input(r("C1"), "=SUM(A1:B1)");

        assert_eq!(
            sheet.display_value(&r("C1")),
            "Error: circular reference"
        );
    }

    #[test]
    fn test_clearing_with_empty_input() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "x");
        sheet.set_cell_from_input(r("A1"), "   ");
        assert!(sheet.grid.get(&r("A1")).is_none());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "1");
        sheet.set_cell_from_input(r("A1"), "2");
        assert_eq!(sheet.history.len(), 2);
        assert!(sheet.history.iter().all(|rec| rec.author == "user"));
        assert!(sheet.history[1].diff.contains_key(&r("A1")));
    }

    #[test]
    fn test_demo_sheet_seeds_and_computes() {
        let sheet = Sheet::with_demo_data();
        assert_eq!(sheet.name, "Global Supply Chain Analysis");
        assert_eq!(sheet.display_value(&r("A1")), "Product Name");
        assert_eq!(sheet.display_value(&r("B2")), "150");
        assert_eq!(sheet.display_value(&r("D2")), "74998.50");
        assert_eq!(sheet.active_cell, Some(r("D2")));
    }
}
