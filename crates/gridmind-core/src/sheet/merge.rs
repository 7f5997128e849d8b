//! AI context snapshots and the merge protocol for asynchronous results.
//!
//! AI requests run off-thread; everything here executes on the event-loop
//! thread that owns sheet mutation. Responses apply in completion order
//! under a per-cell last-writer-wins rule: an update is skipped when the
//! cell was written more recently than the response completed.

use chrono::{DateTime, Utc};
use gridmind_engine::engine::{Cell, CellRef};

use super::state::Sheet;

/// One resolved AI instruction, ready to merge.
#[derive(Clone, Debug)]
pub struct AiResolution {
    /// The model's explanation of what it did.
    pub reasoning: String,
    /// `(cell id, value)` pairs as returned by the service. Ids are
    /// validated here; invalid or out-of-grid ids are skipped.
    pub updates: Vec<(String, String)>,
    /// Follow-up suggestions for the user.
    pub suggestions: Vec<String>,
    /// When the request completed. Drives the last-writer-wins comparison.
    pub completed_at: DateTime<Utc>,
}

impl Sheet {
    /// Serialize the first `cap` cells (store iteration order) as
    /// `id: value` pairs for the AI request context.
    pub fn context_snapshot(&self, cap: usize) -> String {
        self.grid
            .iter()
            .take(cap)
            .map(|entry| format!("{}: {}", entry.key(), entry.value().value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Mark the originating cell of a dispatched instruction as processing.
    pub fn begin_ai(&mut self, target: Option<&CellRef>) {
        if let Some(target) = target
            && let Some(mut cell) = self.grid.get_mut(target)
        {
            cell.meta.processing = true;
            cell.meta.error = None;
        }
    }

    /// Merge a resolved instruction into the store. Returns how many cell
    /// updates were applied.
    ///
    /// Every valid update overwrites (or creates) its cell as AI-sourced,
    /// unless the cell already carries a newer write. The target cell — the
    /// one that triggered the instruction — additionally receives the
    /// reasoning without its value changing, and its processing flag clears.
    pub fn apply_ai_resolution(&mut self, res: &AiResolution, target: Option<&CellRef>) -> usize {
        let mut applied: Vec<CellRef> = Vec::new();

        for (id, value) in &res.updates {
            let Some(cell_ref) = CellRef::from_str(id).filter(CellRef::in_bounds) else {
                log::warn!("skipping AI update for invalid cell id {:?}", id);
                continue;
            };

            let superseded = self.grid.get(&cell_ref).is_some_and(|cell| {
                cell.meta
                    .last_updated
                    .is_some_and(|last| last > res.completed_at)
            });
            if superseded {
                log::debug!("AI update for {} lost to a newer write", cell_ref);
                continue;
            }

            self.grid.insert(
                cell_ref.clone(),
                Cell::ai_update(value, &res.reasoning, res.completed_at),
            );
            applied.push(cell_ref);
        }

        if let Some(target) = target
            && let Some(mut cell) = self.grid.get_mut(target)
        {
            cell.meta.explanation = Some(res.reasoning.clone());
            cell.meta.processing = false;
        }

        if !applied.is_empty() {
            self.rebuild_dependents();
            self.recalculate_from(&applied);
            self.record_change("ai", &res.reasoning, &applied);
        }

        applied.len()
    }

    /// Record a failed AI request: no values change, the originating cell
    /// gets the error and stops showing as processing.
    pub fn fail_ai(&mut self, target: Option<&CellRef>, error: &str) {
        log::warn!("AI request failed: {}", error);
        if let Some(target) = target
            && let Some(mut cell) = self.grid.get_mut(target)
        {
            cell.meta.error = Some(error.to_string());
            cell.meta.processing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AiResolution;
    use super::super::state::Sheet;
    use chrono::{Duration, Utc};
    use gridmind_engine::engine::{CellKind, CellRef};

    fn r(id: &str) -> CellRef {
        CellRef::from_str(id).unwrap()
    }

    fn resolution(reasoning: &str, updates: &[(&str, &str)]) -> AiResolution {
        AiResolution {
            reasoning: reasoning.to_string(),
            updates: updates
                .iter()
                .map(|(id, v)| (id.to_string(), v.to_string()))
                .collect(),
            suggestions: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_updates_and_target_explanation() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("D1"), "?fill B3 with the answer");

        let res = resolution("R", &[("B3", "42")]);
        let applied = sheet.apply_ai_resolution(&res, Some(&r("D1")));
        assert_eq!(applied, 1);

        let b3 = sheet.grid.get(&r("B3")).unwrap();
        assert_eq!(b3.kind(), CellKind::Ai);
        assert_eq!(b3.raw(), "42");
        assert_eq!(b3.value.to_string(), "42");
        assert_eq!(b3.meta.explanation.as_deref(), Some("R"));
        drop(b3);

        // The originating cell keeps its value but gains the reasoning.
        let d1 = sheet.grid.get(&r("D1")).unwrap();
        assert_eq!(d1.raw(), "?fill B3 with the answer");
        assert_eq!(d1.meta.explanation.as_deref(), Some("R"));
        assert!(!d1.meta.processing);
    }

    #[test]
    fn test_invalid_ids_are_skipped() {
        let mut sheet = Sheet::new("s", "test");
        let res = resolution("R", &[("AA1", "1"), ("nope", "2"), ("A99", "3"), ("B2", "4")]);
        let applied = sheet.apply_ai_resolution(&res, None);
        assert_eq!(applied, 1);
        assert_eq!(sheet.display_value(&r("B2")), "4");
    }

    #[test]
    fn test_failed_request_leaves_values_and_clears_processing() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "10");
        sheet.set_cell_from_input(r("D1"), "?do something");
        sheet.begin_ai(Some(&r("D1")));
        assert!(sheet.grid.get(&r("D1")).unwrap().meta.processing);

        sheet.fail_ai(Some(&r("D1")), "network error: timed out");

        assert_eq!(sheet.display_value(&r("A1")), "10");
        assert_eq!(sheet.display_value(&r("D1")), "?do something");
        let d1 = sheet.grid.get(&r("D1")).unwrap();
        assert!(!d1.meta.processing);
        assert_eq!(d1.meta.error.as_deref(), Some("network error: timed out"));
    }

    #[test]
    fn test_out_of_order_completions_keep_latest_write() {
        let mut sheet = Sheet::new("s", "test");
        let now = Utc::now();

        let earlier = AiResolution {
            reasoning: "first request".to_string(),
            updates: vec![("B3".to_string(), "old".to_string())],
            suggestions: Vec::new(),
            completed_at: now - Duration::seconds(5),
        };
        let later = AiResolution {
            reasoning: "second request".to_string(),
            updates: vec![("B3".to_string(), "new".to_string())],
            suggestions: Vec::new(),
            completed_at: now,
        };

        // The later-completing response merges first; the stale one must lose.
        assert_eq!(sheet.apply_ai_resolution(&later, None), 1);
        assert_eq!(sheet.apply_ai_resolution(&earlier, None), 0);

        let b3 = sheet.grid.get(&r("B3")).unwrap();
        assert_eq!(b3.value.to_string(), "new");
        assert_eq!(b3.meta.explanation.as_deref(), Some("second request"));
    }

    #[test]
    fn test_disjoint_updates_both_apply() {
        let mut sheet = Sheet::new("s", "test");
        let now = Utc::now();

        let first = AiResolution {
            reasoning: "a".to_string(),
            updates: vec![("A1".to_string(), "1".to_string())],
            suggestions: Vec::new(),
            completed_at: now - Duration::seconds(1),
        };
        let second = AiResolution {
            reasoning: "b".to_string(),
            updates: vec![("B1".to_string(), "2".to_string())],
            suggestions: Vec::new(),
            completed_at: now,
        };

        sheet.apply_ai_resolution(&second, None);
        sheet.apply_ai_resolution(&first, None);

        assert_eq!(sheet.display_value(&r("A1")), "1");
        assert_eq!(sheet.display_value(&r("B1")), "2");
    }

    #[test]
    fn test_user_edit_is_not_clobbered_by_stale_response() {
        let mut sheet = Sheet::new("s", "test");
        let stale = AiResolution {
            reasoning: "slow request".to_string(),
            updates: vec![("A1".to_string(), "stale".to_string())],
            suggestions: Vec::new(),
            completed_at: Utc::now() - Duration::seconds(30),
        };

        sheet.set_cell_from_input(r("A1"), "fresh");
        assert_eq!(sheet.apply_ai_resolution(&stale, None), 0);
        assert_eq!(sheet.display_value(&r("A1")), "fresh");
    }

    #[test]
    fn test_ai_update_recomputes_dependent_formulas() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("B1"), "=SUM(A1:A2)");
        assert_eq!(sheet.display_value(&r("B1")), "0");

        let res = resolution("filled", &[("A1", "5"), ("A2", "7")]);
        sheet.apply_ai_resolution(&res, None);
        assert_eq!(sheet.display_value(&r("B1")), "12");
    }

    #[test]
    fn test_snapshot_is_capped_and_formatted() {
        let mut sheet = Sheet::new("s", "test");
        sheet.set_cell_from_input(r("A1"), "x");
        sheet.set_cell_from_input(r("B1"), "y");
        sheet.set_cell_from_input(r("C1"), "z");

        let snapshot = sheet.context_snapshot(2);
        assert_eq!(snapshot.matches(": ").count(), 2);
        assert_eq!(snapshot.matches(", ").count(), 1);

        let full = sheet.context_snapshot(50);
        assert!(full.contains("A1: x"));
        assert!(full.contains("B1: y"));
        assert!(full.contains("C1: z"));
    }

    #[test]
    fn test_ai_merge_appends_history() {
        let mut sheet = Sheet::new("s", "test");
        let res = resolution("filled totals", &[("B3", "42")]);
        sheet.apply_ai_resolution(&res, None);

        let last = sheet.history.last().unwrap();
        assert_eq!(last.author, "ai");
        assert_eq!(last.description, "filled totals");
        assert!(last.diff.contains_key(&r("B3")));
    }
}
