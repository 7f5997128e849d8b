//! Application state and logic.
//!
//! [`App`] holds the sheet document, cursor and viewport state, editing
//! buffers, and the AI plumbing: a handle to the injected
//! [`InstructionService`] plus the mpsc channel that worker threads send
//! completions through. All sheet mutation happens on the event-loop
//! thread; workers only compute and send.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use chrono::{DateTime, Utc};
use gridmind_ai::{AiError, InstructionOutcome, InstructionService};
use gridmind_core::{AiResolution, Sheet};
use gridmind_engine::engine::{CellKind, CellRef, GRID_COLS, GRID_ROWS, classify};

/// Which top-level view tab is active. Only [`View::Grid`] is interactive;
/// Database and Automation are stubs, Dashboard is a static summary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum View {
    Grid,
    Database,
    Dashboard,
    Automation,
}

impl View {
    pub const ALL: [View; 4] = [View::Grid, View::Database, View::Dashboard, View::Automation];

    pub fn title(self) -> &'static str {
        match self {
            View::Grid => "Grid",
            View::Database => "Database",
            View::Dashboard => "Dashboard",
            View::Automation => "Automation",
        }
    }

    pub fn next(self) -> View {
        match self {
            View::Grid => View::Database,
            View::Database => View::Dashboard,
            View::Dashboard => View::Automation,
            View::Automation => View::Grid,
        }
    }
}

/// Input mode within the Grid view.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Navigate the grid.
    Normal,
    /// Edit the contents of the current cell; commits on Enter.
    Edit,
    /// Type an AI instruction in the sidebar (no target cell).
    AskAi,
}

/// What a finished AI worker thread sends back to the event loop.
pub enum AiCompletion {
    Instruction {
        target: Option<CellRef>,
        outcome: Result<InstructionOutcome, AiError>,
        completed_at: DateTime<Utc>,
    },
    Explanation {
        target: CellRef,
        outcome: Result<String, AiError>,
    },
}

/// Main application state container.
pub struct App {
    /// The sheet document.
    pub sheet: Sheet,
    /// Active view tab.
    pub view: View,
    /// Current input mode (Grid view).
    pub mode: Mode,
    /// Cursor position (column).
    pub cursor_col: usize,
    /// Cursor position (row).
    pub cursor_row: usize,
    /// Viewport offset (column).
    pub viewport_col: usize,
    /// Viewport offset (row).
    pub viewport_row: usize,
    /// Number of visible columns (set during drawing).
    pub visible_cols: usize,
    /// Number of visible rows (set during drawing).
    pub visible_rows: usize,
    /// Edit buffer for cell editing.
    pub edit_buffer: String,
    /// Buffer for the sidebar ask-AI input.
    pub ask_buffer: String,
    /// Status message to display.
    pub status_message: String,
    /// Latest AI follow-up suggestions.
    pub suggestions: Vec<String>,
    /// Whether the sidebar is shown.
    pub sidebar_visible: bool,
    /// Outstanding AI requests.
    pub in_flight: usize,
    /// Quit flag checked by the event loop.
    pub should_quit: bool,

    service: Option<Arc<dyn InstructionService>>,
    context_cap: usize,
    completions_tx: Sender<AiCompletion>,
    completions_rx: Receiver<AiCompletion>,
}

impl App {
    pub fn new(
        sheet: Sheet,
        service: Option<Arc<dyn InstructionService>>,
        context_cap: usize,
    ) -> App {
        let (completions_tx, completions_rx) = channel();
        let (cursor_col, cursor_row) = sheet
            .active_cell
            .as_ref()
            .map(|r| (r.col, r.row))
            .unwrap_or((0, 0));

        let status_message = if service.is_some() {
            String::from("Ready")
        } else {
            String::from("AI disabled: set GRIDMIND_API_KEY to enable ? cells")
        };

        App {
            sheet,
            view: View::Grid,
            mode: Mode::Normal,
            cursor_col,
            cursor_row,
            viewport_col: 0,
            viewport_row: 0,
            visible_cols: 8,
            visible_rows: 20,
            edit_buffer: String::new(),
            ask_buffer: String::new(),
            status_message,
            suggestions: Vec::new(),
            sidebar_visible: true,
            in_flight: 0,
            should_quit: false,
            service,
            context_cap,
            completions_tx,
            completions_rx,
        }
    }

    /// The cell the cursor is on.
    pub fn cursor_ref(&self) -> CellRef {
        CellRef::new(self.cursor_col, self.cursor_row)
    }

    pub fn move_cursor(&mut self, d_col: isize, d_row: isize) {
        let col = self.cursor_col.saturating_add_signed(d_col);
        let row = self.cursor_row.saturating_add_signed(d_row);
        self.cursor_col = col.min(GRID_COLS - 1);
        self.cursor_row = row.min(GRID_ROWS - 1);

        let active = self.cursor_ref();
        self.sheet.active_cell = Some(active.clone());
        self.sheet.selection = vec![active];
        self.update_viewport();
    }

    /// Keep the cursor inside the visible window.
    pub fn update_viewport(&mut self) {
        if self.cursor_col < self.viewport_col {
            self.viewport_col = self.cursor_col;
        } else if self.cursor_col >= self.viewport_col + self.visible_cols {
            self.viewport_col = self.cursor_col + 1 - self.visible_cols;
        }
        if self.cursor_row < self.viewport_row {
            self.viewport_row = self.cursor_row;
        } else if self.cursor_row >= self.viewport_row + self.visible_rows {
            self.viewport_row = self.cursor_row + 1 - self.visible_rows;
        }
    }

    /// Enter edit mode, pre-filling the buffer with the cell's raw input.
    pub fn begin_edit(&mut self) {
        self.edit_buffer = self.sheet.raw_value(&self.cursor_ref());
        self.mode = Mode::Edit;
    }

    /// Enter edit mode with an empty buffer (typing replaces the cell).
    pub fn begin_replace(&mut self) {
        self.edit_buffer.clear();
        self.mode = Mode::Edit;
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer.clear();
        self.mode = Mode::Normal;
    }

    /// Commit the edit buffer into the current cell. An `?` instruction
    /// additionally dispatches an AI request targeting this cell.
    pub fn commit_edit(&mut self) {
        let input = std::mem::take(&mut self.edit_buffer);
        let cell_ref = self.cursor_ref();
        self.sheet.set_cell_from_input(cell_ref.clone(), &input);
        self.mode = Mode::Normal;
        self.status_message = format!("{} updated", cell_ref);

        if classify(&input) == CellKind::Ai {
            let instruction = input[1..].to_string();
            self.dispatch_instruction(instruction, Some(cell_ref));
        }
    }

    pub fn clear_current_cell(&mut self) {
        let cell_ref = self.cursor_ref();
        self.sheet.clear_cell(&cell_ref);
        self.status_message = format!("{} cleared", cell_ref);
    }

    /// Commit the sidebar ask-AI buffer as an untargeted instruction.
    pub fn commit_ask(&mut self) {
        let instruction = std::mem::take(&mut self.ask_buffer);
        self.mode = Mode::Normal;
        self.dispatch_instruction(instruction, None);
    }

    /// Fire an instruction at the AI service on a worker thread. The
    /// completion lands in the channel and is merged by the event loop; a
    /// request in flight does not block further edits or instructions.
    pub fn dispatch_instruction(&mut self, instruction: String, target: Option<CellRef>) {
        let instruction = instruction.trim().to_string();
        if instruction.is_empty() {
            self.status_message = String::from("Empty AI instruction");
            return;
        }

        let Some(service) = self.service.clone() else {
            let err = AiError::NotConfigured(String::from("set GRIDMIND_API_KEY"));
            self.sheet.fail_ai(target.as_ref(), &err.to_string());
            self.status_message = err.to_string();
            return;
        };

        self.sheet.begin_ai(target.as_ref());
        let snapshot = self.sheet.context_snapshot(self.context_cap);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        self.status_message = String::from("AI request dispatched");

        std::thread::spawn(move || {
            let outcome = service.process(&instruction, &snapshot);
            let _ = tx.send(AiCompletion::Instruction {
                target,
                outcome,
                completed_at: Utc::now(),
            });
        });
    }

    /// Ask the service to explain the current cell's contents; the prose
    /// lands in the cell's metadata and the sidebar.
    pub fn explain_current_cell(&mut self) {
        let cell_ref = self.cursor_ref();
        let raw = self.sheet.raw_value(&cell_ref);
        if raw.is_empty() {
            self.status_message = format!("{} is empty, nothing to explain", cell_ref);
            return;
        }

        let Some(service) = self.service.clone() else {
            self.status_message =
                AiError::NotConfigured(String::from("set GRIDMIND_API_KEY")).to_string();
            return;
        };

        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        self.status_message = format!("Explaining {}...", cell_ref);

        std::thread::spawn(move || {
            let outcome = service.explain(&raw);
            let _ = tx.send(AiCompletion::Explanation {
                target: cell_ref,
                outcome,
            });
        });
    }

    /// Apply every completion waiting in the channel, in arrival
    /// (completion) order.
    pub fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            match completion {
                AiCompletion::Instruction {
                    target,
                    outcome,
                    completed_at,
                } => match outcome {
                    Ok(outcome) => {
                        let resolution = AiResolution {
                            reasoning: outcome.reasoning,
                            updates: outcome
                                .cell_updates
                                .into_iter()
                                .map(|u| (u.id, u.value))
                                .collect(),
                            suggestions: outcome.suggestions,
                            completed_at,
                        };
                        let applied = self.sheet.apply_ai_resolution(&resolution, target.as_ref());
                        self.suggestions = resolution.suggestions;
                        self.status_message = format!("AI applied {} cell update(s)", applied);
                    }
                    Err(e) => {
                        self.sheet.fail_ai(target.as_ref(), &e.to_string());
                        self.status_message = format!("AI request failed: {}", e);
                    }
                },
                AiCompletion::Explanation { target, outcome } => match outcome {
                    Ok(text) => {
                        if let Some(mut cell) = self.sheet.grid.get_mut(&target) {
                            cell.meta.explanation = Some(text);
                        }
                        self.status_message = format!("Explanation ready for {}", target);
                    }
                    Err(e) => {
                        self.status_message = format!("Explain failed: {}", e);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted fake service: pops one queued response per call.
    struct FakeService {
        responses: Mutex<Vec<Result<InstructionOutcome, AiError>>>,
    }

    impl FakeService {
        fn with_responses(responses: Vec<Result<InstructionOutcome, AiError>>) -> Arc<Self> {
            Arc::new(FakeService {
                responses: Mutex::new(responses),
            })
        }
    }

    impl InstructionService for FakeService {
        fn process(&self, _: &str, _: &str) -> Result<InstructionOutcome, AiError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AiError::Network(String::from("no scripted response"))))
        }

        fn explain(&self, formula: &str) -> Result<String, AiError> {
            Ok(format!("it computes {}", formula))
        }
    }

    fn r(id: &str) -> CellRef {
        CellRef::from_str(id).unwrap()
    }

    fn wait_for_completions(app: &mut App) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while app.in_flight > 0 {
            app.drain_completions();
            assert!(
                std::time::Instant::now() < deadline,
                "AI completion never arrived"
            );
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn test_ai_instruction_round_trip_through_event_loop() {
        let service = FakeService::with_responses(vec![Ok(InstructionOutcome {
            reasoning: String::from("R"),
            cell_updates: vec![gridmind_ai::CellUpdate {
                id: String::from("B3"),
                value: String::from("42"),
            }],
            suggestions: vec![String::from("chart it")],
        })]);
        let mut app = App::new(Sheet::new("s", "test"), Some(service), 50);

        app.cursor_col = 3;
        app.cursor_row = 1;
        app.edit_buffer = String::from("?fill in the answer");
        app.commit_edit();
        assert_eq!(app.in_flight, 1);

        wait_for_completions(&mut app);

        assert_eq!(app.sheet.display_value(&r("B3")), "42");
        let d2 = app.sheet.grid.get(&r("D2")).unwrap();
        assert_eq!(d2.meta.explanation.as_deref(), Some("R"));
        assert_eq!(d2.raw(), "?fill in the answer");
        assert!(!d2.meta.processing);
        drop(d2);
        assert_eq!(app.suggestions, vec![String::from("chart it")]);
    }

    #[test]
    fn test_failed_request_surfaces_error_on_target() {
        let service = FakeService::with_responses(vec![Err(AiError::Http(
            502,
            String::from("bad gateway"),
        ))]);
        let mut app = App::new(Sheet::new("s", "test"), Some(service), 50);

        app.sheet.set_cell_from_input(r("A1"), "10");
        app.cursor_col = 3; // edit D1, leave A1 alone
        app.edit_buffer = String::from("?do a thing");
        app.commit_edit();
        wait_for_completions(&mut app);

        assert_eq!(app.sheet.display_value(&r("A1")), "10");
        let origin = app.sheet.grid.get(&app.cursor_ref()).unwrap();
        assert!(origin.meta.error.as_deref().unwrap().contains("502"));
        assert!(!origin.meta.processing);
        drop(origin);
        assert!(app.status_message.contains("failed"));
    }

    #[test]
    fn test_missing_service_fails_immediately() {
        let mut app = App::new(Sheet::new("s", "test"), None, 50);
        app.edit_buffer = String::from("?anything");
        app.commit_edit();

        assert_eq!(app.in_flight, 0);
        let origin = app.sheet.grid.get(&app.cursor_ref()).unwrap();
        assert!(origin.meta.error.is_some());
    }

    #[test]
    fn test_cursor_stays_inside_grid() {
        let mut app = App::new(Sheet::new("s", "test"), None, 50);
        app.move_cursor(-3, -3);
        assert_eq!((app.cursor_col, app.cursor_row), (0, 0));

        app.move_cursor(1000, 1000);
        assert_eq!((app.cursor_col, app.cursor_row), (GRID_COLS - 1, GRID_ROWS - 1));
        assert_eq!(app.sheet.active_cell, Some(app.cursor_ref()));
    }

    #[test]
    fn test_edit_commit_and_cancel() {
        let mut app = App::new(Sheet::new("s", "test"), None, 50);
        app.begin_edit();
        app.edit_buffer = String::from("=2+2*3");
        app.commit_edit();
        assert_eq!(app.sheet.display_value(&r("A1")), "8");
        assert!(app.mode == Mode::Normal);

        app.begin_edit();
        assert_eq!(app.edit_buffer, "=2+2*3");
        app.cancel_edit();
        assert_eq!(app.sheet.display_value(&r("A1")), "8");
    }
}
