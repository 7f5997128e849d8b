//! UI rendering

use gridmind_engine::engine::{CellKind, CellRef, GRID_COLS, GRID_ROWS};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
};

use super::app::{App, Mode, View};

pub(crate) const HEADER_HEIGHT: u16 = 1;
pub(crate) const FORMULA_BAR_HEIGHT: u16 = 3;
pub(crate) const GRID_MIN_HEIGHT: u16 = 10;
pub(crate) const STATUS_BAR_HEIGHT: u16 = 1;
pub(crate) const ROW_HEADER_WIDTH: u16 = 4;
pub(crate) const CELL_WIDTH: u16 = 12;
pub(crate) const SIDEBAR_WIDTH: u16 = 34;

pub(crate) fn split_main_chunks(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(FORMULA_BAR_HEIGHT),
            Constraint::Min(GRID_MIN_HEIGHT),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let [header_area, formula_area, main_area, status_area] = split_main_chunks(f.area());

    draw_header(f, app, header_area);
    draw_formula_bar(f, app, formula_area);

    let (content_area, sidebar_area) = if app.sidebar_visible && main_area.width > SIDEBAR_WIDTH + 20
    {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
            .split(main_area);
        (chunks[0], Some(chunks[1]))
    } else {
        (main_area, None)
    };

    match app.view {
        View::Grid => draw_grid(f, app, content_area),
        View::Dashboard => draw_dashboard(f, app, content_area),
        View::Database => draw_stub(
            f,
            content_area,
            "Database",
            "We're polishing the relational schema engine to ensure zero-latency execution.",
        ),
        View::Automation => draw_stub(
            f,
            content_area,
            "Automation",
            "We're polishing the event-driven trigger system to ensure zero-latency execution.",
        ),
    }

    if let Some(sidebar_area) = sidebar_area {
        draw_sidebar(f, app, sidebar_area);
    }

    draw_status_bar(f, app, status_area);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let selected = View::ALL
        .iter()
        .position(|v| *v == app.view)
        .unwrap_or_default();
    let tabs = Tabs::new(View::ALL.iter().map(|v| v.title()))
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider(Span::raw("|"));
    f.render_widget(tabs, area);
}

fn draw_formula_bar(f: &mut Frame, app: &App, area: Rect) {
    let cell_ref = app.cursor_ref();
    let content = match app.mode {
        Mode::Edit => Line::from(vec![
            Span::styled(
                format!(" {} ", cell_ref),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("| "),
            Span::raw(app.edit_buffer.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        _ => Line::from(vec![
            Span::styled(
                format!(" {} ", cell_ref),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("| "),
            Span::raw(app.sheet.raw_value(&cell_ref)),
        ]),
    };

    let title = if app.mode == Mode::Edit {
        "Editing (Enter commits, Esc cancels)"
    } else {
        "Enter value, =formula, or ?AI command"
    };
    let paragraph = Paragraph::new(content).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn draw_grid(f: &mut Frame, app: &mut App, area: Rect) {
    // Inner size minus borders and the header row.
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(3);
    app.visible_cols = ((inner_width.saturating_sub(ROW_HEADER_WIDTH)) / (CELL_WIDTH + 1))
        .max(1) as usize;
    app.visible_rows = inner_height.max(1) as usize;
    app.update_viewport();

    let col_end = (app.viewport_col + app.visible_cols).min(GRID_COLS);
    let row_end = (app.viewport_row + app.visible_rows).min(GRID_ROWS);

    let mut header_cells = vec![Cell::from("")];
    for col in app.viewport_col..col_end {
        let letter = CellRef::col_to_letter(col).unwrap_or('?');
        header_cells.push(
            Cell::from(letter.to_string())
                .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)),
        );
    }
    let header = Row::new(header_cells);

    let mut rows = Vec::with_capacity(row_end - app.viewport_row);
    for row in app.viewport_row..row_end {
        let mut cells = vec![
            Cell::from(format!("{}", row + 1))
                .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)),
        ];
        for col in app.viewport_col..col_end {
            let cell_ref = CellRef::new(col, row);
            cells.push(render_cell(app, &cell_ref));
        }
        rows.push(Row::new(cells));
    }

    let mut widths = vec![Constraint::Length(ROW_HEADER_WIDTH)];
    widths.extend((app.viewport_col..col_end).map(|_| Constraint::Length(CELL_WIDTH)));

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title(app.sheet.name.clone()));
    f.render_widget(table, area);
}

/// Render one data cell: a store miss is empty, AI cells are tinted,
/// errors and in-flight processing are visible in place.
fn render_cell<'a>(app: &App, cell_ref: &CellRef) -> Cell<'a> {
    let is_cursor = *cell_ref == app.cursor_ref();

    let (mut text, mut style) = match app.sheet.grid.get(cell_ref) {
        Some(cell) => {
            let mut style = match cell.kind() {
                CellKind::Ai => Style::default().fg(Color::Magenta),
                CellKind::Formula => Style::default().fg(Color::Green),
                _ => Style::default(),
            };
            let display = cell.value.to_string();
            if display.starts_with("Error:") || cell.meta.error.is_some() {
                style = Style::default().fg(Color::Red);
            }
            let text = if cell.meta.processing {
                format!("{}...", display)
            } else {
                display
            };
            (text, style)
        }
        None => (String::new(), Style::default()),
    };

    if text.chars().count() > CELL_WIDTH as usize {
        text = text.chars().take(CELL_WIDTH as usize).collect();
    }
    if is_cursor {
        style = style.add_modifier(Modifier::REVERSED);
        if text.is_empty() {
            text = " ".repeat(CELL_WIDTH as usize);
        }
    }

    Cell::from(text).style(style)
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let cell_ref = app.cursor_ref();
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("Cell {}", cell_ref),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    match app.sheet.grid.get(&cell_ref) {
        Some(cell) => {
            lines.push(Line::from(format!("kind:  {:?}", cell.kind())));
            lines.push(Line::from(format!("raw:   {}", cell.raw())));
            lines.push(Line::from(format!("value: {}", cell.value)));
            if cell.meta.processing {
                lines.push(Line::from(Span::styled(
                    "processing...",
                    Style::default().fg(Color::Yellow),
                )));
            }
            if let Some(explanation) = &cell.meta.explanation {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "Explanation",
                    Style::default().add_modifier(Modifier::UNDERLINED),
                )));
                lines.push(Line::from(explanation.clone()));
            }
            if let Some(error) = &cell.meta.error {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    format!("Error: {}", error),
                    Style::default().fg(Color::Red),
                )));
            }
        }
        None => lines.push(Line::from("(empty)")),
    }

    if !app.suggestions.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Suggestions",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));
        for suggestion in &app.suggestions {
            lines.push(Line::from(format!("- {}", suggestion)));
        }
    }

    lines.push(Line::default());
    if app.mode == Mode::AskAi {
        lines.push(Line::from(Span::styled(
            "Ask AI (Enter sends, Esc cancels):",
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(format!("? {}_", app.ask_buffer)));
    } else {
        lines.push(Line::from(Span::styled(
            "[a]sk AI  [e]xplain  [s]idebar",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            "[i]edit  [x]clear  [Tab]view  [q]uit",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Inspector"));
    f.render_widget(paragraph, area);
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Project Dashboard",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(format!("Populated cells:   {}", app.sheet.populated_count())),
        Line::from(format!("History entries:   {}", app.sheet.history.len())),
        Line::from(format!("AI requests open:  {}", app.in_flight)),
        Line::default(),
        Line::from("Charts are suggested from your grid data once generated."),
        Line::default(),
        Line::from(Span::styled(
            "[g] Generate with AI",
            Style::default().fg(Color::Yellow),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Dashboard"));
    f.render_widget(paragraph, area);
}

fn draw_stub(f: &mut Frame, area: Rect, name: &str, detail: &str) {
    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "Module coming soon in v1.1",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(detail.to_string()),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(name.to_string()));
    f.render_widget(paragraph, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let ai_state = if app.in_flight > 0 {
        format!("AI processing ({})", app.in_flight)
    } else {
        String::from("Ready")
    };

    let left = format!(" {} | {}", ai_state, app.status_message);
    let right = format!(
        "{} | {} cells calculated ",
        app.sheet.name,
        app.sheet.populated_count()
    );

    let pad = (area.width as usize)
        .saturating_sub(left.chars().count())
        .saturating_sub(right.chars().count());
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::raw(right),
    ]);

    let paragraph =
        Paragraph::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(paragraph, area);
}
