use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use std::io;
use std::time::Duration;

use super::app::{App, Mode, View};
use super::ui;

/// How long to wait for a terminal event before checking the AI completion
/// channel again. Short enough that merged results feel immediate.
const TICK: Duration = Duration::from_millis(50);

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain_completions();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) => {
                    // Only process key press events (Windows reports Press + Release)
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    handle_key(app, key.code, key.modifiers);
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.mode {
        Mode::Edit => handle_edit_key(app, code),
        Mode::AskAi => handle_ask_key(app, code),
        Mode::Normal => handle_normal_key(app, code),
    }
}

fn handle_normal_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Tab => {
            app.view = app.view.next();
            return;
        }
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        _ => {}
    }

    match app.view {
        View::Grid => handle_grid_key(app, code),
        View::Dashboard => {
            if code == KeyCode::Char('g') {
                app.dispatch_instruction(
                    String::from("Generate a sales breakdown based on current data"),
                    None,
                );
            }
        }
        View::Database | View::Automation => {}
    }
}

fn handle_grid_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(-1, 0),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(1, 0),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(0, -1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(0, 1),
        KeyCode::Home => app.move_cursor(-(app.cursor_col as isize), -(app.cursor_row as isize)),
        KeyCode::Enter | KeyCode::Char('i') => app.begin_edit(),
        KeyCode::Char('c') => app.begin_replace(),
        KeyCode::Delete | KeyCode::Char('x') => app.clear_current_cell(),
        KeyCode::Char('a') => app.mode = Mode::AskAi,
        KeyCode::Char('e') => app.explain_current_cell(),
        KeyCode::Char('s') => app.sidebar_visible = !app.sidebar_visible,
        _ => {}
    }
}

fn handle_edit_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Backspace => {
            app.edit_buffer.pop();
        }
        KeyCode::Char(c) => app.edit_buffer.push(c),
        _ => {}
    }
}

fn handle_ask_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.ask_buffer.clear();
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => app.commit_ask(),
        KeyCode::Backspace => {
            app.ask_buffer.pop();
        }
        KeyCode::Char(c) => app.ask_buffer.push(c),
        _ => {}
    }
}
