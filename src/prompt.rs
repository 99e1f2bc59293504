//! Masked single-line prompt for entering the API key.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Result of the prompt.
pub enum PromptResult {
    /// User entered a new key.
    Entered(String),
    /// User kept the current key (empty Enter, Escape or Ctrl+C).
    Kept,
}

/// Runs `restore` when dropped, on every exit path.
struct TerminalGuard {
    restore: fn(),
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// Leave raw mode and the alternate screen, ignoring failures.
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Ask for an API key, showing `current_masked` in the title if set.
pub fn prompt_api_key(current_masked: Option<&str>) -> Result<PromptResult> {
    enable_raw_mode()?;
    let _guard = TerminalGuard {
        restore: restore_terminal,
    };
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let title = match current_masked {
        Some(masked) => format!(" Perplexity API key (current: {}, Enter to keep) ", masked),
        None => " Perplexity API key ".to_string(),
    };
    run_input_loop(&mut terminal, &title)
}

fn run_input_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, title: &str) -> Result<PromptResult> {
    let mut input = Input::default();

    loop {
        terminal.draw(|frame| draw_ui(frame, &input, title))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Enter => {
                    let value = input.value().to_string();
                    if value.is_empty() {
                        return Ok(PromptResult::Kept);
                    }
                    return Ok(PromptResult::Entered(value));
                }
                KeyCode::Esc => return Ok(PromptResult::Kept),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(PromptResult::Kept);
                }
                _ => {
                    input.handle_event(&Event::Key(key));
                }
            }
        }
    }
}

fn draw_ui(frame: &mut Frame, input: &Input, title: &str) {
    let size = frame.area();

    let popup_width = size.width.saturating_sub(4).min(80);
    let popup_area = centered_rect(popup_width, 3, size);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(title.to_string())
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner_area = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let input_width = inner_area.width as usize;
    let cursor_pos = input.visual_cursor();
    let scroll = visible_scroll(cursor_pos, input_width);

    // Never echo the key itself.
    let visible = masked_echo(input.value(), scroll, input_width);

    frame.render_widget(
        Paragraph::new(Line::from(vec![Span::styled(
            visible,
            Style::default().fg(Color::White),
        )])),
        inner_area,
    );

    let cursor_x = inner_area.x + (cursor_pos - scroll) as u16;
    frame.set_cursor_position((cursor_x, inner_area.y));
}

/// Columns scrolled off the left so the cursor stays visible.
fn visible_scroll(cursor_pos: usize, width: usize) -> usize {
    if width > 0 && cursor_pos >= width {
        cursor_pos - width + 1
    } else {
        0
    }
}

fn masked_echo(value: &str, scroll: usize, width: usize) -> String {
    "*".repeat(value.chars().count().saturating_sub(scroll).min(width))
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
