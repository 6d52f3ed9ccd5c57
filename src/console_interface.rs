use crate::core::Direction;
use crate::models::GameRenderState;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};
use std::io;
use std::time::Duration;

pub type ConsoleTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub fn setup_terminal() -> Result<ConsoleTerminal, Box<dyn std::error::Error>> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn cleanup_terminal() -> Result<(), Box<dyn std::error::Error>> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn render_game(
    terminal: &mut ConsoleTerminal,
    state: &GameRenderState,
    controls: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        // Game area
        let game_paragraph = Paragraph::new(state.map.as_str())
            .block(Block::default().borders(Borders::ALL).title(state.title.as_str()))
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center);
        f.render_widget(game_paragraph, chunks[0]);

        // Instructions
        let mut instructions = if state.won {
            "Level solved!".to_string()
        } else {
            controls.to_string()
        };

        if let Some(status) = &state.status {
            instructions = format!("{} | {}", instructions, status);
        }
        if let Some(err) = &state.error {
            instructions = format!("{} | Error: {}", instructions, err);
        }
        if let Some(change_type) = &state.last_change {
            instructions = format!("{} | Last: {:?}", instructions, change_type);
        }

        let instruction_paragraph = Paragraph::new(instructions)
            .block(Block::default().borders(Borders::ALL).title("Instructions"))
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center);
        f.render_widget(instruction_paragraph, chunks[1]);
    })?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    Move(Direction),
    Reset,
    SpeedUp,
    SlowDown,
    TogglePause,
    ToggleMenu,
    Quit,
    Timeout,
    Unknown,
}

pub fn handle_input(wait: Duration) -> io::Result<ConsoleInput> {
    if event::poll(wait)? {
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            return Ok(key_to_input(code));
        }
    }
    Ok(ConsoleInput::Timeout)
}

/// Polls the keyboard on the blocking pool so the async runtime keeps running meanwhile.
pub async fn next_input(wait: Duration) -> io::Result<ConsoleInput> {
    read_off_runtime(move || handle_input(wait)).await
}

async fn read_off_runtime<F>(read: F) -> io::Result<ConsoleInput>
where
    F: FnOnce() -> io::Result<ConsoleInput> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(io::Error::other)?
}

fn key_to_input(code: KeyCode) -> ConsoleInput {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => ConsoleInput::Quit,
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => ConsoleInput::Move(Direction::Up),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => {
            ConsoleInput::Move(Direction::Down)
        }
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => {
            ConsoleInput::Move(Direction::Left)
        }
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => {
            ConsoleInput::Move(Direction::Right)
        }
        KeyCode::Char('r') | KeyCode::Char('R') => ConsoleInput::Reset,
        KeyCode::Char('+') | KeyCode::Char('=') => ConsoleInput::SpeedUp,
        KeyCode::Char('-') => ConsoleInput::SlowDown,
        KeyCode::Char(' ') => ConsoleInput::TogglePause,
        KeyCode::Char('m') | KeyCode::Char('M') => ConsoleInput::ToggleMenu,
        _ => ConsoleInput::Unknown,
    }
}
