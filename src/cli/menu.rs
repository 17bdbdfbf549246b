use std::io::{self, IsTerminal, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    style::{Attribute, Print, SetAttribute},
    terminal::{self, ClearType},
    ExecutableCommand, QueueableCommand,
};

use crate::core::controller::AggregateSnapshot;
use crate::core::credits::{effective_total, remaining_resets};
use crate::core::formatter::{format_currency, format_remaining};

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Refresh,
    OpenManagePage,
    Reset { id: i64, name: String },
}

#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub label: String,
    pub hint: String,
    pub action: MenuAction,
}

/// Fixed actions first, then one reset entry per active subscription.
pub fn build_entries(snapshot: Option<&AggregateSnapshot>, manage_url: &str) -> Vec<MenuEntry> {
    let mut entries = vec![
        MenuEntry {
            label: "Refresh balance".to_string(),
            hint: snapshot
                .map(|s| format_remaining(s.total))
                .unwrap_or_else(|| "not loaded".to_string()),
            action: MenuAction::Refresh,
        },
        MenuEntry {
            label: "Open subscription management page".to_string(),
            hint: manage_url.to_string(),
            action: MenuAction::OpenManagePage,
        },
    ];

    if let Some(snapshot) = snapshot {
        entries.extend(snapshot.subscriptions.iter().map(|sub| MenuEntry {
            label: format!("Reset {} (#{})", sub.plan_name(), sub.id),
            hint: format!(
                "{} now, {} total, {} resets left",
                format_currency(sub.current_credits),
                format_currency(effective_total(sub)),
                remaining_resets(sub)
            ),
            action: MenuAction::Reset {
                id: sub.id,
                name: sub.plan_name().to_string(),
            },
        }));
    }
    entries
}

/// RAII guard that restores terminal state on drop (even on panic).
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        io::stdout().execute(cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = io::stdout().execute(cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Result of a picker session. Terminal I/O failures are errors, not cancels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Picked(usize),
    Cancelled,
    NotInteractive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Cancel,
    Up,
    Down,
    Select,
    Ignore,
}

fn key_action(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    match (code, modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL)
        | (KeyCode::Esc, _)
        | (KeyCode::Char('q'), KeyModifiers::NONE) => KeyAction::Cancel,
        (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => KeyAction::Up,
        (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => KeyAction::Down,
        (KeyCode::Enter, _) => KeyAction::Select,
        _ => KeyAction::Ignore,
    }
}

pub fn choose(title: &str, entries: &[MenuEntry]) -> anyhow::Result<Choice> {
    if !is_interactive() || entries.is_empty() {
        return Ok(Choice::NotInteractive);
    }

    let _guard = RawModeGuard::enable()?;
    let mut cursor_pos: usize = 0;
    let mut drawn = draw(title, entries, cursor_pos)?;

    loop {
        if let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        {
            match key_action(code, modifiers) {
                KeyAction::Cancel => {
                    clear_ui(drawn)?;
                    return Ok(Choice::Cancelled);
                }
                KeyAction::Up => {
                    cursor_pos = cursor_pos.saturating_sub(1);
                }
                KeyAction::Down => {
                    if cursor_pos + 1 < entries.len() {
                        cursor_pos += 1;
                    }
                }
                KeyAction::Select => {
                    clear_ui(drawn)?;
                    return Ok(Choice::Picked(cursor_pos));
                }
                KeyAction::Ignore => {}
            }
            io::stdout().queue(cursor::MoveUp(drawn))?;
            drawn = draw(title, entries, cursor_pos)?;
        }
    }
}

/// Yes/no prompt; anything but `y` is a no.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    let _guard = RawModeGuard::enable()?;
    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(Print(format!("{question} [y/N] ")))?;
    stdout.flush()?;

    let answer = loop {
        if let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        {
            match (code, modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => break false,
                (KeyCode::Char('y'), _) | (KeyCode::Char('Y'), _) => break true,
                _ => break false,
            }
        }
    };

    stdout
        .queue(Print(if answer { "yes\r\n" } else { "no\r\n" }))?
        .flush()?;
    Ok(answer)
}

/// Draw the menu at the cursor and return how many lines it took.
fn draw(title: &str, entries: &[MenuEntry], cursor_pos: usize) -> io::Result<u16> {
    let mut stdout = io::stdout();

    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;

    stdout
        .queue(Print(format!("{title}\r\n")))?
        .queue(Print("\r\n"))?;

    for (i, entry) in entries.iter().enumerate() {
        let marker = if i == cursor_pos { "> " } else { "  " };
        if i == cursor_pos {
            stdout.queue(SetAttribute(Attribute::Reverse))?;
        }
        stdout.queue(Print(format!("{marker}{:<36} {}", entry.label, entry.hint)))?;
        if i == cursor_pos {
            stdout.queue(SetAttribute(Attribute::Reset))?;
        }
        stdout.queue(Print("\r\n"))?;
    }

    stdout
        .queue(Print("\r\n"))?
        .queue(Print("  up/down: move | enter: choose | q: cancel\r\n"))?;
    stdout.flush()?;

    Ok((entries.len() + 4) as u16)
}

fn clear_ui(drawn: u16) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveUp(drawn))?
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;
    stdout.flush()
}
