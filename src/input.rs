// SPDX-License-Identifier: GPL-3.0-only

//! Keyboard input for the capture loop
//!
//! The loop only sees [`InputEvent`]s, so tests can drive it with a
//! scripted sequence instead of a real terminal.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{trace, warn};

/// What a keypress means to the capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Save the current frame pair (Space)
    Save,
    /// Leave the loop (Esc)
    Quit,
    /// Ctrl+C or a termination signal
    Interrupt,
    /// Any other key; ignored
    Other,
}

impl InputEvent {
    pub fn from_key(key: &KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                InputEvent::Interrupt
            }
            KeyCode::Char(' ') => InputEvent::Save,
            KeyCode::Esc => InputEvent::Quit,
            _ => InputEvent::Other,
        }
    }
}

/// Source of input events
pub trait InputSource {
    /// Wait at most `wait` for one event
    fn next_event(&mut self, wait: Duration) -> io::Result<Option<InputEvent>>;
}

/// Reads key presses from the terminal (raw mode must be enabled)
pub struct TerminalInput {
    interrupted: Arc<AtomicBool>,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Also report an interrupt once SIGINT/SIGTERM arrives
    ///
    /// Only one handler can be installed per process; if that fails the
    /// terminal keys keep working and the failure is logged.
    pub fn with_signal_handler(self) -> Self {
        let flag = self.interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Could not install signal handler");
        }
        self
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for TerminalInput {
    fn next_event(&mut self, wait: Duration) -> io::Result<Option<InputEvent>> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(Some(InputEvent::Interrupt));
        }
        if event::poll(wait)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let input = InputEvent::from_key(&key);
            trace!(?key.code, ?input, "Key pressed");
            return Ok(Some(input));
        }
        Ok(None)
    }
}

/// Plays back a fixed list of events, one per call
///
/// `None` entries mean "no key pressed this iteration". When the script
/// runs out it keeps answering `Quit`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<Option<InputEvent>>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = Option<InputEvent>>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self, _wait: Duration) -> io::Result<Option<InputEvent>> {
        Ok(self
            .events
            .pop_front()
            .unwrap_or(Some(InputEvent::Quit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(
            InputEvent::from_key(&key(KeyCode::Char(' '), KeyModifiers::NONE)),
            InputEvent::Save
        );
        assert_eq!(
            InputEvent::from_key(&key(KeyCode::Esc, KeyModifiers::NONE)),
            InputEvent::Quit
        );
        assert_eq!(
            InputEvent::from_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputEvent::Interrupt
        );
        assert_eq!(
            InputEvent::from_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)),
            InputEvent::Other
        );
        assert_eq!(
            InputEvent::from_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            InputEvent::Other
        );
    }

    #[test]
    fn test_scripted_input_ends_with_quit() {
        let mut input = ScriptedInput::new([None, Some(InputEvent::Save)]);
        let wait = Duration::ZERO;
        assert_eq!(input.next_event(wait).unwrap(), None);
        assert_eq!(input.next_event(wait).unwrap(), Some(InputEvent::Save));
        assert_eq!(input.next_event(wait).unwrap(), Some(InputEvent::Quit));
        assert_eq!(input.remaining(), 0);
    }
}
