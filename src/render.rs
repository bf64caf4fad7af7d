// src/render.rs

//! Rendering sinks. Rendering is purely observational: the protocol never
//! depends on what (or whether) anything gets drawn.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};

/// A line-addressed output surface. Lines are 1-based.
pub trait RenderSink: Send + Sync + fmt::Debug {
  /// Replaces the contents of `line` with `text`.
  fn write(&self, line: usize, text: &str);
  /// Clears the whole surface.
  fn clear(&self);
  /// Places an input prompt on `line`.
  fn prompt(&self, line: usize);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
  fn write(&self, _line: usize, _text: &str) {}
  fn clear(&self) {}
  fn prompt(&self, _line: usize) {}
}

/// Emits every line as a `tracing` event instead of drawing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RenderSink for TracingSink {
  fn write(&self, line: usize, text: &str) {
    tracing::info!(target: "diningphils::screen", line, "{}", text);
  }

  fn clear(&self) {}

  fn prompt(&self, _line: usize) {}
}

// ANSI control sequences.
const ESC: &str = "\x1B";
const CLEAR_LINE: &str = "\x1B[2K";
const CLEAR_SCREEN: &str = "\x1B[2J";
const PROMPT: &str = "> ";

fn cursor_position(row: usize, col: usize) -> String {
  format!("{}[{};{}H", ESC, row, col)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
  pub row: usize,
  pub col: usize,
}

impl CursorPos {
  const HOME: CursorPos = CursorPos { row: 1, col: 1 };
}

#[derive(Debug)]
struct ScreenState<W> {
  cursor: CursorPos,
  out: W,
}

/// A terminal drawn with ANSI escape sequences.
///
/// Writing a status line jumps to that line, clears it, writes the text and
/// jumps back to the logical cursor (normally the operator's prompt), so
/// status updates never disturb what the operator is typing.
pub struct AnsiScreen<W: Write + Send> {
  state: Mutex<ScreenState<W>>,
}

impl AnsiScreen<io::Stdout> {
  pub fn stdout() -> Self {
    Self::new(io::stdout())
  }
}

impl<W: Write + Send> AnsiScreen<W> {
  pub fn new(out: W) -> Self {
    Self {
      state: Mutex::new(ScreenState {
        cursor: CursorPos::HOME,
        out,
      }),
    }
  }

  pub fn cursor(&self) -> CursorPos {
    self.state.lock().cursor
  }

  /// Runs `f` against the underlying writer.
  pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
    f(&mut self.state.lock().out)
  }

  pub fn into_inner(self) -> W {
    self.state.into_inner().out
  }

  fn emit(state: &mut ScreenState<W>, s: &str) {
    let result = state.out.write_all(s.as_bytes()).and_then(|_| state.out.flush());
    if let Err(e) = result {
      tracing::warn!(error = %e, "Screen write failed");
    }
  }
}

impl<W: Write + Send> fmt::Debug for AnsiScreen<W> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnsiScreen").field("cursor", &self.cursor()).finish_non_exhaustive()
  }
}

impl<W: Write + Send> RenderSink for AnsiScreen<W> {
  fn write(&self, line: usize, text: &str) {
    let mut state = self.state.lock();
    let restore = state.cursor;
    let s = format!(
      "{}{}{}{}",
      cursor_position(line, 1),
      CLEAR_LINE,
      text,
      cursor_position(restore.row, restore.col)
    );
    Self::emit(&mut state, &s);
  }

  fn clear(&self) {
    let mut state = self.state.lock();
    state.cursor = CursorPos::HOME;
    let s = format!("{}{}", CLEAR_SCREEN, cursor_position(1, 1));
    Self::emit(&mut state, &s);
  }

  fn prompt(&self, line: usize) {
    let mut state = self.state.lock();
    state.cursor = CursorPos {
      row: line,
      col: 1 + PROMPT.len(),
    };
    let s = format!("{}{}{}", cursor_position(line, 1), CLEAR_LINE, PROMPT);
    Self::emit(&mut state, &s);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clear_homes_the_cursor() {
    let screen = AnsiScreen::new(Vec::new());
    screen.clear();
    assert_eq!(screen.cursor(), CursorPos { row: 1, col: 1 });
    assert_eq!(screen.into_inner(), b"\x1B[2J\x1B[1;1H".to_vec());
  }

  #[test]
  fn write_line_restores_cursor() {
    let screen = AnsiScreen::new(Vec::new());
    screen.write(3, "this string");
    let out = String::from_utf8(screen.into_inner()).unwrap();
    assert_eq!(out, "\x1B[3;1H\x1B[2Kthis string\x1B[1;1H");
  }

  #[test]
  fn prompt_moves_logical_cursor() {
    let screen = AnsiScreen::new(Vec::new());
    screen.prompt(7);
    assert_eq!(screen.cursor(), CursorPos { row: 7, col: 3 });
    screen.write(2, "x");
    let out = screen.with_writer(|w| String::from_utf8(w.clone()).unwrap());
    assert!(out.ends_with("\x1B[2;1H\x1B[2Kx\x1B[7;3H"), "{:?}", out);
  }
}
