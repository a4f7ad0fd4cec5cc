//! Phase-aware view selection and key dispatch — state only
//! ("the terminal UI rendering layer... the state machine itself is in
//! scope"). No drawing happens here; [`Orchestrator`](crate::orchestrator::Orchestrator)
//! owns a [`ReviewState`] and calls [`dispatch_key`] to turn a
//! `crossterm` key event into an [`Action`]. Grounded on `rxfork-worktrunk`'s
//! use of `crossterm`'s `KeyCode`/`KeyModifiers` for its own input layer.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Top-level pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
   Loading,
   Review,
   Commit,
   Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
   Collect,
   Preprocess,
   Prompt,
   Query,
}

impl LoadingStage {
   /// The stage this one transitions to on completion, or `None` if
   /// this is the last loading stage (transitions out to `Phase::Review`).
   pub const fn next(self) -> Option<Self> {
      match self {
         Self::Collect => Some(Self::Preprocess),
         Self::Preprocess => Some(Self::Prompt),
         Self::Prompt => Some(Self::Query),
         Self::Query => None,
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
   Init,
   Committing,
   Committed,
   Pushing,
   Pushed,
   PushFailed,
   CreatingPr,
   PrCreated,
   PrFailed,
   Done,
}

impl CommitStage {
   /// Stages that hold the UI for 3000ms instead of the default.
   pub const fn is_failure(self) -> bool {
         matches!(self, Self::PushFailed | Self::PrFailed)
   }

   /// Terminal commit sub-stages: the ones that eventually exit the
   /// process, after their dwell hold (1500ms success / 3000ms failure).
   pub const fn is_terminal(self) -> bool {
         matches!(self, Self::Done | Self::PushFailed | Self::PrFailed)
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewButton {
   Accept,
   Edit,
   Cancel,
}

impl ReviewButton {
   const ORDER: [Self; 3] = [Self::Accept, Self::Edit, Self::Cancel];

   fn index(self) -> usize {
      Self::ORDER.iter().position(|b| *b == self).unwrap_or(0)
   }

   /// Cycles forward, wrapping at both ends.
   pub fn next(self) -> Self {
      Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
   }

   /// Cycles backward, wrapping at both ends.
   pub fn prev(self) -> Self {
      let len = Self::ORDER.len();
      Self::ORDER[(self.index() + len - 1) % len]
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewState {
   pub selected: ReviewButton,
   pub editing:  bool,
}

impl Default for ReviewState {
   fn default() -> Self {
      Self { selected: ReviewButton::Accept, editing: false }
   }
}

/// The outcome of dispatching a key event against a [`ReviewState`].
/// The orchestrator applies this to its own state and, for the
/// terminal actions, drives the phase transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
   MoveSelection(ReviewButton),
   Activate(ReviewButton),
   StartEdit,
   CommitEdit,
   AbortEdit,
   Cancel,
   None,
}

/// Pure key-to-action dispatch for the review sub-state. Arrow
/// keys cycle `{accept, edit, cancel}` with wraparound; `A`/`E`/`C`
/// (case-insensitive) jump directly to a button; `Enter` activates the
/// current selection; `Ctrl+C`, `Q`, or `Esc` cancel. While editing,
/// `Ctrl+S` commits the edit and `Esc` aborts it, and no other key is
/// interpreted as navigation.
pub fn dispatch_key(state: &ReviewState, key: KeyEvent) -> Action {
   if state.editing {
      return match key.code {
         KeyCode::Char('s') | KeyCode::Char('S') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Action::CommitEdit
         },
         KeyCode::Esc => Action::AbortEdit,
         _ => Action::None,
      };
   }

   if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      return Action::Cancel;
   }

   match key.code {
      KeyCode::Left | KeyCode::Up | KeyCode::BackTab => Action::MoveSelection(state.selected.prev()),
      KeyCode::Right | KeyCode::Down | KeyCode::Tab => Action::MoveSelection(state.selected.next()),
      KeyCode::Char('a') | KeyCode::Char('A') => Action::Activate(ReviewButton::Accept),
      KeyCode::Char('e') | KeyCode::Char('E') => Action::Activate(ReviewButton::Edit),
      KeyCode::Char('c') | KeyCode::Char('C') => Action::Activate(ReviewButton::Cancel),
      KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Cancel,
      KeyCode::Enter => Action::Activate(state.selected),
      _ => Action::None,
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn key(code: KeyCode) -> KeyEvent {
      KeyEvent::new(code, KeyModifiers::NONE)
   }

   #[test]
   fn arrow_keys_cycle_with_wraparound() {
      assert_eq!(ReviewButton::Accept.prev(), ReviewButton::Cancel);
      assert_eq!(ReviewButton::Cancel.next(), ReviewButton::Accept);
      assert_eq!(ReviewButton::Accept.next(), ReviewButton::Edit);
   }

   #[test]
   fn shortcut_letters_dispatch_immediately_regardless_of_selection() {
      let state = ReviewState { selected: ReviewButton::Accept, editing: false };
      assert_eq!(dispatch_key(&state, key(KeyCode::Char('E'))), Action::Activate(ReviewButton::Edit));
      assert_eq!(dispatch_key(&state, key(KeyCode::Char('c'))), Action::Activate(ReviewButton::Cancel));
   }

   #[test]
   fn enter_activates_current_selection() {
      let state = ReviewState { selected: ReviewButton::Edit, editing: false };
      assert_eq!(dispatch_key(&state, key(KeyCode::Enter)), Action::Activate(ReviewButton::Edit));
   }

   #[test]
   fn ctrl_c_and_q_and_esc_all_cancel() {
      let state = ReviewState::default();
      assert_eq!(dispatch_key(&state, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Cancel);
      assert_eq!(dispatch_key(&state, key(KeyCode::Char('q'))), Action::Cancel);
      assert_eq!(dispatch_key(&state, key(KeyCode::Esc)), Action::Cancel);
   }

   #[test]
   fn editing_mode_only_responds_to_ctrl_s_and_esc() {
      let state = ReviewState { selected: ReviewButton::Edit, editing: true };
      assert_eq!(dispatch_key(&state, key(KeyCode::Char('a'))), Action::None);
      assert_eq!(dispatch_key(&state, key(KeyCode::Esc)), Action::AbortEdit);
      assert_eq!(
         dispatch_key(&state, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
         Action::CommitEdit
      );
   }
}
