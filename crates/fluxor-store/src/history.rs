//! Undo/redo history as pure functions over [`StateHistory`].
//!
//! Every function takes the history by value and returns the successor,
//! so reducers can thread the value through without shared mutation.
//! Stepping beyond the available depth saturates at the boundary
//! instead of failing.

use serde::{Deserialize, Serialize};

/// A state value wrapped with its undo/redo context.
///
/// `past` holds older presents (oldest first), `future` holds states
/// that were undone (nearest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHistory<T> {
    pub past: Vec<T>,
    pub present: T,
    pub future: Vec<T>,
}

impl<T> StateHistory<T> {
    /// Wrap a fresh present with empty past and future.
    pub fn new(present: T) -> Self {
        Self {
            past: Vec::new(),
            present,
            future: Vec::new(),
        }
    }
}

/// History configuration carried in [`StoreOptions`](crate::StoreOptions).
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryOptions {
    /// Track past/future states and register the built-in `jump` action.
    pub undoable: bool,
    /// Ring-buffer bound applied to `past` and `future` after every
    /// publish. `None` keeps the full history.
    pub limit: Option<usize>,
}

/// Move one step back. No-op when `past` is empty.
pub fn undo<T>(mut history: StateHistory<T>) -> StateHistory<T> {
    if let Some(previous) = history.past.pop() {
        let current = std::mem::replace(&mut history.present, previous);
        history.future.insert(0, current);
    }
    history
}

/// Move one step forward. No-op when `future` is empty.
pub fn redo<T>(mut history: StateHistory<T>) -> StateHistory<T> {
    if history.future.is_empty() {
        return history;
    }
    let next = history.future.remove(0);
    let current = std::mem::replace(&mut history.present, next);
    history.past.push(current);
    history
}

/// Step `distance` entries through the history: negative undoes,
/// positive redoes, zero is a no-op. Saturates at either boundary.
pub fn jump<T>(mut history: StateHistory<T>, distance: isize) -> StateHistory<T> {
    if distance < 0 {
        for _ in 0..distance.unsigned_abs() {
            history = undo(history);
        }
    } else {
        for _ in 0..distance {
            history = redo(history);
        }
    }
    history
}

/// Trim `past` to the most recent `limit` entries and `future` to the
/// nearest `limit` entries, discarding the oldest.
pub fn apply_limits<T>(mut history: StateHistory<T>, limit: usize) -> StateHistory<T> {
    if history.past.len() > limit {
        let excess = history.past.len() - limit;
        history.past.drain(..excess);
    }
    history.future.truncate(limit);
    history
}

/// Record a new present: the old present joins `past` and any undone
/// `future` entries are discarded.
pub fn next_state<T>(mut history: StateHistory<T>, present: T) -> StateHistory<T> {
    let current = std::mem::replace(&mut history.present, present);
    history.past.push(current);
    history.future.clear();
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(past: Vec<i32>, present: i32, future: Vec<i32>) -> StateHistory<i32> {
        StateHistory {
            past,
            present,
            future,
        }
    }

    #[test]
    fn undo_moves_last_past_entry_to_present() {
        let h = undo(history(vec![1, 2], 3, vec![]));
        assert_eq!(h, history(vec![1], 2, vec![3]));
    }

    #[test]
    fn undo_with_empty_past_is_a_noop() {
        let h = history(vec![], 1, vec![2]);
        assert_eq!(undo(h.clone()), h);
    }

    #[test]
    fn redo_moves_first_future_entry_to_present() {
        let h = redo(history(vec![1], 2, vec![3, 4]));
        assert_eq!(h, history(vec![1, 2], 3, vec![4]));
    }

    #[test]
    fn redo_with_empty_future_is_a_noop() {
        let h = history(vec![1], 2, vec![]);
        assert_eq!(redo(h.clone()), h);
    }

    #[test]
    fn redo_after_undo_restores_the_original() {
        let h = history(vec![1, 2], 3, vec![]);
        assert_eq!(redo(undo(h.clone())), h);
    }

    #[test]
    fn jump_applies_multiple_undos_or_redos() {
        let h = history(vec![1, 2, 3], 4, vec![]);
        let back = jump(h, -2);
        assert_eq!(back, history(vec![1], 2, vec![3, 4]));
        let forward = jump(back, 1);
        assert_eq!(forward, history(vec![1, 2], 3, vec![4]));
    }

    #[test]
    fn jump_saturates_at_the_boundary() {
        let h = jump(history(vec![1], 2, vec![]), -10);
        assert_eq!(h, history(vec![], 1, vec![2]));
        let h = jump(h, 10);
        assert_eq!(h, history(vec![1], 2, vec![]));
    }

    #[test]
    fn jump_zero_is_a_noop() {
        let h = history(vec![1], 2, vec![3]);
        assert_eq!(jump(h.clone(), 0), h);
    }

    #[test]
    fn apply_limits_keeps_the_most_recent_entries() {
        let h = apply_limits(history(vec![1, 2, 3, 4], 5, vec![6, 7, 8]), 2);
        assert_eq!(h, history(vec![3, 4], 5, vec![6, 7]));
    }

    #[test]
    fn apply_limits_within_bounds_is_a_noop() {
        let h = history(vec![1], 2, vec![3]);
        assert_eq!(apply_limits(h.clone(), 5), h);
    }

    #[test]
    fn next_state_pushes_present_and_clears_future() {
        let h = next_state(history(vec![1], 2, vec![9]), 3);
        assert_eq!(h, history(vec![1, 2], 3, vec![]));
    }
}
