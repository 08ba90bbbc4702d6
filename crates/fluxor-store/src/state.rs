//! The published state value, tagged by representation.
//!
//! Whether a store tracks history is decided once at construction and
//! carried as an explicit variant rather than re-inferred from the
//! value's shape on every dispatch. The serde representation stays
//! untagged, so on the wire a historied state is the plain
//! `{past, present, future}` object the debugger expects and structural
//! inference happens only at that boundary.

use serde::{Deserialize, Serialize};

use crate::history::{self, StateHistory};

/// A state snapshot as published on the store's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreState<T> {
    /// Undo/redo tracking enabled; the application state is the
    /// history's `present`.
    Historied(StateHistory<T>),
    /// No history tracking.
    Plain(T),
}

impl<T> StoreState<T> {
    /// The application state itself, regardless of representation.
    pub fn present(&self) -> &T {
        match self {
            StoreState::Historied(h) => &h.present,
            StoreState::Plain(t) => t,
        }
    }

    /// Consume the snapshot, yielding the application state.
    pub fn into_present(self) -> T {
        match self {
            StoreState::Historied(h) => h.present,
            StoreState::Plain(t) => t,
        }
    }

    pub fn is_historied(&self) -> bool {
        matches!(self, StoreState::Historied(_))
    }

    /// Produce the successor state from the current present.
    ///
    /// On a historied state this records the transition: the old
    /// present joins `past` and `future` is cleared. Reducers written
    /// with `update` work unchanged on both representations.
    pub fn update(self, f: impl FnOnce(T) -> T) -> StoreState<T>
    where
        T: Clone,
    {
        match self {
            StoreState::Historied(h) => {
                let next = f(h.present.clone());
                StoreState::Historied(history::next_state(h, next))
            }
            StoreState::Plain(t) => StoreState::Plain(f(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_on_plain_replaces_the_value() {
        let state = StoreState::Plain(1).update(|n| n + 1);
        assert_eq!(state, StoreState::Plain(2));
    }

    #[test]
    fn update_on_historied_records_the_transition() {
        let state = StoreState::Historied(StateHistory {
            past: vec![1],
            present: 2,
            future: vec![9],
        })
        .update(|n| n + 1);

        assert_eq!(
            state,
            StoreState::Historied(StateHistory {
                past: vec![1, 2],
                present: 3,
                future: vec![],
            })
        );
    }

    #[test]
    fn serde_representation_is_untagged() {
        let plain = StoreState::Plain(json!({ "count": 1 }));
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({ "count": 1 })
        );

        let historied = StoreState::Historied(StateHistory::new(json!({ "count": 1 })));
        assert_eq!(
            serde_json::to_value(&historied).unwrap(),
            json!({ "past": [], "present": { "count": 1 }, "future": [] })
        );
    }

    #[test]
    fn deserialization_detects_the_history_shape() {
        let state: StoreState<i32> =
            serde_json::from_value(json!({ "past": [1], "present": 2, "future": [] })).unwrap();
        assert!(state.is_historied());
        assert_eq!(*state.present(), 2);

        let state: StoreState<i32> = serde_json::from_value(json!(7)).unwrap();
        assert!(!state.is_historied());
        assert_eq!(*state.present(), 7);
    }
}
