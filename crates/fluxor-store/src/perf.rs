//! Injected clock/marker service used to bracket dispatches.
//!
//! Mirrors the mark/measure shape of a browser performance timeline so
//! the store can record named markers around the reducer chain and each
//! middleware, then derive durations for the performance log. Markers
//! are cleared after every dispatch, so entries never accumulate
//! cross-talk between dispatches.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Timeline entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Mark,
    Measure,
}

/// One recorded marker or measurement.
#[derive(Debug, Clone)]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: EntryType,
    /// Offset from the service's epoch.
    pub start: Duration,
    /// Zero for marks.
    pub duration: Duration,
}

/// Clock/marker collaborator. Implementations must be safe to call
/// from the dispatch worker task; the default is
/// [`MonotonicPerformance`]. Tests inject recording fakes.
pub trait Performance: Send + Sync {
    fn mark(&self, name: &str);

    /// Record a measure spanning the most recent marks with the given
    /// names. No-op when either mark is missing.
    fn measure(&self, name: &str, start_mark: &str, end_mark: &str);

    fn entries_by_name(&self, name: &str) -> Vec<PerformanceEntry>;

    fn entries_by_type(&self, entry_type: EntryType) -> Vec<PerformanceEntry>;

    fn clear_marks(&self);

    fn clear_measures(&self);
}

#[derive(Default)]
struct Entries {
    marks: Vec<PerformanceEntry>,
    measures: Vec<PerformanceEntry>,
}

/// Default [`Performance`] implementation over `std::time::Instant`.
pub struct MonotonicPerformance {
    epoch: Instant,
    entries: Mutex<Entries>,
}

impl MonotonicPerformance {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            entries: Mutex::new(Entries::default()),
        }
    }
}

impl Default for MonotonicPerformance {
    fn default() -> Self {
        Self::new()
    }
}

impl Performance for MonotonicPerformance {
    fn mark(&self, name: &str) {
        let start = self.epoch.elapsed();
        let mut entries = self.entries.lock().expect("performance lock poisoned");
        entries.marks.push(PerformanceEntry {
            name: name.to_string(),
            entry_type: EntryType::Mark,
            start,
            duration: Duration::ZERO,
        });
    }

    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) {
        let mut entries = self.entries.lock().expect("performance lock poisoned");
        let start = entries
            .marks
            .iter()
            .rev()
            .find(|e| e.name == start_mark)
            .map(|e| e.start);
        let end = entries
            .marks
            .iter()
            .rev()
            .find(|e| e.name == end_mark)
            .map(|e| e.start);

        if let (Some(start), Some(end)) = (start, end) {
            entries.measures.push(PerformanceEntry {
                name: name.to_string(),
                entry_type: EntryType::Measure,
                start,
                duration: end.saturating_sub(start),
            });
        }
    }

    fn entries_by_name(&self, name: &str) -> Vec<PerformanceEntry> {
        let entries = self.entries.lock().expect("performance lock poisoned");
        entries
            .marks
            .iter()
            .chain(entries.measures.iter())
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    fn entries_by_type(&self, entry_type: EntryType) -> Vec<PerformanceEntry> {
        let entries = self.entries.lock().expect("performance lock poisoned");
        match entry_type {
            EntryType::Mark => entries.marks.clone(),
            EntryType::Measure => entries.measures.clone(),
        }
    }

    fn clear_marks(&self) {
        self.entries
            .lock()
            .expect("performance lock poisoned")
            .marks
            .clear();
    }

    fn clear_measures(&self) {
        self.entries
            .lock()
            .expect("performance lock poisoned")
            .measures
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_spans_two_marks() {
        let perf = MonotonicPerformance::new();
        perf.mark("start");
        perf.mark("end");
        perf.measure("span", "start", "end");

        let measures = perf.entries_by_type(EntryType::Measure);
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].name, "span");
    }

    #[test]
    fn measure_with_missing_mark_is_a_noop() {
        let perf = MonotonicPerformance::new();
        perf.mark("start");
        perf.measure("span", "start", "nope");
        assert!(perf.entries_by_type(EntryType::Measure).is_empty());
    }

    #[test]
    fn clear_marks_keeps_measures() {
        let perf = MonotonicPerformance::new();
        perf.mark("start");
        perf.mark("end");
        perf.measure("span", "start", "end");

        perf.clear_marks();
        assert!(perf.entries_by_type(EntryType::Mark).is_empty());
        assert_eq!(perf.entries_by_type(EntryType::Measure).len(), 1);

        perf.clear_measures();
        assert!(perf.entries_by_type(EntryType::Measure).is_empty());
    }

    #[test]
    fn entries_by_name_sees_marks_and_measures() {
        let perf = MonotonicPerformance::new();
        perf.mark("a");
        perf.mark("a");
        perf.mark("b");
        assert_eq!(perf.entries_by_name("a").len(), 2);
        assert_eq!(perf.entries_by_name("b").len(), 1);
        assert!(perf.entries_by_name("c").is_empty());
    }
}
