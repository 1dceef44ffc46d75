use std::collections::VecDeque;

use crate::utils::format_clock;

pub const DEFAULT_DEBOUNCE_MS: f64 = 150.0;
/// Lines kept for the on-screen event list
pub const RECENT_CAPACITY: usize = 50;
/// Tracing target of every emitted game event
pub const EVENTS_TARGET: &str = "swat_piano::events";

#[derive(Clone, Debug, PartialEq)]
pub struct EventLine {
    pub at_ms: f64,
    pub text: String,
}

impl EventLine {
    pub fn stamped(&self) -> String {
        format!("{}: {}", format_clock(self.at_ms), self.text)
    }
}

/// Rate-limited game event reporting.
///
/// At most one message passes per debounce window; the rest are dropped
/// (not queued). Passed messages go to the log and to a bounded history.
pub struct EventLog {
    debounce_ms: f64,
    last_ms: Option<f64>,
    recent: VecDeque<EventLine>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl EventLog {
    pub fn new(debounce_ms: f64) -> Self {
        Self {
            debounce_ms: debounce_ms.max(0.0),
            last_ms: None,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    /// Emit `msg` at `now_ms` unless another message passed within the window.
    /// Returns whether the message was emitted.
    pub fn emit(&mut self, now_ms: f64, msg: &str) -> bool {
        if let Some(last) = self.last_ms {
            if now_ms - last < self.debounce_ms {
                tracing::trace!(target: EVENTS_TARGET, "suppressed: {}", msg);
                return false;
            }
        }
        self.last_ms = Some(now_ms);
        tracing::info!(target: EVENTS_TARGET, "{}", msg);

        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(EventLine { at_ms: now_ms, text: msg.to_string() });
        true
    }

    /// Emitted lines, oldest first
    pub fn recent(&self) -> impl DoubleEndedIterator<Item = &EventLine> {
        self.recent.iter()
    }

    pub fn last(&self) -> Option<&EventLine> {
        self.recent.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_always_passes() {
        let mut log = EventLog::default();
        assert!(log.emit(0.0, "Hit 🎹 with left_hand"));
        assert_eq!(log.last().unwrap().text, "Hit 🎹 with left_hand");
    }

    #[test]
    fn test_burst_emits_once() {
        let mut log = EventLog::new(150.0);
        assert!(log.emit(1000.0, "a"));
        assert!(!log.emit(1000.0, "b"));
        assert!(!log.emit(1100.0, "c"));
        assert!(!log.emit(1149.9, "d"));
        assert_eq!(log.recent().count(), 1);
    }

    #[test]
    fn test_spaced_messages_all_pass() {
        let mut log = EventLog::new(150.0);
        assert!(log.emit(1000.0, "a"));
        assert!(log.emit(1200.0, "b"));
        assert!(log.emit(1350.0, "c"));
        let texts: Vec<&str> = log.recent().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_suppressed_message_does_not_extend_window() {
        let mut log = EventLog::new(150.0);
        assert!(log.emit(0.0, "a"));
        assert!(!log.emit(100.0, "b"));
        // measured from "a", not "b"
        assert!(log.emit(160.0, "c"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut log = EventLog::new(0.0);
        for i in 0..(RECENT_CAPACITY + 10) {
            assert!(log.emit(i as f64, &format!("event {i}")));
        }
        assert_eq!(log.recent().count(), RECENT_CAPACITY);
        assert_eq!(log.recent().next().unwrap().text, "event 10");
    }
}
