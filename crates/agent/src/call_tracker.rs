//! Call Tracker
//!
//! Accumulates the human-readable transcript and intent label for one call
//! and produces the [`CallRecord`] when the call ends.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use receptionist_core::{CallRecord, UNKNOWN_INTENT};
use receptionist_tools::ToolSession;

use crate::conversation::TranscriptPolicy;

#[derive(Debug)]
struct TrackerState {
    lines: Vec<String>,
    intent: String,
}

/// Transcript and intent accumulator for one call
///
/// Lines are recorded in the order the conversation actually happened:
/// caller utterances when finalized, assistant replies when they start
/// playing.
pub struct CallTracker {
    call_id: String,
    caller_id: String,
    created_at: DateTime<Utc>,
    started: Instant,
    policy: TranscriptPolicy,
    state: Mutex<TrackerState>,
}

impl CallTracker {
    pub fn new(
        call_id: impl Into<String>,
        caller_id: impl Into<String>,
        policy: TranscriptPolicy,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller_id: caller_id.into(),
            created_at: Utc::now(),
            started: Instant::now(),
            policy,
            state: Mutex::new(TrackerState {
                lines: Vec::new(),
                intent: UNKNOWN_INTENT.to_string(),
            }),
        }
    }

    pub fn record_user_utterance(&self, text: &str) {
        let line = self.policy.caller_line(text);
        self.state.lock().lines.push(line);
    }

    pub fn record_assistant_utterance(&self, text: &str) {
        let line = self.policy.assistant_line(text);
        self.state.lock().lines.push(line);
    }

    /// Overwrite the intent label; the last write wins
    pub fn set_intent(&self, intent: &str) {
        let intent = intent.trim();
        if intent.is_empty() {
            return;
        }
        self.state.lock().intent = intent.to_string();
        tracing::info!(call_id = %self.call_id, intent, "Intent detected");
    }

    /// Append a free-form annotation line
    pub fn add_note(&self, note: &str) {
        self.state.lock().lines.push(note.to_string());
    }

    pub fn transcript(&self) -> String {
        self.state.lock().lines.join("\n")
    }

    pub fn detected_intent(&self) -> String {
        self.state.lock().intent.clone()
    }

    pub fn line_count(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Whole seconds since the tracker was created
    pub fn duration_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Snapshot the call into a persistable record
    ///
    /// The session manager guarantees this runs once per call.
    pub fn finalize(&self) -> CallRecord {
        let state = self.state.lock();
        CallRecord {
            call_id: self.call_id.clone(),
            caller_id: self.caller_id.clone(),
            transcript: state.lines.join("\n"),
            detected_intent: state.intent.clone(),
            duration_secs: self.started.elapsed().as_secs(),
            created_at: self.created_at,
        }
    }
}

impl ToolSession for CallTracker {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    fn caller_id(&self) -> &str {
        &self.caller_id
    }

    fn set_intent(&self, intent: &str) {
        CallTracker::set_intent(self, intent);
    }

    fn add_note(&self, note: &str) {
        CallTracker::add_note(self, note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tracker() -> CallTracker {
        CallTracker::new("call-1", "+15550100", TranscriptPolicy::default())
    }

    #[tokio::test]
    async fn test_empty_call_record() {
        let record = tracker().finalize();
        assert_eq!(record.caller_id, "+15550100");
        assert_eq!(record.transcript, "");
        assert_eq!(record.detected_intent, "unknown");
        assert_eq!(record.duration_secs, 0);
    }

    #[tokio::test]
    async fn test_transcript_lines_interleave() {
        let tracker = tracker();
        tracker.record_assistant_utterance("Hello, thank you for calling Acme Corp.");
        tracker.record_user_utterance("What are your hours?");
        tracker.add_note("[Intent: hours_inquiry] Asked for hours");
        tracker.record_assistant_utterance("We're open 9 to 5.");

        assert_eq!(
            tracker.transcript(),
            "Receptionist: Hello, thank you for calling Acme Corp.\n\
             Caller: What are your hours?\n\
             [Intent: hours_inquiry] Asked for hours\n\
             Receptionist: We're open 9 to 5."
        );
        assert_eq!(tracker.line_count(), 4);
    }

    #[tokio::test]
    async fn test_intent_last_write_wins() {
        let tracker = tracker();
        tracker.set_intent("hours_inquiry");
        tracker.set_intent("sales_transfer");
        tracker.set_intent("   ");
        assert_eq!(tracker.detected_intent(), "sales_transfer");
        assert_eq!(tracker.finalize().detected_intent, "sales_transfer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_in_whole_seconds() {
        let tracker = tracker();
        tokio::time::advance(Duration::from_millis(2_700)).await;
        assert_eq!(tracker.duration_secs(), 2);
        assert_eq!(tracker.finalize().duration_secs, 2);
    }

    #[tokio::test]
    async fn test_tool_session_view() {
        let tracker = tracker();
        let session: &dyn ToolSession = &tracker;
        session.set_intent("location_inquiry");
        session.add_note("[Transfer: sales] Dana - pricing");
        assert_eq!(session.caller_id(), "+15550100");
        assert_eq!(tracker.detected_intent(), "location_inquiry");
        assert_eq!(tracker.transcript(), "[Transfer: sales] Dana - pricing");
    }
}
