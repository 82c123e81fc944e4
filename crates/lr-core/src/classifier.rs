//! Stream classifier and re-emitter.
//!
//! A `Session` covers exactly one request/response cycle: it consumes the
//! agent service's fragments strictly in arrival order and produces the
//! host events to emit, gated by the cycle's display preferences. Tool
//! calls follow a two-state lifecycle per identifier (open, then closed
//! by the matching return); violations of the pairing contract are hard
//! errors, never best-effort skips.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use lr_protocol::{
    DisplayPreferences, Fragment, HostEvent, StatusLevel, ToolInvocation, UnknownFragment,
    UsageStats,
};

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    /// The fragment matched no known shape. Fatal: dropping it silently
    /// could hide protocol drift on the agent side.
    #[error("unknown fragment kind: {0}")]
    UnknownFragmentKind(#[from] UnknownFragment),
    /// A tool call reused an identifier already seen in this session.
    #[error("duplicate tool call id {0:?}")]
    DuplicateCallId(String),
    /// A tool return arrived for an identifier that is not open.
    #[error("tool return for unopened call id {0:?}")]
    UnmatchedToolReturn(String),
    /// `feed` was called after `end`.
    #[error("session already ended")]
    SessionEnded,
}

impl ClassifyError {
    /// Stable name used as the `type` field of emitted error events.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::UnknownFragmentKind(_) => "UnknownFragmentKind",
            ClassifyError::DuplicateCallId(_) => "DuplicateCallId",
            ClassifyError::UnmatchedToolReturn(_) => "UnmatchedToolReturn",
            ClassifyError::SessionEnded => "SessionEnded",
        }
    }
}

/// A tool call awaiting its return.
#[derive(Debug, Clone, PartialEq)]
struct PendingToolCall {
    id: String,
    name: String,
}

/// Classifier state for one request/response cycle.
pub struct Session {
    prefs: DisplayPreferences,
    /// Calls currently open, in arrival order.
    open_calls: Vec<PendingToolCall>,
    /// Every call identifier ever seen this session, open or closed.
    seen_ids: HashSet<String>,
    usage: UsageStats,
    ended: bool,
}

impl Session {
    /// Start a cycle with the given preferences bound for its duration.
    pub fn new(prefs: DisplayPreferences) -> Self {
        Self {
            prefs,
            open_calls: Vec::new(),
            seen_ids: HashSet::new(),
            usage: UsageStats::default(),
            ended: false,
        }
    }

    /// Number of calls still awaiting their return.
    pub fn open_call_count(&self) -> usize {
        self.open_calls.len()
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Classify a raw JSON frame and feed it.
    pub fn feed_raw(&mut self, raw: &Value) -> Result<Vec<HostEvent>, ClassifyError> {
        if self.ended {
            return Err(ClassifyError::SessionEnded);
        }
        let fragment = Fragment::classify(raw)?;
        self.feed(fragment)
    }

    /// Process one fragment, returning the host events to emit for it,
    /// in order. Mutates session state; fragments are expected at most
    /// once, in arrival order.
    pub fn feed(&mut self, fragment: Fragment) -> Result<Vec<HostEvent>, ClassifyError> {
        if self.ended {
            return Err(ClassifyError::SessionEnded);
        }

        match fragment {
            Fragment::AssistantText { content } => {
                // Assistant content is never gated.
                Ok(vec![HostEvent::message(content)])
            }
            Fragment::Reasoning { message } => {
                if self.prefs.show_reasoning {
                    Ok(vec![HostEvent::reasoning(message)])
                } else {
                    Ok(Vec::new())
                }
            }
            Fragment::ToolCall(call) => self.open_call(call),
            Fragment::ToolReturn {
                tool_call_id,
                content: _,
                status,
            } => self.close_call(&tool_call_id, status.as_deref()),
            Fragment::Usage(stats) => {
                // Overwrite, never sum: each usage fragment carries the
                // cycle totals so far.
                self.usage = stats;
                Ok(Vec::new())
            }
        }
    }

    fn open_call(&mut self, call: ToolInvocation) -> Result<Vec<HostEvent>, ClassifyError> {
        if !self.seen_ids.insert(call.id.clone()) {
            return Err(ClassifyError::DuplicateCallId(call.id));
        }

        let event = self.prefs.display_events.then(|| {
            HostEvent::status(
                StatusLevel::Info,
                format!("Calling {} [{}]", call.name, call.id),
                false,
            )
        });

        self.open_calls.push(PendingToolCall {
            id: call.id,
            name: call.name,
        });

        Ok(event.into_iter().collect())
    }

    fn close_call(
        &mut self,
        id: &str,
        status: Option<&str>,
    ) -> Result<Vec<HostEvent>, ClassifyError> {
        let pos = self
            .open_calls
            .iter()
            .position(|call| call.id == id)
            .ok_or_else(|| ClassifyError::UnmatchedToolReturn(id.to_string()))?;
        let call = self.open_calls.remove(pos);

        // The result content is consumed by the agent, not re-emitted.
        // A failed tool run still closes the call; it only changes the
        // status level.
        let failed = status == Some("error");
        let event = self.prefs.display_events.then(|| {
            if failed {
                HostEvent::status(
                    StatusLevel::Error,
                    format!("{} failed [{}]", call.name, call.id),
                    false,
                )
            } else {
                HostEvent::status(
                    StatusLevel::Info,
                    format!("{} finished [{}]", call.name, call.id),
                    false,
                )
            }
        });

        Ok(event.into_iter().collect())
    }

    /// Finish the cycle: report unresolved calls, then the usage summary,
    /// then the terminal status. Safe to call on a partial session after
    /// an abnormal stream end; idempotent once ended.
    pub fn end(&mut self) -> Vec<HostEvent> {
        if self.ended {
            return Vec::new();
        }
        self.ended = true;

        let mut events = Vec::new();
        let unresolved = !self.open_calls.is_empty();

        for call in self.open_calls.drain(..) {
            events.push(HostEvent::error(
                format!("tool call {} [{}] never returned", call.name, call.id),
                "UnresolvedToolCall",
            ));
        }

        if self.prefs.show_usage_stats {
            events.push(HostEvent::Usage(self.usage));
        }

        if unresolved {
            events.push(HostEvent::status(
                StatusLevel::Error,
                "Completed with unresolved tool calls",
                true,
            ));
        } else {
            events.push(HostEvent::status(StatusLevel::Success, "Response received", true));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_on() -> DisplayPreferences {
        DisplayPreferences::default()
    }

    fn tool_call(id: &str, name: &str) -> Fragment {
        Fragment::ToolCall(ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments: serde_json::Map::new(),
        })
    }

    fn tool_return(id: &str) -> Fragment {
        Fragment::ToolReturn {
            tool_call_id: id.to_string(),
            content: "ok".to_string(),
            status: None,
        }
    }

    fn usage(completion: u64, prompt: u64, total: u64, steps: u64) -> Fragment {
        Fragment::Usage(UsageStats {
            completion_tokens: completion,
            prompt_tokens: prompt,
            total_tokens: total,
            step_count: steps,
        })
    }

    #[test]
    fn assistant_text_always_emitted() {
        let mut session = Session::new(DisplayPreferences {
            display_events: false,
            show_reasoning: false,
            show_usage_stats: false,
        });

        let events = session
            .feed(Fragment::AssistantText {
                content: "Hello".to_string(),
            })
            .unwrap();

        assert_eq!(events, vec![HostEvent::message("Hello")]);
    }

    #[test]
    fn reasoning_emitted_when_enabled() {
        let mut session = Session::new(all_on());
        let events = session
            .feed(Fragment::Reasoning {
                message: "thinking".to_string(),
            })
            .unwrap();
        assert_eq!(events, vec![HostEvent::reasoning("thinking")]);
    }

    #[test]
    fn reasoning_suppressed_when_disabled() {
        let mut session = Session::new(DisplayPreferences {
            show_reasoning: false,
            ..DisplayPreferences::default()
        });

        for _ in 0..3 {
            let events = session
                .feed(Fragment::Reasoning {
                    message: "hidden".to_string(),
                })
                .unwrap();
            assert!(events.is_empty());
        }
    }

    #[test]
    fn tool_call_emits_status_referencing_id() {
        let mut session = Session::new(all_on());
        let events = session.feed(tool_call("c1", "get_weather")).unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            HostEvent::Status {
                level, description, ..
            } => {
                assert_eq!(*level, StatusLevel::Info);
                assert!(description.contains("c1"));
                assert!(description.contains("get_weather"));
            }
            other => panic!("expected status, got {other:?}"),
        }
        assert_eq!(session.open_call_count(), 1);
    }

    #[test]
    fn tool_call_silent_without_display_events() {
        let mut session = Session::new(DisplayPreferences {
            display_events: false,
            ..DisplayPreferences::default()
        });

        let events = session.feed(tool_call("c1", "get_weather")).unwrap();
        assert!(events.is_empty());
        // Still tracked even when not displayed.
        assert_eq!(session.open_call_count(), 1);
    }

    #[test]
    fn duplicate_call_id_rejected() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "get_weather")).unwrap();

        let err = session.feed(tool_call("c1", "get_weather")).unwrap_err();
        assert_eq!(err, ClassifyError::DuplicateCallId("c1".to_string()));
    }

    #[test]
    fn call_id_never_reusable_even_after_return() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "get_weather")).unwrap();
        session.feed(tool_return("c1")).unwrap();

        let err = session.feed(tool_call("c1", "get_weather")).unwrap_err();
        assert_eq!(err, ClassifyError::DuplicateCallId("c1".to_string()));
    }

    #[test]
    fn unmatched_tool_return_rejected() {
        let mut session = Session::new(all_on());
        let err = session.feed(tool_return("ghost")).unwrap_err();
        assert_eq!(err, ClassifyError::UnmatchedToolReturn("ghost".to_string()));
    }

    #[test]
    fn tool_return_closes_call_and_emits_completion() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "get_weather")).unwrap();

        let events = session.feed(tool_return("c1")).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            HostEvent::Status {
                level, description, ..
            } => {
                assert_eq!(*level, StatusLevel::Info);
                assert!(description.contains("c1"));
            }
            other => panic!("expected status, got {other:?}"),
        }
        assert_eq!(session.open_call_count(), 0);
    }

    #[test]
    fn failed_tool_return_uses_error_level_but_closes_call() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "get_weather")).unwrap();

        let events = session
            .feed(Fragment::ToolReturn {
                tool_call_id: "c1".to_string(),
                content: "timeout".to_string(),
                status: Some("error".to_string()),
            })
            .unwrap();

        match &events[0] {
            HostEvent::Status { level, .. } => assert_eq!(*level, StatusLevel::Error),
            other => panic!("expected status, got {other:?}"),
        }
        assert_eq!(session.open_call_count(), 0);

        // Non-fatal: the cycle still ends cleanly.
        let end = session.end();
        match end.last().unwrap() {
            HostEvent::Status { level, .. } => assert_eq!(*level, StatusLevel::Success),
            other => panic!("expected terminal status, got {other:?}"),
        }
    }

    #[test]
    fn tool_return_content_not_reemitted_as_message() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "get_weather")).unwrap();
        let events = session.feed(tool_return("c1")).unwrap();
        assert!(events
            .iter()
            .all(|e| !matches!(e, HostEvent::Message { .. })));
    }

    #[test]
    fn usage_overwrites_not_sums() {
        let mut session = Session::new(all_on());
        assert!(session.feed(usage(10, 20, 30, 1)).unwrap().is_empty());
        assert!(session.feed(usage(15, 25, 40, 2)).unwrap().is_empty());

        let events = session.end();
        let usages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Usage(stats) => Some(*stats),
                _ => None,
            })
            .collect();

        assert_eq!(usages.len(), 1);
        assert_eq!(
            usages[0],
            UsageStats {
                completion_tokens: 15,
                prompt_tokens: 25,
                total_tokens: 40,
                step_count: 2
            }
        );
    }

    #[test]
    fn end_without_usage_when_disabled() {
        let mut session = Session::new(DisplayPreferences {
            show_usage_stats: false,
            ..DisplayPreferences::default()
        });
        session.feed(usage(1, 2, 3, 1)).unwrap();

        let events = session.end();
        assert!(events.iter().all(|e| !matches!(e, HostEvent::Usage(_))));
    }

    #[test]
    fn well_paired_calls_leave_nothing_unresolved() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "a")).unwrap();
        session.feed(tool_call("c2", "b")).unwrap();
        session.feed(tool_return("c2")).unwrap();
        session.feed(tool_return("c1")).unwrap();

        let events = session.end();
        assert!(events.iter().all(|e| !matches!(e, HostEvent::Error { .. })));
        match events.last().unwrap() {
            HostEvent::Status { level, done, .. } => {
                assert_eq!(*level, StatusLevel::Success);
                assert!(done);
            }
            other => panic!("expected terminal status, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_calls_reported_in_arrival_order() {
        let mut session = Session::new(all_on());
        session.feed(tool_call("c1", "first")).unwrap();
        session.feed(tool_call("c2", "second")).unwrap();

        let events = session.end();

        // Two unresolved errors, then usage, then terminal error status.
        match (&events[0], &events[1]) {
            (
                HostEvent::Error { error: e1, kind: k1 },
                HostEvent::Error { error: e2, kind: k2 },
            ) => {
                assert_eq!(k1, "UnresolvedToolCall");
                assert_eq!(k2, "UnresolvedToolCall");
                assert!(e1.contains("c1"));
                assert!(e2.contains("c2"));
            }
            other => panic!("expected two errors, got {other:?}"),
        }
        assert!(matches!(events[2], HostEvent::Usage(_)));
        match &events[3] {
            HostEvent::Status { level, done, .. } => {
                assert_eq!(*level, StatusLevel::Error);
                assert!(done);
            }
            other => panic!("expected terminal status, got {other:?}"),
        }
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn feed_after_end_rejected() {
        let mut session = Session::new(all_on());
        session.end();

        let err = session
            .feed(Fragment::AssistantText {
                content: "late".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, ClassifyError::SessionEnded);
        assert!(session.has_ended());
    }

    #[test]
    fn end_is_idempotent() {
        let mut session = Session::new(all_on());
        let first = session.end();
        assert!(!first.is_empty());
        assert!(session.end().is_empty());
    }

    #[test]
    fn feed_raw_classifies_and_feeds() {
        let mut session = Session::new(all_on());
        let events = session
            .feed_raw(&json!({"message_type": "assistant_message", "content": "Hi"}))
            .unwrap();
        assert_eq!(events, vec![HostEvent::message("Hi")]);
    }

    #[test]
    fn feed_raw_unknown_shape_is_fatal() {
        let mut session = Session::new(all_on());
        let err = session
            .feed_raw(&json!({"message_type": "heartbeat"}))
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownFragmentKind");
    }

    #[test]
    fn error_kind_names() {
        assert_eq!(
            ClassifyError::DuplicateCallId("x".to_string()).kind(),
            "DuplicateCallId"
        );
        assert_eq!(
            ClassifyError::UnmatchedToolReturn("x".to_string()).kind(),
            "UnmatchedToolReturn"
        );
        assert_eq!(ClassifyError::SessionEnded.kind(), "SessionEnded");
    }

    // End-to-end scenario from the relay's contract: text, a full tool
    // round trip, then a quiet end.
    #[test]
    fn full_cycle_scenario() {
        let mut session = Session::new(DisplayPreferences {
            show_usage_stats: false,
            ..DisplayPreferences::default()
        });

        let events = session
            .feed(Fragment::AssistantText {
                content: "Hello".to_string(),
            })
            .unwrap();
        assert_eq!(events, vec![HostEvent::message("Hello")]);

        let events = session.feed(tool_call("c1", "get_weather")).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], HostEvent::Status { description, .. } if description.contains("c1")));

        let events = session
            .feed(Fragment::ToolReturn {
                tool_call_id: "c1".to_string(),
                content: "Sunny, 22°C".to_string(),
                status: None,
            })
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(session.open_call_count(), 0);

        let events = session.end();
        assert_eq!(events.len(), 1);
        match &events[0] {
            HostEvent::Status { level, done, .. } => {
                assert_eq!(*level, StatusLevel::Success);
                assert!(done);
            }
            other => panic!("expected terminal status, got {other:?}"),
        }
    }
}
