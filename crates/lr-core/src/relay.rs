//! Relay driver: wires the backend frame stream through a classifier
//! session and forwards the resulting host events to an emitter.
//!
//! One call is one response cycle. Fatal classifier errors and backend
//! failures terminate the cycle with a host error event, but the
//! session's `end` output (unresolved calls, usage summary, terminal
//! status) is always flushed, even after an abnormal stream end.

use futures::{pin_mut, Stream, StreamExt};
use serde_json::Value;

use lr_backend::BackendError;
use lr_protocol::{DisplayPreferences, HostEvent, StatusLevel};

use crate::classifier::Session;
use crate::response_log::ResponseLogger;

/// Result of one response cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Assistant text accumulated over the cycle, newline-joined.
    pub transcript: String,
    /// The failure that cut the cycle short, if any.
    pub failure: Option<String>,
}

impl CycleOutcome {
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drive one response cycle: feed every frame to a fresh session, emit
/// its events in order, and finish with the session summary.
pub async fn run_cycle<S, F>(
    frames: S,
    prefs: DisplayPreferences,
    log: &mut ResponseLogger,
    mut emit: F,
) -> CycleOutcome
where
    S: Stream<Item = Result<Value, BackendError>>,
    F: FnMut(HostEvent),
{
    let mut session = Session::new(prefs);
    let mut transcript: Vec<String> = Vec::new();
    let mut failure = None;

    if prefs.display_events {
        let event = HostEvent::status(StatusLevel::Info, "Processing request...", false);
        log.log_event(&event);
        emit(event);
    }

    pin_mut!(frames);

    while let Some(result) = frames.next().await {
        match result {
            Ok(frame) => {
                log.log_fragment(&frame);
                match session.feed_raw(&frame) {
                    Ok(events) => {
                        for event in events {
                            if let HostEvent::Message { ref content } = event {
                                transcript.push(content.clone());
                            }
                            log.log_event(&event);
                            emit(event);
                        }
                    }
                    Err(err) => {
                        log.log_error(err.kind(), &err.to_string());
                        let event = HostEvent::error(err.to_string(), err.kind());
                        log.log_event(&event);
                        emit(event);
                        failure = Some(err.to_string());
                        break;
                    }
                }
            }
            Err(err) => {
                // Transport failure: treat as an early abnormal stream
                // end, the summary below still runs.
                log.log_error("BackendError", &err.to_string());
                let event = HostEvent::error(err.to_string(), "BackendError");
                log.log_event(&event);
                emit(event);
                failure = Some(err.to_string());
                break;
            }
        }
    }

    for event in session.end() {
        log.log_event(&event);
        emit(event);
    }

    CycleOutcome {
        transcript: transcript.join("\n"),
        failure,
    }
}
