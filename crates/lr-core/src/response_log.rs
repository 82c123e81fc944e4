//! Append-only JSONL response logger.
//!
//! Writes one JSON object per line, recording raw frames, classified
//! fragments, emitted host events, and errors for a response cycle. The
//! log is write-only from the relay's point of view; nothing reads it
//! back.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use lr_protocol::HostEvent;

/// Append-only JSONL response logger.
pub struct ResponseLogger {
    writer: Option<BufWriter<File>>,
    session_id: String,
}

impl ResponseLogger {
    /// Create a logger that writes to the given path. Creates parent
    /// directories if they don't exist.
    pub fn new(path: &PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            session_id: generate_session_id(),
        })
    }

    /// Create a no-op logger that discards all entries.
    pub fn noop() -> Self {
        Self {
            writer: None,
            session_id: generate_session_id(),
        }
    }

    /// Log a parsed fragment frame.
    pub fn log_fragment(&mut self, frame: &Value) {
        self.write_entry("fragment", frame.clone());
    }

    /// Log a host event as emitted.
    pub fn log_event(&mut self, event: &HostEvent) {
        if let Ok(value) = serde_json::to_value(event) {
            self.write_entry("event", value);
        }
    }

    /// Log an error that terminated or degraded the cycle.
    pub fn log_error(&mut self, kind: &str, message: &str) {
        self.write_entry(
            "error",
            serde_json::json!({"kind": kind, "message": message}),
        );
    }

    fn write_entry(&mut self, entry_type: &str, content: Value) {
        if let Some(ref mut writer) = self.writer {
            let entry = serde_json::json!({
                "ts": epoch_secs(),
                "session": self.session_id,
                "type": entry_type,
                "content": content,
            });
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{line}");
                let _ = writer.flush();
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn generate_session_id() -> String {
    let pid = std::process::id();
    let ts = epoch_secs();
    format!("s{:x}", pid ^ (ts as u32))
}
