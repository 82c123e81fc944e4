//! Per-cycle display preferences.

use serde::{Deserialize, Serialize};

/// Per-user flags gating which translated events are forwarded to the
/// host. Bound at cycle start and immutable for the cycle's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    /// Forward tool call/return progress status events.
    pub display_events: bool,
    /// Forward reasoning steps.
    pub show_reasoning: bool,
    /// Emit the usage summary at cycle end.
    pub show_usage_stats: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            display_events: true,
            show_reasoning: true,
            show_usage_stats: true,
        }
    }
}

impl DisplayPreferences {
    /// Combine process-wide defaults with a user's own preferences. A
    /// flag is effective only when both sides enable it.
    pub fn and(self, other: DisplayPreferences) -> DisplayPreferences {
        DisplayPreferences {
            display_events: self.display_events && other.display_events,
            show_reasoning: self.show_reasoning && other.show_reasoning,
            show_usage_stats: self.show_usage_stats && other.show_usage_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_enabled() {
        let prefs = DisplayPreferences::default();
        assert!(prefs.display_events);
        assert!(prefs.show_reasoning);
        assert!(prefs.show_usage_stats);
    }

    #[test]
    fn and_requires_both_sides() {
        let process = DisplayPreferences {
            display_events: true,
            show_reasoning: false,
            show_usage_stats: true,
        };
        let user = DisplayPreferences {
            display_events: false,
            show_reasoning: true,
            show_usage_stats: true,
        };
        let effective = process.and(user);
        assert!(!effective.display_events);
        assert!(!effective.show_reasoning);
        assert!(effective.show_usage_stats);
    }

    #[test]
    fn deserialize_partial_uses_defaults() {
        let prefs: DisplayPreferences =
            serde_json::from_str(r#"{"show_reasoning": false}"#).unwrap();
        assert!(prefs.display_events);
        assert!(!prefs.show_reasoning);
        assert!(prefs.show_usage_stats);
    }
}
