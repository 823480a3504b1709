// Activity classification domain model
use serde::Serialize;

/// Label the device reports before its first classification window closes.
pub const UNKNOWN_LABEL: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    Resting,
    Walking,
    Running,
    #[default]
    Unknown,
}

impl ActivityState {
    /// Wire label as emitted by the device
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resting => "SPOCZYNEK",
            Self::Walking => "CHOD",
            Self::Running => "BIEG",
            Self::Unknown => UNKNOWN_LABEL,
        }
    }

    /// Foreground colour used for the activity indicator
    pub fn status_color(&self) -> &'static str {
        match self {
            Self::Resting => "#2e7d32",
            Self::Walking => "#ef6c00",
            Self::Running => "#c62828",
            Self::Unknown => "#9e9e9e",
        }
    }

    /// Screen background tint for the current activity
    pub fn background_color(&self) -> &'static str {
        match self {
            Self::Resting => "#e8f5e9",
            Self::Walking => "#fff3e0",
            Self::Running => "#ffebee",
            Self::Unknown => "#f5f5f5",
        }
    }
}

/// Map a textual activity label to its state.
///
/// Only exact matches are recognised; anything else, including the `---`
/// placeholder, falls back to [`ActivityState::Unknown`].
pub fn classify(label: &str) -> ActivityState {
    match label {
        "SPOCZYNEK" => ActivityState::Resting,
        "CHOD" => ActivityState::Walking,
        "BIEG" => ActivityState::Running,
        _ => ActivityState::Unknown,
    }
}

/// Numeric code plotted on the activity chart.
///
/// `Unknown` shares code 0 with `Resting`, so a silent sensor plots the same
/// as a resting subject. Kept for compatibility with existing charts.
pub fn to_chart_code(state: ActivityState) -> i32 {
    match state {
        ActivityState::Resting | ActivityState::Unknown => 0,
        ActivityState::Walking => 1,
        ActivityState::Running => 2,
    }
}

/// Y-axis label for a chart code on the activity chart
pub fn axis_label(code: i32) -> &'static str {
    match code {
        0 => "Rest",
        1 => "Walk",
        2 => "Run",
        _ => "",
    }
}
