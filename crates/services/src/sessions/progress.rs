/// Advisory countdown severity. Affects presentation only, never grading or
/// submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePressure {
    Normal,
    /// Under ten minutes remaining.
    Warning,
    /// Under five minutes remaining.
    Critical,
}

impl TimePressure {
    /// Classify remaining seconds against the presentation thresholds.
    #[must_use]
    pub fn for_remaining(seconds: u64) -> Self {
        if seconds < 300 {
            TimePressure::Critical
        } else if seconds < 600 {
            TimePressure::Warning
        } else {
            TimePressure::Normal
        }
    }
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub flagged: usize,
    pub viewed: usize,
    pub current_index: usize,
    pub time_left_seconds: u64,
    pub pressure: TimePressure,
    pub is_submitted: bool,
}
