/// Fixed-budget frame pacing in backend milliseconds.
///
/// The budget is `1000 / frame_rate`, truncated to whole milliseconds
/// (11 ms at 90 Hz). A frame rate of zero disables pacing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FramePacer {
    budget_ms: u64,
}

impl FramePacer {
    pub const fn new(frame_rate: u32) -> Self {
        let budget_ms = if frame_rate == 0 {
            0
        } else {
            1000 / frame_rate as u64
        };
        Self { budget_ms }
    }

    #[inline]
    pub const fn budget_ms(self) -> u64 {
        self.budget_ms
    }

    /// Milliseconds to wait before the next frame may start.
    ///
    /// `last` is the timestamp of the previous frame start and `now` the
    /// timestamp at the end of the current frame's work. Returns `None` when
    /// the frame used up its budget. A clock that went backwards counts as
    /// zero elapsed time.
    pub fn remaining(self, last: u64, now: u64) -> Option<u64> {
        let elapsed = now.saturating_sub(last);
        if elapsed < self.budget_ms {
            Some(self.budget_ms - elapsed)
        } else {
            None
        }
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(90)
    }
}
