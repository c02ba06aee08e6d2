use foundation::time::Time;

/// Default quiet period after the last resize event.
pub const DEFAULT_RESIZE_QUIET_MS: u64 = 250;

/// Cancel-and-reschedule timer for window resize bursts.
///
/// Each notification replaces the pending deadline, so only the last event of
/// a burst fires. The caller reads the window size when [`poll`] returns
/// `true`, never at notification time.
///
/// [`poll`]: ResizeDebouncer::poll
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    quiet_ms: f64,
    deadline: Option<Time>,
}

impl ResizeDebouncer {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms: quiet_ms as f64,
            deadline: None,
        }
    }

    pub fn notify(&mut self, now: Time) {
        self.deadline = Some(now.add_millis(self.quiet_ms));
    }

    /// Returns `true` exactly once when the quiet period has elapsed.
    pub fn poll(&mut self, now: Time) -> bool {
        match self.deadline {
            Some(due) if now >= due => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ResizeDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_QUIET_MS)
    }
}
