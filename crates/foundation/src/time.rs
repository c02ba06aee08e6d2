/// Time primitives
///
/// Seconds on the display clock. The host supplies the value (typically the
/// refresh callback timestamp) so scheduling stays a pure function of input.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn add_millis(self, ms: f64) -> Self {
        Time(self.0 + ms / 1000.0)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn millis_since(self, earlier: Time) -> f64 {
        ((self.0 - earlier.0) * 1000.0).max(0.0)
    }
}
