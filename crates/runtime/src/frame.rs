use foundation::time::Time;

/// Metadata for one display refresh.
///
/// The host supplies the refresh timestamp; the index counts ticks from 0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Display clock at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }
}
