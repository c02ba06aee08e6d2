/// Work owed before the next observable state is consistent.
///
/// Producers set flags; the frame tick is the only consumer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirtyTracker {
    view_changed: bool,
    redraw_needed: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also marks a redraw: pan and zoom must repaint right away even while
    /// the worker is still busy with an earlier request.
    pub fn mark_view_changed(&mut self) {
        self.view_changed = true;
        self.redraw_needed = true;
    }

    pub fn mark_redraw_needed(&mut self) {
        self.redraw_needed = true;
    }

    pub fn view_changed(&self) -> bool {
        self.view_changed
    }

    pub fn redraw_needed(&self) -> bool {
        self.redraw_needed
    }

    pub fn consume_view_changed(&mut self) -> bool {
        std::mem::take(&mut self.view_changed)
    }

    pub fn consume_redraw_needed(&mut self) -> bool {
        std::mem::take(&mut self.redraw_needed)
    }
}
