use crate::bounds::Viewport;
use crate::window::WindowSize;

/// Zoom limits relative to the home view, plus the home view density.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ZoomExtent {
    pub min: f32,
    pub max: f32,
    pub world_units_per_pixel: f32,
}

impl Default for ZoomExtent {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 40.0,
            world_units_per_pixel: 1.0 / 200.0,
        }
    }
}

/// Canonical view bounds and window size.
///
/// Created once from the initial surface size and kept for the lifetime of
/// the viewer. Every mutator returns `true` when the visible bounds changed,
/// which callers turn into a view-changed mark.
#[derive(Clone, Debug)]
pub struct ViewportState {
    viewport: Viewport,
    home: Viewport,
    window: WindowSize,
    extent: ZoomExtent,
}

impl ViewportState {
    pub fn new(window: WindowSize, extent: ZoomExtent) -> Self {
        let home = Viewport::centered(&window, extent.world_units_per_pixel);
        Self {
            viewport: home,
            home,
            window,
            extent,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    pub fn home(&self) -> Viewport {
        self.home
    }

    /// Current magnification relative to the home view.
    pub fn scale(&self) -> f32 {
        let w = self.viewport.width();
        if w <= 0.0 {
            return 1.0;
        }
        self.home.width() / w
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        true
    }

    pub fn pan(&mut self, dx_px: f32, dy_px: f32) -> bool {
        let next = self.viewport.panned(&self.window, dx_px, dy_px);
        self.set_viewport(next)
    }

    /// Zooms about a CSS-pixel anchor, clamped to the zoom extent.
    pub fn zoom(&mut self, factor: f32, anchor_px: [f32; 2]) -> bool {
        let current = self.scale();
        let target = (current * factor).clamp(self.extent.min, self.extent.max);
        let effective = target / current;
        if (effective - 1.0).abs() <= 1e-4 {
            return false;
        }
        let anchor = self.viewport.pixel_to_world(&self.window, anchor_px);
        let next = self.viewport.scaled_about(anchor, effective);
        self.set_viewport(next)
    }

    pub fn reset(&mut self) -> bool {
        self.set_viewport(self.home)
    }

    /// Applies a new window size. The visible bounds and the home view are
    /// refit around their centres at unchanged pixel density.
    pub fn resize(&mut self, window: WindowSize) -> bool {
        let old = self.window;
        self.window = window;
        if old.width == window.width && old.height == window.height {
            return false;
        }
        self.home = self.home.refit(&old, &window);
        let next = self.viewport.refit(&old, &window);
        self.set_viewport(next)
    }
}
