use crate::window::WindowSize;

/// Visible world-space rectangle.
///
/// World y grows upward while screen y grows downward; the pixel helpers
/// below account for the flip.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Viewport {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Wire order: xmin, ymin, xmax, ymax.
    pub fn to_array(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Viewport centred on the origin covering `window` at the given density.
    pub fn centered(window: &WindowSize, world_units_per_pixel: f32) -> Self {
        let hw = 0.5 * window.width * world_units_per_pixel;
        let hh = 0.5 * window.height * world_units_per_pixel;
        Self::new(-hw, -hh, hw, hh)
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> [f32; 2] {
        [
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
        ]
    }

    /// World units covered by one CSS pixel along x and y.
    pub fn units_per_pixel(&self, window: &WindowSize) -> [f32; 2] {
        [
            self.width() / window.width.max(1.0),
            self.height() / window.height.max(1.0),
        ]
    }

    /// Maps a CSS-pixel position on the surface to world space.
    pub fn pixel_to_world(&self, window: &WindowSize, px: [f32; 2]) -> [f32; 2] {
        let [ux, uy] = self.units_per_pixel(window);
        [self.xmin + px[0] * ux, self.ymax - px[1] * uy]
    }

    /// Drag by a screen-space delta; content follows the pointer.
    pub fn panned(&self, window: &WindowSize, dx_px: f32, dy_px: f32) -> Self {
        let [ux, uy] = self.units_per_pixel(window);
        let dx = dx_px * ux;
        let dy = dy_px * uy;
        Self::new(self.xmin - dx, self.ymin + dy, self.xmax - dx, self.ymax + dy)
    }

    /// Scales about a world-space anchor. `factor > 1` zooms in.
    pub fn scaled_about(&self, anchor: [f32; 2], factor: f32) -> Self {
        if !(factor.is_finite() && factor > 0.0) {
            return *self;
        }
        let inv = 1.0 / factor;
        Self::new(
            anchor[0] - (anchor[0] - self.xmin) * inv,
            anchor[1] - (anchor[1] - self.ymin) * inv,
            anchor[0] + (self.xmax - anchor[0]) * inv,
            anchor[1] + (self.ymax - anchor[1]) * inv,
        )
    }

    /// Keeps the centre and pixel density while the window changes extent.
    pub fn refit(&self, old: &WindowSize, new: &WindowSize) -> Self {
        let [ux, uy] = self.units_per_pixel(old);
        let [cx, cy] = self.center();
        let hw = 0.5 * new.width * ux;
        let hh = 0.5 * new.height * uy;
        Self::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }

    pub fn intersects(&self, b: [f32; 4]) -> bool {
        b[0] <= self.xmax && b[2] >= self.xmin && b[1] <= self.ymax && b[3] >= self.ymin
    }
}
