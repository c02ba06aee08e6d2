/// Size of the display surface in CSS pixels plus its device pixel scale.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
    pub pixel_scale: f32,
}

impl WindowSize {
    pub fn new(width: f32, height: f32, pixel_scale: f32) -> Self {
        Self {
            width,
            height,
            pixel_scale,
        }
    }

    /// Backing-store size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_scale).round().max(0.0) as u32,
            (self.height * self.pixel_scale).round().max(0.0) as u32,
        )
    }

    /// Wire form for `set_winsize`.
    pub fn to_array(&self) -> [f32; 2] {
        [self.width, self.height]
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}
