use std::cell::Cell;

use foundation::window::WindowSize;
use runtime::Surface;

/// Display surface of the headless driver; the script changes it in place.
#[derive(Debug)]
pub struct HeadlessSurface {
    size: Cell<WindowSize>,
}

impl HeadlessSurface {
    pub fn new(size: WindowSize) -> Self {
        Self {
            size: Cell::new(size),
        }
    }

    pub fn set(&self, size: WindowSize) {
        self.size.set(size);
    }
}

impl Surface for HeadlessSurface {
    fn window_size(&self) -> WindowSize {
        self.size.get()
    }
}

/// One synthetic input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Pan { dx: f32, dy: f32 },
    Zoom { factor: f32, anchor: [f32; 2] },
    Home,
    Resize { width: f32, height: f32 },
    PixelScale(f32),
}

/// Frames in one pass of the input script.
pub const SCRIPT_PERIOD: u64 = 600;

/// Input for `frame`, cycling every [`SCRIPT_PERIOD`] frames: drag, zoom in,
/// drag, a resize burst, home, a DPI change and back.
pub fn action_for(frame: u64, window: &WindowSize) -> Option<Action> {
    let centre = [0.5 * window.width, 0.5 * window.height];
    match frame % SCRIPT_PERIOD {
        0..=119 => Some(Action::Pan { dx: 4.0, dy: 0.0 }),
        120..=239 => Some(Action::Zoom {
            factor: 1.02,
            anchor: centre,
        }),
        240..=299 => Some(Action::Pan { dx: -3.0, dy: 2.0 }),
        f @ 300..=309 => Some(Action::Resize {
            width: window.width + 8.0 * (f - 299) as f32,
            height: window.height,
        }),
        360 => Some(Action::Home),
        420 => Some(Action::PixelScale(2.0)),
        480 => Some(Action::PixelScale(1.0)),
        500..=559 => Some(Action::Zoom {
            factor: 0.98,
            anchor: centre,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, SCRIPT_PERIOD, action_for};
    use foundation::window::WindowSize;

    #[test]
    fn script_cycles() {
        let w = WindowSize::new(100.0, 50.0, 1.0);
        assert_eq!(action_for(0, &w), action_for(SCRIPT_PERIOD, &w));
        assert_eq!(action_for(360, &w), Some(Action::Home));
        assert_eq!(action_for(330, &w), None);
    }

    #[test]
    fn resize_burst_grows_width() {
        let w = WindowSize::new(100.0, 50.0, 1.0);
        assert_eq!(
            action_for(300, &w),
            Some(Action::Resize {
                width: 108.0,
                height: 50.0
            })
        );
    }
}
