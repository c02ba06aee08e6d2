use tracing::debug;

use protocol::{EventKind, ResultBuffer};
use runtime::{RenderContext, Renderer};

/// Circles thinner than this many pixels fade out completely.
const MIN_VISIBLE_RADIUS_PX: f32 = 2.0;

/// Renderer for the headless driver: counts what a canvas would draw.
#[derive(Debug, Default)]
pub struct SummaryRenderer {
    pub frames_drawn: u64,
    pub last_visible: usize,
    /// Device-pixel size of the canvas backing store.
    pub backing: (u32, u32),
}

fn visible_records(ctx: &RenderContext<'_>, buf: &ResultBuffer) -> usize {
    if buf.is_empty() {
        return 0;
    }
    match buf.kind() {
        EventKind::Bubbles => {
            let width = ctx.viewport.width();
            if width <= 0.0 {
                return 0;
            }
            let px_per_unit = ctx.window.width / width;
            buf.bubbles()
                .iter()
                .filter(|b| b.radius * px_per_unit > MIN_VISIBLE_RADIUS_PX)
                .count()
        }
        EventKind::Collisions => buf.pairs().len(),
        EventKind::Culled => buf.indices().len(),
    }
}

impl Renderer for SummaryRenderer {
    fn render(&mut self, ctx: &RenderContext<'_>) {
        let backing = ctx.window.physical_size();
        if backing != self.backing {
            debug!(width = backing.0, height = backing.1, "backing store resized");
            self.backing = backing;
        }

        let visible = ctx.result.map_or(0, |buf| visible_records(ctx, buf));
        self.frames_drawn += 1;
        if visible != self.last_visible {
            debug!(
                frame = ctx.frame.index,
                visible,
                viewport = ?ctx.viewport.to_array(),
                "visible set changed"
            );
        }
        self.last_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::SummaryRenderer;
    use foundation::bounds::Viewport;
    use foundation::time::Time;
    use foundation::window::WindowSize;
    use protocol::ResultBuffer;
    use runtime::{Frame, RenderContext, Renderer};

    fn context(result: &ResultBuffer, window: WindowSize) -> RenderContext<'_> {
        RenderContext {
            frame: Frame::new(0, Time(0.0)),
            viewport: Viewport::new(-1.0, -1.0, 1.0, 1.0),
            window,
            result: Some(result),
        }
    }

    #[test]
    fn tiny_bubbles_are_not_counted() {
        let buf = ResultBuffer::Bubbles(vec![0.0, 0.0, 0.5, 0.0, 0.0, 0.001]);
        let mut r = SummaryRenderer::default();
        r.render(&context(&buf, WindowSize::new(200.0, 200.0, 1.0)));
        assert_eq!(r.last_visible, 1);
        assert_eq!(r.frames_drawn, 1);
    }

    #[test]
    fn backing_store_follows_pixel_scale() {
        let buf = ResultBuffer::Culled(vec![4, 5]);
        let mut r = SummaryRenderer::default();
        r.render(&context(&buf, WindowSize::new(200.0, 100.0, 2.0)));
        assert_eq!(r.backing, (400, 200));
        assert_eq!(r.last_visible, 2);
    }

    #[test]
    fn collisions_count_pairs() {
        let buf = ResultBuffer::Collisions(vec![0, 1, 2, 3]);
        let mut r = SummaryRenderer::default();
        r.render(&context(&buf, WindowSize::new(200.0, 100.0, 1.0)));
        assert_eq!(r.last_visible, 2);
    }
}
