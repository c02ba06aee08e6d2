use bytes::Bytes;
use tracing::debug;

use foundation::bounds::Viewport;
use foundation::time::Time;
use foundation::viewport::ViewportState;
use foundation::window::WindowSize;
use protocol::{ResultBuffer, WorkerEvent};

use crate::config::RuntimeConfig;
use crate::debounce::ResizeDebouncer;
use crate::dirty::DirtyTracker;
use crate::frame::Frame;
use crate::scheduler::RequestScheduler;
use crate::worker::WorkerPort;

/// The display surface as seen at the moment of the call.
pub trait Surface {
    fn window_size(&self) -> WindowSize;
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub frame: Frame,
    pub viewport: Viewport,
    pub window: WindowSize,
    pub result: Option<&'a ResultBuffer>,
}

/// External drawing collaborator. It only ever sees shared state.
pub trait Renderer {
    fn render(&mut self, ctx: &RenderContext<'_>);
}

impl<F> Renderer for F
where
    F: FnMut(&RenderContext<'_>),
{
    fn render(&mut self, ctx: &RenderContext<'_>) {
        self(ctx)
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub frame: Frame,
    pub resized: bool,
    pub request_sent: bool,
    pub rendered: bool,
}

/// Per-refresh orchestration of view state, compute requests and drawing.
///
/// Everything here runs on the thread that drives the display, one callback
/// at a time. The caller owns the loop and calls [`tick`] once per refresh.
///
/// [`tick`]: FrameLoop::tick
pub struct FrameLoop<P> {
    view: ViewportState,
    dirty: DirtyTracker,
    scheduler: RequestScheduler<P>,
    resize: ResizeDebouncer,
    next_frame: u64,
}

impl<P: WorkerPort> FrameLoop<P> {
    /// Sends the initial window size and marks the first view as changed.
    pub fn new(port: P, window: WindowSize, config: &RuntimeConfig) -> Self {
        let mut scheduler = RequestScheduler::new(port, config);
        scheduler.set_winsize(&window);
        let mut dirty = DirtyTracker::new();
        dirty.mark_view_changed();
        Self {
            view: ViewportState::new(window, config.zoom_extent()),
            dirty,
            scheduler,
            resize: ResizeDebouncer::new(config.resize_quiet_ms),
            next_frame: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.view.viewport()
    }

    pub fn window(&self) -> WindowSize {
        self.view.window()
    }

    pub fn view_state(&self) -> &ViewportState {
        &self.view
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn scheduler(&self) -> &RequestScheduler<P> {
        &self.scheduler
    }

    pub fn into_scheduler(self) -> RequestScheduler<P> {
        self.scheduler
    }

    fn view_mutated(&mut self, changed: bool) -> bool {
        if changed {
            if self.dirty.view_changed() {
                self.scheduler.stats_mut().superseded_viewports += 1;
            }
            self.dirty.mark_view_changed();
        }
        changed
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        let changed = self.view.set_viewport(viewport);
        self.view_mutated(changed)
    }

    pub fn pan(&mut self, dx_px: f32, dy_px: f32) -> bool {
        let changed = self.view.pan(dx_px, dy_px);
        self.view_mutated(changed)
    }

    pub fn zoom(&mut self, factor: f32, anchor_px: [f32; 2]) -> bool {
        let changed = self.view.zoom(factor, anchor_px);
        self.view_mutated(changed)
    }

    pub fn reset_view(&mut self) -> bool {
        let changed = self.view.reset();
        self.view_mutated(changed)
    }

    /// Window resize notification; the recomputation is debounced.
    pub fn on_resize(&mut self, now: Time) {
        self.resize.notify(now);
    }

    pub fn set_data(&mut self, bounds: &[[f32; 4]]) {
        self.scheduler.set_data(bounds, &mut self.dirty);
    }

    pub fn set_monolith(&mut self, blob: Bytes) {
        self.scheduler.set_monolith(blob, &mut self.dirty);
    }

    /// Response handler: applies one worker event.
    pub fn on_response(&mut self, now: Time, event: WorkerEvent) {
        self.scheduler.on_response(now, event, &mut self.dirty);
    }

    /// Applies every worker event that has arrived.
    pub fn poll_worker(&mut self, now: Time) -> usize {
        self.scheduler.poll_responses(now, &mut self.dirty)
    }

    fn refresh_window(&mut self, window: WindowSize) {
        self.view.resize(window);
        self.scheduler.set_winsize(&window);
        self.dirty.mark_view_changed();
        debug!(
            width = window.width,
            height = window.height,
            pixel_scale = window.pixel_scale,
            "window refreshed"
        );
    }

    /// One display refresh.
    ///
    /// Order: due resize recomputation, pixel-scale check, compute request,
    /// render. The host schedules the next call.
    pub fn tick<S, R>(&mut self, now: Time, surface: &S, renderer: &mut R) -> TickReport
    where
        S: Surface + ?Sized,
        R: Renderer + ?Sized,
    {
        let frame = Frame::new(self.next_frame, now);
        self.next_frame += 1;

        let mut resized = false;
        if self.resize.poll(now) {
            self.refresh_window(surface.window_size());
            resized = true;
        }

        let current = surface.window_size();
        if current.pixel_scale != self.view.window().pixel_scale {
            self.refresh_window(current);
            resized = true;
        }

        self.scheduler.recover_if_stalled(now, &mut self.dirty);

        let mut request_sent = false;
        if self.dirty.view_changed() {
            request_sent = self
                .scheduler
                .tick(now, &self.view.viewport(), &mut self.dirty);
            self.dirty.mark_redraw_needed();
        }

        let rendered = self.dirty.consume_redraw_needed();
        if rendered {
            let ctx = RenderContext {
                frame,
                viewport: self.view.viewport(),
                window: self.view.window(),
                result: self.scheduler.result(),
            };
            renderer.render(&ctx);
        }

        TickReport {
            frame,
            resized,
            request_sent,
            rendered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameLoop, RenderContext, Surface};
    use crate::config::RuntimeConfig;
    use crate::testing::RecordingPort;
    use foundation::bounds::Viewport;
    use foundation::time::Time;
    use foundation::window::WindowSize;
    use pretty_assertions::assert_eq;
    use protocol::{Operation, WorkerEvent};
    use std::cell::Cell;

    struct FakeSurface {
        size: Cell<WindowSize>,
    }

    impl FakeSurface {
        fn new(width: f32, height: f32) -> Self {
            Self {
                size: Cell::new(WindowSize::new(width, height, 1.0)),
            }
        }

        fn set(&self, width: f32, height: f32, pixel_scale: f32) {
            self.size.set(WindowSize::new(width, height, pixel_scale));
        }
    }

    impl Surface for FakeSurface {
        fn window_size(&self) -> WindowSize {
            self.size.get()
        }
    }

    fn setup() -> (FrameLoop<RecordingPort>, FakeSurface) {
        let surface = FakeSurface::new(400.0, 400.0);
        let fl = FrameLoop::new(
            RecordingPort::default(),
            surface.window_size(),
            &RuntimeConfig::default(),
        );
        (fl, surface)
    }

    fn ms(v: f64) -> Time {
        Time(v / 1000.0)
    }

    #[test]
    fn first_tick_sends_winsize_then_viewport_and_renders() {
        let (mut fl, surface) = setup();
        let mut renders = 0;
        let report = fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| renders += 1);
        assert!(report.request_sent);
        assert!(report.rendered);
        assert_eq!(renders, 1);
        assert_eq!(
            fl.scheduler().port().ops_sent(),
            vec![Operation::SetWinsize, Operation::SetViewport]
        );
        assert_eq!(
            fl.scheduler().port().viewports_sent(),
            vec![Viewport::new(-1.0, -1.0, 1.0, 1.0)]
        );
    }

    #[test]
    fn mutations_before_first_tick_send_only_latest_bounds() {
        let (mut fl, surface) = setup();
        let target = Viewport::new(-2.0, -2.0, 2.0, 2.0);
        fl.set_viewport(Viewport::new(-1.5, -1.5, 1.5, 1.5));
        fl.set_viewport(target);
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.tick(ms(16.0), &surface, &mut |_: &RenderContext<'_>| {});
        assert_eq!(fl.scheduler().port().viewports_sent(), vec![target]);
    }

    #[test]
    fn two_mutations_before_response_send_one_request_with_latest_bounds() {
        let (mut fl, surface) = setup();
        // Initial request for [-1,-1,1,1] is in flight.
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        let port_before = fl.scheduler().port().viewports_sent().len();

        let target = Viewport::new(-2.0, -2.0, 2.0, 2.0);
        fl.set_viewport(Viewport::new(-1.5, -1.5, 1.5, 1.5));
        fl.tick(ms(16.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.set_viewport(target);
        fl.tick(ms(32.0), &surface, &mut |_: &RenderContext<'_>| {});
        assert_eq!(fl.scheduler().port().viewports_sent().len(), port_before);

        fl.on_response(ms(40.0), WorkerEvent::culled(&[]));
        fl.tick(ms(48.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.tick(ms(64.0), &surface, &mut |_: &RenderContext<'_>| {});

        let sent = fl.scheduler().port().viewports_sent();
        assert_eq!(sent.len(), port_before + 1);
        assert_eq!(sent.last(), Some(&target));
    }

    #[test]
    fn redraw_happens_in_same_tick_even_while_pending() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        assert!(fl.scheduler().is_pending());

        let mut seen = Vec::new();
        fl.pan(20.0, 0.0);
        let report = fl.tick(ms(16.0), &surface, &mut |ctx: &RenderContext<'_>| {
            seen.push(ctx.viewport)
        });
        assert!(!report.request_sent);
        assert!(report.rendered);
        assert_eq!(seen, vec![fl.viewport()]);
        assert!(fl.dirty().view_changed());
    }

    #[test]
    fn response_with_three_bubbles_triggers_exactly_one_redraw() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});

        let xyr = [0.0, 0.0, 1.0, 0.5, 0.5, 0.25, -0.5, 0.5, 0.125];
        fl.on_response(ms(10.0), WorkerEvent::bubbles(&xyr));

        let mut records = Vec::new();
        for t in [16.0, 32.0, 48.0] {
            fl.tick(ms(t), &surface, &mut |ctx: &RenderContext<'_>| {
                let buf = ctx.result.expect("result installed");
                records.push((buf.len(), buf.record_count()));
            });
        }
        assert_eq!(records, vec![(9, 3)]);
    }

    #[test]
    fn resize_burst_recomputes_once_with_final_size() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.on_response(ms(1.0), WorkerEvent::culled(&[]));
        fl.tick(ms(2.0), &surface, &mut |_: &RenderContext<'_>| {});

        let mut resizes = 0;
        for i in 0..10 {
            let t = 10.0 + i as f64 * 20.0;
            surface.set(400.0 + 40.0 * (i + 1) as f32, 400.0, 1.0);
            fl.on_resize(ms(t));
            if fl.tick(ms(t), &surface, &mut |_: &RenderContext<'_>| {}).resized {
                resizes += 1;
            }
        }
        // Last event at 190 ms; the recomputation is due at 440 ms.
        for t in [200.0, 300.0, 439.0, 441.0, 500.0] {
            if fl.tick(ms(t), &surface, &mut |_: &RenderContext<'_>| {}).resized {
                resizes += 1;
            }
        }
        assert_eq!(resizes, 1);
        assert_eq!(fl.window().width, 800.0);

        let winsizes = fl
            .scheduler()
            .port()
            .ops_sent()
            .into_iter()
            .filter(|op| *op == Operation::SetWinsize)
            .count();
        assert_eq!(winsizes, 2);
    }

    #[test]
    fn pixel_scale_change_forces_refresh() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.on_response(ms(1.0), WorkerEvent::culled(&[]));
        fl.tick(ms(2.0), &surface, &mut |_: &RenderContext<'_>| {});

        surface.set(400.0, 400.0, 2.0);
        let report = fl.tick(ms(16.0), &surface, &mut |_: &RenderContext<'_>| {});
        assert!(report.resized);
        assert!(report.request_sent);
        assert!(report.rendered);
        assert_eq!(fl.window().pixel_scale, 2.0);
    }

    #[test]
    fn clean_tick_does_nothing() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.on_response(ms(1.0), WorkerEvent::culled(&[]));
        fl.tick(ms(2.0), &surface, &mut |_: &RenderContext<'_>| {});
        let report = fl.tick(ms(18.0), &surface, &mut |_: &RenderContext<'_>| {});
        assert!(!report.rendered);
        assert!(!report.request_sent);
        assert_eq!(report.frame.index, 2);
    }

    #[test]
    fn superseded_viewports_are_counted() {
        let (mut fl, surface) = setup();
        fl.tick(ms(0.0), &surface, &mut |_: &RenderContext<'_>| {});
        fl.pan(1.0, 0.0);
        fl.pan(1.0, 0.0);
        fl.pan(1.0, 0.0);
        assert_eq!(fl.scheduler().stats().superseded_viewports, 2);
    }
}
