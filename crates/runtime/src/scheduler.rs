use bytes::Bytes;
use tracing::{debug, error, info, warn};

use foundation::bounds::Viewport;
use foundation::time::Time;
use foundation::window::WindowSize;
use protocol::{decode_event, Message, ResultBuffer, WorkerEvent};

use crate::config::RuntimeConfig;
use crate::diagnostics::SchedulerStats;
use crate::dirty::DirtyTracker;
use crate::worker::WorkerPort;

/// Latest non-viewport state sent to the worker, replayed after a restart.
#[derive(Debug, Default, Clone)]
struct SetupMessages {
    winsize: Option<Message>,
    data: Option<Message>,
    monolith: Option<Message>,
}

impl SetupMessages {
    fn iter(&self) -> impl Iterator<Item = &Message> {
        [&self.winsize, &self.data, &self.monolith]
            .into_iter()
            .flatten()
    }
}

/// Single in-flight request throttling with drop-latest coalescing.
///
/// At most one `set_viewport` request is outstanding at any time. View
/// changes made while it is outstanding stay as a dirty flag rather than a
/// queue, so the follow-up request carries only the newest viewport.
///
/// Responses carry no request id and are attributed to the outstanding
/// request; that is only sound while the single in-flight rule holds.
///
/// A request that outlives the timeout restarts the worker. Each restart
/// without an intervening reply doubles the timeout, since the fresh worker
/// has to work through the replayed setup before it sees the viewport.
pub struct RequestScheduler<P> {
    port: P,
    pending: bool,
    request_start: Time,
    result: Option<ResultBuffer>,
    setup: SetupMessages,
    request_timeout_ms: Option<f64>,
    dump_timings: bool,
    needs_restart: bool,
    /// Restarts since the worker last replied.
    consecutive_restarts: u32,
    stats: SchedulerStats,
}

/// Cap on timeout doublings.
const MAX_BACKOFF_SHIFT: u32 = 6;

impl<P: WorkerPort> RequestScheduler<P> {
    pub fn new(port: P, config: &RuntimeConfig) -> Self {
        Self {
            port,
            pending: false,
            request_start: Time::ZERO,
            result: None,
            setup: SetupMessages::default(),
            request_timeout_ms: config.request_timeout_ms(),
            dump_timings: config.dump_timings,
            needs_restart: false,
            consecutive_restarts: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn result(&self) -> Option<&ResultBuffer> {
        self.result.as_ref()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut SchedulerStats {
        &mut self.stats
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn set_winsize(&mut self, window: &WindowSize) {
        let message = Message::set_winsize(window);
        self.setup.winsize = Some(message.clone());
        self.forward(message);
    }

    /// Replaces the entity bounds. The visible result is stale afterwards,
    /// so the view is marked changed to trigger a fresh request.
    pub fn set_data(&mut self, bounds: &[[f32; 4]], dirty: &mut DirtyTracker) {
        let message = Message::set_data(bounds);
        self.setup.data = Some(message.clone());
        self.forward(message);
        dirty.mark_view_changed();
    }

    /// Forwards an externally fetched dataset verbatim.
    pub fn set_monolith(&mut self, blob: Bytes, dirty: &mut DirtyTracker) {
        let message = Message::set_monolith(blob);
        self.setup.monolith = Some(message.clone());
        self.forward(message);
        dirty.mark_view_changed();
    }

    fn forward(&mut self, message: Message) {
        let op = message.operation.name();
        if let Err(err) = self.port.post(message) {
            warn!(op, %err, "worker unavailable; message kept for replay");
            self.needs_restart = true;
        }
    }

    /// Sends the current viewport if the view changed and nothing is in
    /// flight. Returns `true` when a request was sent.
    pub fn tick(&mut self, now: Time, viewport: &Viewport, dirty: &mut DirtyTracker) -> bool {
        if !dirty.view_changed() {
            return false;
        }
        if self.pending {
            // Leave the flag set; the next idle tick sends the newest view.
            self.stats.deferred_ticks += 1;
            return false;
        }

        match self.port.post(Message::set_viewport(viewport)) {
            Ok(()) => {
                self.pending = true;
                self.request_start = now;
                dirty.consume_view_changed();
                self.stats.requests_sent += 1;
                debug!(viewport = ?viewport.to_array(), "viewport request sent");
                true
            }
            Err(err) => {
                warn!(%err, "viewport request not sent");
                self.needs_restart = true;
                false
            }
        }
    }

    /// Restarts the worker when the outstanding request exceeded the timeout
    /// or the worker was found disconnected. Retained setup messages are
    /// replayed and the view is marked changed so the latest viewport goes
    /// out again.
    pub fn recover_if_stalled(&mut self, now: Time, dirty: &mut DirtyTracker) {
        let elapsed_ms = now.millis_since(self.request_start);
        let timed_out = self.pending
            && self
                .effective_timeout_ms()
                .is_some_and(|limit| elapsed_ms >= limit);
        if !(timed_out || self.needs_restart) {
            return;
        }
        if timed_out {
            warn!(elapsed_ms, "compute request timed out; restarting worker");
        }

        if let Err(err) = self.port.restart() {
            error!(%err, "worker restart failed");
            self.needs_restart = true;
            return;
        }
        self.stats.worker_restarts += 1;
        self.consecutive_restarts = self.consecutive_restarts.saturating_add(1);
        self.pending = false;
        self.needs_restart = false;

        let replay: Vec<Message> = self.setup.iter().cloned().collect();
        for message in replay {
            self.forward(message);
        }
        dirty.mark_view_changed();
        info!(restarts = self.stats.worker_restarts, "compute worker restarted");
    }

    /// Current timeout: the configured one, doubled per restart since the
    /// worker last replied.
    pub fn effective_timeout_ms(&self) -> Option<f64> {
        let shift = self.consecutive_restarts.min(MAX_BACKOFF_SHIFT);
        self.request_timeout_ms.map(|limit| limit * f64::from(1u32 << shift))
    }

    /// Applies every response that has arrived since the last call.
    pub fn poll_responses(&mut self, now: Time, dirty: &mut DirtyTracker) -> usize {
        let mut applied = 0;
        loop {
            match self.port.try_recv() {
                Ok(Some(event)) => {
                    self.on_response(now, event, dirty);
                    applied += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    if !self.needs_restart {
                        warn!(%err, "worker lost");
                    }
                    self.needs_restart = true;
                    break;
                }
            }
        }
        applied
    }

    /// Installs a response as the new result buffer, replacing the previous
    /// one wholesale, and requests a redraw.
    ///
    /// Late answers to superseded viewports are still applied; the next
    /// coalesced request corrects them. Latency is only sampled when a
    /// request was outstanding.
    pub fn on_response(&mut self, now: Time, event: WorkerEvent, dirty: &mut DirtyTracker) {
        let answered = std::mem::take(&mut self.pending);
        self.consecutive_restarts = 0;
        let elapsed_ms = answered.then(|| now.millis_since(self.request_start));

        let buffer = match decode_event(&event) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.stats.decode_failures += 1;
                warn!(event = event.kind.name(), %err, "discarding undecodable response");
                return;
            }
        };

        let records = buffer.record_count();
        self.result = Some(buffer);
        self.stats.responses_applied += 1;
        match elapsed_ms {
            Some(ms) => {
                self.stats.latency_ms.record(ms);
                if self.dump_timings {
                    info!(event = event.kind.name(), records, "{:.1} ms", ms);
                } else {
                    debug!(
                        event = event.kind.name(),
                        records,
                        elapsed_ms = ms,
                        "response applied"
                    );
                }
            }
            None => debug!(
                event = event.kind.name(),
                records,
                "unsolicited response applied"
            ),
        }
        dirty.mark_redraw_needed();
    }
}
