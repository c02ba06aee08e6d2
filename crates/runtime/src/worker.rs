//! Off-thread compute host.
//!
//! The worker owns its state outright: nothing is shared with the main side,
//! and every payload moves across an unbounded channel. Posting never blocks
//! the caller.

use std::thread::JoinHandle;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use protocol::{decode, Message, Payload, WorkerEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker thread has exited and can no longer receive or reply.
    Disconnected,
    Spawn(String),
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerError::Disconnected => write!(f, "compute worker disconnected"),
            WorkerError::Spawn(reason) => write!(f, "failed to spawn compute worker: {reason}"),
        }
    }
}

impl std::error::Error for WorkerError {}

/// Main-side endpoint of a compute worker.
pub trait WorkerPort {
    /// Fire-and-forget send.
    fn post(&mut self, message: Message) -> Result<(), WorkerError>;

    /// Non-blocking receive of the next result event.
    fn try_recv(&mut self) -> Result<Option<WorkerEvent>, WorkerError>;

    /// Abandons the current worker and starts a fresh one with empty state.
    /// Replies from the abandoned worker are never delivered afterwards.
    fn restart(&mut self) -> Result<(), WorkerError>;
}

/// The spatial computation hosted by a worker. Opaque to the scheduler.
pub trait Compute: Send + 'static {
    /// Handles one decoded message, optionally producing a result event.
    fn handle(&mut self, payload: Payload) -> Option<WorkerEvent>;
}

type ComputeFactory = Box<dyn FnMut() -> Box<dyn Compute>>;

/// Runs a [`Compute`] on a dedicated OS thread.
pub struct ThreadWorker {
    name: String,
    factory: ComputeFactory,
    generation: u32,
    inbox: UnboundedSender<Message>,
    outbox: UnboundedReceiver<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    pub fn spawn<F>(name: impl Into<String>, factory: F) -> Result<Self, WorkerError>
    where
        F: FnMut() -> Box<dyn Compute> + 'static,
    {
        let name = name.into();
        let mut factory: ComputeFactory = Box::new(factory);
        let (inbox, outbox, thread) = start_thread(&name, 0, factory())?;
        Ok(Self {
            name,
            factory,
            generation: 0,
            inbox,
            outbox,
            thread: Some(thread),
        })
    }

    /// How many times the worker has been restarted.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Closes the inbox and waits for the thread to finish queued work.
    pub fn shutdown(self) {
        let Self {
            name,
            inbox,
            thread,
            ..
        } = self;
        drop(inbox);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!(worker = %name, "compute worker panicked");
            }
        }
    }
}

impl WorkerPort for ThreadWorker {
    fn post(&mut self, message: Message) -> Result<(), WorkerError> {
        self.inbox
            .send(message)
            .map_err(|_| WorkerError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<WorkerEvent>, WorkerError> {
        match self.outbox.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    fn restart(&mut self) -> Result<(), WorkerError> {
        let generation = self.generation.wrapping_add(1);
        let (inbox, outbox, thread) = start_thread(&self.name, generation, (self.factory)())?;
        // Dropping the old sender lets the abandoned thread exit once it is
        // done; it is detached rather than joined since it may be stuck.
        self.inbox = inbox;
        self.outbox = outbox;
        self.thread = Some(thread);
        self.generation = generation;
        Ok(())
    }
}

fn start_thread(
    name: &str,
    generation: u32,
    compute: Box<dyn Compute>,
) -> Result<
    (
        UnboundedSender<Message>,
        UnboundedReceiver<WorkerEvent>,
        JoinHandle<()>,
    ),
    WorkerError,
> {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let thread = std::thread::Builder::new()
        .name(format!("{name}-{generation}"))
        .spawn(move || run(compute, inbox_rx, outbox_tx))
        .map_err(|e| WorkerError::Spawn(e.to_string()))?;
    Ok((inbox_tx, outbox_rx, thread))
}

fn run(
    mut compute: Box<dyn Compute>,
    mut inbox: UnboundedReceiver<Message>,
    outbox: UnboundedSender<WorkerEvent>,
) {
    while let Some(message) = inbox.blocking_recv() {
        let op = message.operation.name();
        let payload = match decode(&message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(op, %err, "dropping undecodable message");
                continue;
            }
        };
        debug!(op, bytes = message.len_bytes(), "worker received");
        if let Some(event) = compute.handle(payload) {
            if outbox.send(event).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Compute, ThreadWorker, WorkerError, WorkerPort};
    use foundation::bounds::Viewport;
    use protocol::{EventKind, Message, Payload, WorkerEvent};
    use std::time::{Duration, Instant};

    /// Replies to every viewport with its own bounds as one bubble row.
    struct Echo;

    impl Compute for Echo {
        fn handle(&mut self, payload: Payload) -> Option<WorkerEvent> {
            match payload {
                Payload::Viewport(v) => Some(WorkerEvent::bubbles(&[v.xmin, v.ymin, v.xmax])),
                _ => None,
            }
        }
    }

    /// Echoes each viewport after a fixed delay.
    struct Delayed(Duration);

    impl Compute for Delayed {
        fn handle(&mut self, payload: Payload) -> Option<WorkerEvent> {
            match payload {
                Payload::Viewport(v) => {
                    std::thread::sleep(self.0);
                    Some(WorkerEvent::bubbles(&[v.xmin, v.ymin, v.xmax]))
                }
                _ => None,
            }
        }
    }

    struct Panics;

    impl Compute for Panics {
        fn handle(&mut self, _payload: Payload) -> Option<WorkerEvent> {
            panic!("boom");
        }
    }

    fn wait_for(port: &mut ThreadWorker) -> Result<Option<WorkerEvent>, WorkerError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match port.try_recv() {
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(1))
                }
                other => return other,
            }
        }
    }

    #[test]
    fn replies_arrive_off_thread() {
        let mut w =
            ThreadWorker::spawn("echo", || Box::new(Echo) as Box<dyn Compute>).unwrap();
        assert_eq!(w.try_recv(), Ok(None));
        w.post(Message::set_viewport(&Viewport::new(1.0, 2.0, 3.0, 4.0)))
            .unwrap();
        let event = wait_for(&mut w).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Bubbles);
        assert_eq!(event, WorkerEvent::bubbles(&[1.0, 2.0, 3.0]));
        w.shutdown();
    }

    #[test]
    fn panicking_compute_reports_disconnect_and_restarts() {
        let mut w =
            ThreadWorker::spawn("panics", || Box::new(Panics) as Box<dyn Compute>).unwrap();
        w.post(Message::set_viewport(&Viewport::new(0.0, 0.0, 1.0, 1.0)))
            .unwrap();
        assert_eq!(wait_for(&mut w), Err(WorkerError::Disconnected));

        w.restart().unwrap();
        assert_eq!(w.generation(), 1);
        assert_eq!(w.try_recv(), Ok(None));
    }

    #[test]
    fn restart_drops_replies_from_the_abandoned_generation() {
        let mut w = ThreadWorker::spawn("delayed", || {
            Box::new(Delayed(Duration::from_millis(60))) as Box<dyn Compute>
        })
        .unwrap();
        w.post(Message::set_viewport(&Viewport::new(1.0, 1.0, 1.0, 1.0)))
            .unwrap();
        w.restart().unwrap();
        w.post(Message::set_viewport(&Viewport::new(2.0, 2.0, 2.0, 2.0)))
            .unwrap();

        let event = wait_for(&mut w).unwrap().unwrap();
        assert_eq!(event, WorkerEvent::bubbles(&[2.0, 2.0, 2.0]));

        // Give the abandoned thread time to finish and try to answer.
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(w.try_recv(), Ok(None));
        w.shutdown();
    }
}
